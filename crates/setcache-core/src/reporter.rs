//! Side channel for caller bookkeeping mistakes.
//!
//! A violation means the policy layer drove the cache through a transition it
//! should not have (e.g. destroying a set twice in one window). The cache
//! reports it here and still applies a best-effort transition.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;

/// Soft precondition violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// `create` on a set already pending create or update
    CreateWhileDirty,
    /// `add_member` on a set pending destroy
    AddMemberWhileDestroying,
    /// `delete_member` on a set pending destroy
    DeleteMemberWhileDestroying,
    /// `destroy` on a set already pending destroy
    DestroyWhileDestroying,
}

impl Violation {
    pub const ALL: [Violation; 4] = [
        Violation::CreateWhileDirty,
        Violation::AddMemberWhileDestroying,
        Violation::DeleteMemberWhileDestroying,
        Violation::DestroyWhileDestroying,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Violation::CreateWhileDirty => "create_while_dirty",
            Violation::AddMemberWhileDestroying => "add_member_while_destroying",
            Violation::DeleteMemberWhileDestroying => "delete_member_while_destroying",
            Violation::DestroyWhileDestroying => "destroy_while_destroying",
        }
    }

    fn index(&self) -> usize {
        match self {
            Violation::CreateWhileDirty => 0,
            Violation::AddMemberWhileDestroying => 1,
            Violation::DeleteMemberWhileDestroying => 2,
            Violation::DestroyWhileDestroying => 3,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives invariant violations. Implementations must not panic.
pub trait InvariantReporter: Send + Sync {
    fn invariant_violation(&self, violation: Violation, set_name: &str);
}

/// Reports violations as warnings through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl InvariantReporter for LogReporter {
    fn invariant_violation(&self, violation: Violation, set_name: &str) {
        warn!("dirty cache invariant violated: {} for set {}", violation, set_name);
    }
}

/// Counts violations per kind and logs them, for metrics export.
#[derive(Debug, Default)]
pub struct CountingReporter {
    counts: [AtomicU64; 4],
}

impl CountingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Violations of one kind since construction.
    pub fn count(&self, violation: Violation) -> u64 {
        self.counts[violation.index()].load(Ordering::Relaxed)
    }

    /// Violations of every kind since construction.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

impl InvariantReporter for CountingReporter {
    fn invariant_violation(&self, violation: Violation, set_name: &str) {
        self.counts[violation.index()].fetch_add(1, Ordering::Relaxed);
        LogReporter.invariant_violation(violation, set_name);
    }
}
