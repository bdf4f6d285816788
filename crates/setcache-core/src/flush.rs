//! Flush — turn dirty state into an ordered sync plan and apply it.
//!
//! The plan is built from the cache's query surface plus the live sets:
//!
//! 1. Create every dirty set (leaf sets first, so list sets can reference them)
//! 2. Per dirty set, member deletes then adds. A cache that does not track
//!    members gets a flush plus a full re-add of live members instead
//! 3. Destroy (list sets first, so no leaf set is still referenced)
//!
//! Operations carry the set's [`SetIdentity`], so a dataplane never derives
//! kernel names on its own and destroys do not depend on the live sets.
//!
//! The cache is reset only after the dataplane accepted the whole plan. On
//! failure it keeps its dirty state and the caller decides whether to retry.

use std::cmp::Ordering;
use std::fmt;

use hashbrown::HashMap;
use log::{debug, warn};

use crate::dirty_cache::DirtyCache;
use crate::error::SyncResult;
use crate::ipset::{IpSet, SetIdentity};

/// One kernel operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOperation {
    /// Create the set if it does not exist
    Create { set: SetIdentity },
    /// Remove every member
    Flush { set: SetIdentity },
    Add { set: SetIdentity, member: String },
    Delete { set: SetIdentity, member: String },
    /// Remove the set. A set created and destroyed within one window reaches
    /// the dataplane here without ever having been created, so dataplanes
    /// must tolerate destroying a set the kernel does not have.
    Destroy { set: SetIdentity },
}

impl SetOperation {
    pub fn set(&self) -> &SetIdentity {
        match self {
            SetOperation::Create { set }
            | SetOperation::Flush { set }
            | SetOperation::Add { set, .. }
            | SetOperation::Delete { set, .. }
            | SetOperation::Destroy { set } => set,
        }
    }

    /// Logical name of the target set.
    pub fn set_name(&self) -> &str {
        self.set().name()
    }

    /// Short verb for logs and errors.
    pub fn verb(&self) -> &'static str {
        match self {
            SetOperation::Create { .. } => "create",
            SetOperation::Flush { .. } => "flush",
            SetOperation::Add { .. } => "add",
            SetOperation::Delete { .. } => "del",
            SetOperation::Destroy { .. } => "destroy",
        }
    }
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperation::Create { set } => write!(f, "create {} ({})", set.name(), set.kind().as_str()),
            SetOperation::Add { set, member } | SetOperation::Delete { set, member } => {
                write!(f, "{} {} {}", self.verb(), set.name(), member)
            }
            SetOperation::Flush { set } | SetOperation::Destroy { set } => {
                write!(f, "{} {}", self.verb(), set.name())
            }
        }
    }
}

/// What a flush changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub sets_created_or_updated: usize,
    pub sets_destroyed: usize,
    pub members_added: usize,
    pub members_deleted: usize,
}

/// Executes sync plans against the kernel or platform.
pub trait Dataplane {
    /// Apply every operation of the plan, in order. An error means the
    /// kernel may be partially updated.
    fn apply(&mut self, plan: &SyncPlan) -> SyncResult<()>;
}

/// Ordered operations that bring the kernel in line with the live sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    operations: Vec<SetOperation>,
}

impl SyncPlan {
    /// Build the plan for everything the cache marks dirty.
    ///
    /// `live_sets` maps set name to the caller's authoritative set. Sets
    /// pending add/update that are missing from it are skipped with a
    /// warning. Destroys use the identity the cache captured at destroy time.
    pub fn build(cache: &dyn DirtyCache, live_sets: &HashMap<String, IpSet>) -> Self {
        let mut leaf_sets = Vec::new();
        let mut list_sets = Vec::new();
        let mut dirty: Vec<String> = cache.sets_to_add_or_update().into_iter().collect();
        dirty.sort_unstable();
        for name in dirty {
            match live_sets.get(&name) {
                Some(set) if set.kind().is_list() => list_sets.push(set),
                Some(set) => leaf_sets.push(set),
                None => warn!("dirty set {} has no live set object, skipping add/update", name),
            }
        }

        let mut operations = Vec::new();
        for set in leaf_sets.iter().chain(list_sets.iter()) {
            operations.push(SetOperation::Create { set: set.identity().clone() });
        }
        for set in leaf_sets.iter().chain(list_sets.iter()) {
            if cache.tracks_members() {
                push_member_diff(&mut operations, cache, set.identity());
            } else {
                push_full_resync(&mut operations, set);
            }
        }

        let mut destroys: Vec<&SetIdentity> = Vec::new();
        for name in cache.sets_to_destroy() {
            match cache.destroyed_set(&name) {
                Some(set) => destroys.push(set),
                None => warn!("set {} pending destroy has no identity, skipping destroy", name),
            }
        }
        destroys.sort_unstable_by(|a, b| destroy_order(a, b));
        operations.extend(destroys.into_iter().map(|set| SetOperation::Destroy { set: set.clone() }));

        Self { operations }
    }

    pub fn operations(&self) -> &[SetOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn stats(&self) -> FlushStats {
        let mut stats = FlushStats::default();
        for op in &self.operations {
            match op {
                SetOperation::Create { .. } => stats.sets_created_or_updated += 1,
                SetOperation::Destroy { .. } => stats.sets_destroyed += 1,
                SetOperation::Add { .. } => stats.members_added += 1,
                SetOperation::Delete { .. } => stats.members_deleted += 1,
                SetOperation::Flush { .. } => {}
            }
        }
        stats
    }
}

/// List sets first, then by name.
fn destroy_order(a: &SetIdentity, b: &SetIdentity) -> Ordering {
    b.kind()
        .is_list()
        .cmp(&a.kind().is_list())
        .then_with(|| a.name().cmp(b.name()))
}

fn push_member_diff(operations: &mut Vec<SetOperation>, cache: &dyn DirtyCache, set: &SetIdentity) {
    let mut deletes: Vec<&String> = cache.members_to_delete(set.name()).into_iter().flatten().collect();
    let mut adds: Vec<&String> = cache.members_to_add(set.name()).into_iter().flatten().collect();
    deletes.sort_unstable();
    adds.sort_unstable();
    operations.extend(deletes.into_iter().map(|member| SetOperation::Delete {
        set: set.clone(),
        member: member.clone(),
    }));
    operations.extend(adds.into_iter().map(|member| SetOperation::Add {
        set: set.clone(),
        member: member.clone(),
    }));
}

fn push_full_resync(operations: &mut Vec<SetOperation>, set: &IpSet) {
    operations.push(SetOperation::Flush { set: set.identity().clone() });
    let mut members: Vec<&str> = set.members().collect();
    members.sort_unstable();
    operations.extend(members.into_iter().map(|member| SetOperation::Add {
        set: set.identity().clone(),
        member: member.to_string(),
    }));
}

/// Sync the kernel with everything the cache marks dirty.
///
/// Returns what was applied. The cache is reset only if the dataplane
/// succeeds; on error it is left untouched for the caller to retry.
pub fn flush(
    cache: &mut dyn DirtyCache,
    live_sets: &HashMap<String, IpSet>,
    dataplane: &mut dyn Dataplane,
) -> SyncResult<FlushStats> {
    if cache.is_empty() {
        return Ok(FlushStats::default());
    }

    let plan = SyncPlan::build(&*cache, live_sets);
    if let Err(e) = dataplane.apply(&plan) {
        warn!(
            "flush failed, keeping {} add/update and {} destroy sets dirty: {}",
            cache.num_sets_to_add_or_update(),
            cache.num_sets_to_destroy(),
            e
        );
        return Err(e);
    }

    let stats = plan.stats();
    cache.reset();
    debug!(
        "flushed {} sets, destroyed {}, +{} / -{} members",
        stats.sets_created_or_updated, stats.sets_destroyed, stats.members_added, stats.members_deleted
    );
    Ok(stats)
}
