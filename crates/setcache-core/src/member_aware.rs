//! Fine-grained dirty cache: per-set member diffs in three buckets.
//!
//! Transition rules:
//! - `create` seeds every live member as an add, unless the set is pending
//!   destroy, in which case the destroy diff is reused as an update
//! - `add_member` / `delete_member` record into the pending create or update
//!   diff, opening an empty update diff for clean sets
//! - `destroy` forces a delete for every live member of a set the kernel
//!   already has, then parks the diff in the destroy bucket

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::dirty_cache::DirtyCache;
use crate::ipset::{IpSet, SetIdentity};
use crate::member_diff::MemberDiff;
use crate::reporter::{InvariantReporter, Violation};

/// Dirty cache that knows exactly which members changed.
pub struct MemberAwareDirtyCache {
    /// Sets the kernel does not have yet; diffs hold every live member as an add
    to_create: HashMap<String, MemberDiff>,
    /// Sets the kernel already has, with incremental changes
    to_update: HashMap<String, MemberDiff>,
    /// Sets to remove from the kernel
    to_destroy: HashMap<String, PendingDestroy>,
    reporter: Arc<dyn InvariantReporter>,
}

/// A set pending destroy. The identity outlives the live set.
struct PendingDestroy {
    identity: SetIdentity,
    diff: MemberDiff,
}

impl MemberAwareDirtyCache {
    pub fn new(reporter: Arc<dyn InvariantReporter>) -> Self {
        Self {
            to_create: HashMap::new(),
            to_update: HashMap::new(),
            to_destroy: HashMap::new(),
            reporter,
        }
    }

    /// Pending create (the kernel has not seen this set).
    pub fn is_set_to_create(&self, set_name: &str) -> bool {
        self.to_create.contains_key(set_name)
    }

    /// Pending incremental update of a set the kernel already has.
    pub fn is_set_to_update(&self, set_name: &str) -> bool {
        self.to_update.contains_key(set_name)
    }

    /// Diff for a set across all buckets, checked create, update, destroy.
    pub fn diff(&self, set_name: &str) -> Option<&MemberDiff> {
        self.to_create
            .get(set_name)
            .or_else(|| self.to_update.get(set_name))
            .or_else(|| self.to_destroy.get(set_name).map(|pending| &pending.diff))
    }

    /// Diff to record member changes into. Clean sets get an empty update diff.
    fn diff_for_member_change(&mut self, set_name: &str) -> &mut MemberDiff {
        if let Some(diff) = self.to_create.get_mut(set_name) {
            return diff;
        }
        // Only after a reported violation: keep buckets exclusive by treating
        // the change like a recreate.
        if let Some(pending) = self.to_destroy.remove(set_name) {
            self.to_update.insert(set_name.to_string(), pending.diff);
        }
        self.to_update.entry_ref(set_name).or_default()
    }

    fn check_not_destroying(&self, set_name: &str, violation: Violation) {
        if self.to_destroy.contains_key(set_name) {
            self.reporter.invariant_violation(violation, set_name);
        }
    }
}

impl DirtyCache for MemberAwareDirtyCache {
    fn reset(&mut self) {
        self.to_create.clear();
        self.to_update.clear();
        self.to_destroy.clear();
    }

    fn create(&mut self, set: &IpSet) {
        let set_name = set.name();
        if self.to_create.contains_key(set_name) || self.to_update.contains_key(set_name) {
            self.reporter.invariant_violation(Violation::CreateWhileDirty, set_name);
            return;
        }
        match self.to_destroy.remove(set_name) {
            // Destroy then recreate nets out to an update. The pending deletes
            // get cancelled as the caller re-adds members.
            Some(pending) => {
                self.to_update.insert(set_name.to_string(), pending.diff);
            }
            None => {
                let diff = MemberDiff::from_live_members(set.members());
                self.to_create.insert(set_name.to_string(), diff);
            }
        }
    }

    fn add_member(&mut self, set: &IpSet, member: &str) {
        self.check_not_destroying(set.name(), Violation::AddMemberWhileDestroying);
        self.diff_for_member_change(set.name()).record_add(member);
    }

    fn delete_member(&mut self, set: &IpSet, member: &str) {
        self.check_not_destroying(set.name(), Violation::DeleteMemberWhileDestroying);
        self.diff_for_member_change(set.name()).record_delete(member);
    }

    fn destroy(&mut self, set: &IpSet) {
        let set_name = set.name();
        if self.to_destroy.contains_key(set_name) {
            self.reporter.invariant_violation(Violation::DestroyWhileDestroying, set_name);
            return;
        }
        let diff = match self.to_create.remove(set_name) {
            // never reached the kernel: nothing to delete
            Some(diff) => diff,
            None => {
                // The kernel copy may hold members this diff never touched.
                let mut diff = self.to_update.remove(set_name).unwrap_or_default();
                diff.seed_all_as_deletes(set.members());
                diff
            }
        };
        let identity = set.identity().clone();
        self.to_destroy.insert(set_name.to_string(), PendingDestroy { identity, diff });
    }

    fn sets_to_add_or_update(&self) -> HashSet<String> {
        self.to_create.keys().chain(self.to_update.keys()).cloned().collect()
    }

    fn sets_to_destroy(&self) -> HashSet<String> {
        self.to_destroy.keys().cloned().collect()
    }

    fn num_sets_to_add_or_update(&self) -> usize {
        self.to_create.len() + self.to_update.len()
    }

    fn num_sets_to_destroy(&self) -> usize {
        self.to_destroy.len()
    }

    fn is_set_to_add_or_update(&self, set_name: &str) -> bool {
        self.to_create.contains_key(set_name) || self.to_update.contains_key(set_name)
    }

    fn is_set_to_destroy(&self, set_name: &str) -> bool {
        self.to_destroy.contains_key(set_name)
    }

    fn destroyed_set(&self, set_name: &str) -> Option<&SetIdentity> {
        self.to_destroy.get(set_name).map(|pending| &pending.identity)
    }

    fn tracks_members(&self) -> bool {
        true
    }

    fn members_to_add(&self, set_name: &str) -> Option<&HashSet<String>> {
        self.diff(set_name).map(MemberDiff::members_to_add)
    }

    fn members_to_delete(&self, set_name: &str) -> Option<&HashSet<String>> {
        self.diff(set_name).map(MemberDiff::members_to_delete)
    }

    fn print_add_or_update_cache(&self) -> String {
        format!(
            "to create: {}, to update: {}",
            render_bucket(self.to_create.iter()),
            render_bucket(self.to_update.iter())
        )
    }

    fn print_destroy_cache(&self) -> String {
        render_bucket(self.to_destroy.iter().map(|(name, pending)| (name, &pending.diff)))
    }
}

fn render_bucket<'a>(bucket: impl Iterator<Item = (&'a String, &'a MemberDiff)>) -> String {
    let mut entries: Vec<(&String, &MemberDiff)> = bucket.collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let entries: Vec<String> = entries
        .into_iter()
        .map(|(name, diff)| format!("{}: {}", name, diff))
        .collect();
    format!("[{}]", entries.join(", "))
}
