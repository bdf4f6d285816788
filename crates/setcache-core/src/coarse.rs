//! Coarse dirty cache: tracks which sets are dirty, not which members.
//!
//! For platforms whose sync primitive replaces a set's whole membership
//! cheaply. The flush resyncs every dirty set from its live membership.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::dirty_cache::{sorted_names, DirtyCache};
use crate::ipset::{IpSet, SetIdentity};
use crate::reporter::{InvariantReporter, Violation};

/// Dirty cache that records set names only.
pub struct CoarseDirtyCache {
    dirty_add_or_update: HashSet<String>,
    /// Sets pending destroy, keyed by name
    dirty_destroy: HashMap<String, SetIdentity>,
    reporter: Arc<dyn InvariantReporter>,
}

impl CoarseDirtyCache {
    pub fn new(reporter: Arc<dyn InvariantReporter>) -> Self {
        Self {
            dirty_add_or_update: HashSet::new(),
            dirty_destroy: HashMap::new(),
            reporter,
        }
    }

    fn mark_add_or_update(&mut self, set_name: &str) {
        self.dirty_destroy.remove(set_name);
        self.dirty_add_or_update.insert(set_name.to_string());
    }

    fn check_not_destroying(&self, set_name: &str, violation: Violation) {
        if self.dirty_destroy.contains_key(set_name) {
            self.reporter.invariant_violation(violation, set_name);
        }
    }
}

impl DirtyCache for CoarseDirtyCache {
    fn reset(&mut self) {
        self.dirty_add_or_update.clear();
        self.dirty_destroy.clear();
    }

    fn create(&mut self, set: &IpSet) {
        if self.dirty_add_or_update.contains(set.name()) {
            self.reporter.invariant_violation(Violation::CreateWhileDirty, set.name());
            return;
        }
        self.mark_add_or_update(set.name());
    }

    fn add_member(&mut self, set: &IpSet, _member: &str) {
        self.check_not_destroying(set.name(), Violation::AddMemberWhileDestroying);
        self.mark_add_or_update(set.name());
    }

    fn delete_member(&mut self, set: &IpSet, _member: &str) {
        self.check_not_destroying(set.name(), Violation::DeleteMemberWhileDestroying);
        self.mark_add_or_update(set.name());
    }

    fn destroy(&mut self, set: &IpSet) {
        if self.dirty_destroy.contains_key(set.name()) {
            self.reporter.invariant_violation(Violation::DestroyWhileDestroying, set.name());
            return;
        }
        self.dirty_add_or_update.remove(set.name());
        self.dirty_destroy.insert(set.name().to_string(), set.identity().clone());
    }

    fn sets_to_add_or_update(&self) -> HashSet<String> {
        self.dirty_add_or_update.clone()
    }

    fn sets_to_destroy(&self) -> HashSet<String> {
        self.dirty_destroy.keys().cloned().collect()
    }

    fn num_sets_to_add_or_update(&self) -> usize {
        self.dirty_add_or_update.len()
    }

    fn num_sets_to_destroy(&self) -> usize {
        self.dirty_destroy.len()
    }

    fn is_set_to_add_or_update(&self, set_name: &str) -> bool {
        self.dirty_add_or_update.contains(set_name)
    }

    fn is_set_to_destroy(&self, set_name: &str) -> bool {
        self.dirty_destroy.contains_key(set_name)
    }

    fn destroyed_set(&self, set_name: &str) -> Option<&SetIdentity> {
        self.dirty_destroy.get(set_name)
    }

    fn tracks_members(&self) -> bool {
        false
    }

    fn members_to_add(&self, _set_name: &str) -> Option<&HashSet<String>> {
        None
    }

    fn members_to_delete(&self, _set_name: &str) -> Option<&HashSet<String>> {
        None
    }

    fn print_add_or_update_cache(&self) -> String {
        format!("{:?}", sorted_names(&self.dirty_add_or_update))
    }

    fn print_destroy_cache(&self) -> String {
        format!("{:?}", sorted_names(self.dirty_destroy.keys()))
    }
}
