//! The dirty cache contract shared by both variants.

use std::sync::Arc;

use hashbrown::HashSet;

use crate::coarse::CoarseDirtyCache;
use crate::config::{CacheVariant, Config};
use crate::ipset::{IpSet, SetIdentity};
use crate::member_aware::MemberAwareDirtyCache;
use crate::reporter::InvariantReporter;

/// Tracks which sets need a kernel operation since the last successful flush.
///
/// A set name is pending add/update or pending destroy, never both. Mutating
/// calls are expected from a single writer; wrap the cache in
/// [`crate::SharedDirtyCache`] if it must be reached from several threads.
pub trait DirtyCache: Send {
    /// Empty the cache. Call only after a flush succeeded.
    fn reset(&mut self);

    /// Mark a new set to be created.
    fn create(&mut self, set: &IpSet);

    /// Mark the set to be updated and track `member` as added (if supported).
    fn add_member(&mut self, set: &IpSet, member: &str);

    /// Mark the set to be updated and track `member` as deleted (if supported).
    fn delete_member(&mut self, set: &IpSet, member: &str);

    /// Mark the set to be destroyed.
    ///
    /// The member-aware variant records every member `set` holds right now as
    /// a pending delete, so call this before clearing the live set.
    fn destroy(&mut self, set: &IpSet);

    fn sets_to_add_or_update(&self) -> HashSet<String>;

    fn sets_to_destroy(&self) -> HashSet<String>;

    fn num_sets_to_add_or_update(&self) -> usize;

    fn num_sets_to_destroy(&self) -> usize;

    fn is_set_to_add_or_update(&self, set_name: &str) -> bool;

    fn is_set_to_destroy(&self, set_name: &str) -> bool;

    /// Kind and kernel name of a set pending destroy, captured when
    /// [`destroy`](Self::destroy) was called. `None` if not pending destroy.
    fn destroyed_set(&self, set_name: &str) -> Option<&SetIdentity>;

    /// True if [`members_to_add`](Self::members_to_add) and
    /// [`members_to_delete`](Self::members_to_delete) carry per-member diffs.
    /// Otherwise a dirty set must be resynced with its full live membership.
    fn tracks_members(&self) -> bool;

    /// Members to add for the set, `None` if clean or not tracked.
    fn members_to_add(&self, set_name: &str) -> Option<&HashSet<String>>;

    /// Members to delete for the set, `None` if clean or not tracked.
    fn members_to_delete(&self, set_name: &str) -> Option<&HashSet<String>>;

    /// Human-readable dump of the add/update bucket(s) for logs.
    fn print_add_or_update_cache(&self) -> String;

    /// Human-readable dump of the destroy bucket for logs.
    fn print_destroy_cache(&self) -> String;

    /// True if nothing is pending.
    fn is_empty(&self) -> bool {
        self.num_sets_to_add_or_update() == 0 && self.num_sets_to_destroy() == 0
    }
}

/// Build the cache variant the configuration selects.
pub fn new_dirty_cache(config: &Config, reporter: Arc<dyn InvariantReporter>) -> Box<dyn DirtyCache> {
    match config.variant {
        CacheVariant::MemberAware => Box::new(MemberAwareDirtyCache::new(reporter)),
        CacheVariant::Coarse => Box::new(CoarseDirtyCache::new(reporter)),
    }
}

/// Sorted names for stable diagnostic output.
pub(crate) fn sorted_names<'a, I>(names: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut names: Vec<&str> = names.into_iter().map(String::as_str).collect();
    names.sort_unstable();
    names
}
