//! Per-set member diff with add/delete cancellation.

use std::fmt;

use hashbrown::HashSet;

/// Members pending addition and members pending removal for one set.
///
/// A member is never pending in both directions: recording the opposite
/// operation cancels the pending one instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDiff {
    members_to_add: HashSet<String>,
    members_to_delete: HashSet<String>,
}

impl MemberDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff for a set the kernel does not have yet: every live member is an add.
    pub fn from_live_members<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut diff = Self::new();
        diff.seed_all_as_adds(members);
        diff
    }

    /// Mark a member as added. Cancels a pending delete of the same member.
    pub fn record_add(&mut self, member: &str) {
        if !self.members_to_delete.remove(member) {
            self.members_to_add.insert(member.to_string());
        }
    }

    /// Mark a member as deleted. Cancels a pending add of the same member.
    pub fn record_delete(&mut self, member: &str) {
        if !self.members_to_add.remove(member) {
            self.members_to_delete.insert(member.to_string());
        }
    }

    pub fn seed_all_as_adds<'a, I>(&mut self, members: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for member in members {
            self.record_add(member);
        }
    }

    /// Every member must leave the kernel. Pending adds of these members are
    /// cancelled rather than turned into deletes.
    pub fn seed_all_as_deletes<'a, I>(&mut self, members: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for member in members {
            self.record_delete(member);
        }
    }

    pub fn members_to_add(&self) -> &HashSet<String> {
        &self.members_to_add
    }

    pub fn members_to_delete(&self) -> &HashSet<String> {
        &self.members_to_delete
    }

    pub fn num_to_add(&self) -> usize {
        self.members_to_add.len()
    }

    pub fn num_to_delete(&self) -> usize {
        self.members_to_delete.len()
    }

    /// True if applying this diff would not change kernel membership.
    pub fn is_empty(&self) -> bool {
        self.members_to_add.is_empty() && self.members_to_delete.is_empty()
    }
}

impl fmt::Display for MemberDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adds: Vec<&str> = self.members_to_add.iter().map(String::as_str).collect();
        let mut deletes: Vec<&str> = self.members_to_delete.iter().map(String::as_str).collect();
        adds.sort_unstable();
        deletes.sort_unstable();
        write!(f, "{{add: {:?}, delete: {:?}}}", adds, deletes)
    }
}
