//! Live set objects owned by the policy layer.
//!
//! An [`IpSet`] is the authoritative, in-memory membership of one named set.
//! The dirty cache only reads it for the duration of a call (to seed a new
//! diff or to force deletions on destroy).

use hashbrown::HashSet;

use crate::config::{kernel_name_with_prefix, Config, DEFAULT_KERNEL_NAME_PREFIX};

/// Kind of kernel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKind {
    /// Leaf members: IPs and CIDRs
    Hash,
    /// Leaf members: `ip,port` pairs such as `10.0.0.1,tcp:80`
    NamedPorts,
    /// Members are kernel names of other sets
    List,
}

impl SetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetKind::Hash => "hash",
            SetKind::NamedPorts => "namedports",
            SetKind::List => "list",
        }
    }

    /// List sets reference other sets and must be created after and destroyed
    /// before them.
    pub fn is_list(&self) -> bool {
        matches!(self, SetKind::List)
    }
}

/// Everything the kernel needs to address a set, without its members.
///
/// The dirty cache keeps one for every set pending destroy, since the policy
/// layer usually drops the live set right after destroying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetIdentity {
    name: String,
    kernel_name: String,
    kind: SetKind,
}

impl SetIdentity {
    pub fn new(name: impl Into<String>, kind: SetKind, prefix: &str) -> Self {
        let name = name.into();
        let kernel_name = kernel_name_with_prefix(prefix, &name);
        Self { name, kernel_name, kind }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }
}

/// A named membership set as the policy layer sees it.
#[derive(Debug, Clone)]
pub struct IpSet {
    identity: SetIdentity,
    members: HashSet<String>,
}

impl IpSet {
    /// New empty set named with the default kernel name prefix.
    pub fn new(name: impl Into<String>, kind: SetKind) -> Self {
        Self::with_prefix(name, kind, DEFAULT_KERNEL_NAME_PREFIX)
    }

    /// New empty set whose kernel name uses `prefix`.
    pub fn with_prefix(name: impl Into<String>, kind: SetKind, prefix: &str) -> Self {
        Self {
            identity: SetIdentity::new(name, kind, prefix),
            members: HashSet::new(),
        }
    }

    /// New empty set named the way `config` names kernel sets.
    ///
    /// Every set of one dataplane must use the same prefix: list sets
    /// reference their members by kernel name.
    pub fn for_config(name: impl Into<String>, kind: SetKind, config: &Config) -> Self {
        Self::with_prefix(name, kind, &config.kernel_name_prefix)
    }

    pub fn identity(&self) -> &SetIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// Hashed, prefixed name the kernel sees. List sets reference members by it.
    pub fn kernel_name(&self) -> &str {
        self.identity.kernel_name()
    }

    pub fn kind(&self) -> SetKind {
        self.identity.kind()
    }

    /// Current live members, in no particular order.
    pub fn members(&self) -> impl Iterator<Item = &str> + '_ {
        self.members.iter().map(String::as_str)
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Insert a raw member. Returns false if it was already present.
    pub fn insert_member(&mut self, member: impl Into<String>) -> bool {
        self.members.insert(member.into())
    }

    /// Remove a raw member. Returns false if it was absent.
    pub fn remove_member(&mut self, member: &str) -> bool {
        self.members.remove(member)
    }

    /// Reference another set from a list set by its kernel name.
    ///
    /// Returns the member string that was inserted, so the caller can feed the
    /// same string to the dirty cache. `None` if `self` is not a list set or
    /// the reference was already present.
    pub fn insert_member_set(&mut self, other: &IpSet) -> Option<String> {
        if !self.kind().is_list() {
            return None;
        }
        let member = other.kernel_name().to_string();
        if self.members.insert(member.clone()) {
            Some(member)
        } else {
            None
        }
    }

    /// Drop a reference to another set. Returns the removed member string.
    pub fn remove_member_set(&mut self, other: &IpSet) -> Option<String> {
        if !self.kind().is_list() {
            return None;
        }
        self.members.take(other.kernel_name())
    }
}
