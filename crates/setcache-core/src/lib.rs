//! Setcache Core — Dirty-Set Tracking for Kernel Membership Sets
//!
//! Network policy is enforced in the kernel through named membership sets
//! (ipsets on Linux, network objects elsewhere). Policy churn mutates the
//! in-memory copy of those sets constantly; this crate records which sets
//! changed since the last sync and, where the platform can apply them, exactly
//! which members must be added or removed.
//!
//! # Architecture
//!
//! - **Upstream**: the policy layer calls `create` / `add_member` /
//!   `delete_member` / `destroy` on a [`DirtyCache`] as it mutates [`IpSet`]s
//! - **Downstream**: a flush reads the query surface, builds a [`SyncPlan`],
//!   hands it to a [`Dataplane`], and resets the cache only on success
//! - **Variants**: [`MemberAwareDirtyCache`] keeps per-member diffs,
//!   [`CoarseDirtyCache`] keeps only dirty set names for platforms where a
//!   full resync is cheap
//!
//! Invariant violations from the caller never abort a call. They are handed
//! to an injected [`InvariantReporter`] and the cache carries on.

pub mod coarse;
pub mod config;
pub mod dirty_cache;
pub mod error;
pub mod flush;
pub mod ipset;
pub mod member_aware;
pub mod member_diff;
pub mod reporter;
pub mod shared;

// Re-export key types for convenience
pub use coarse::CoarseDirtyCache;
pub use config::{CacheVariant, Config};
pub use dirty_cache::{new_dirty_cache, DirtyCache};
pub use error::{SyncError, SyncResult};
pub use flush::{flush, Dataplane, FlushStats, SetOperation, SyncPlan};
pub use ipset::{IpSet, SetIdentity, SetKind};
pub use member_aware::MemberAwareDirtyCache;
pub use member_diff::MemberDiff;
pub use reporter::{CountingReporter, InvariantReporter, LogReporter, Violation};
pub use shared::SharedDirtyCache;
