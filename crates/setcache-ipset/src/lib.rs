//! ipset restore adapter for setcache
//!
//! Implements setcache's `Dataplane` trait by rendering each sync plan as an
//! `ipset restore` transaction and committing it to disk.
//!
//! # Architecture
//!
//! Linux applies set changes in one batch through `ipset restore -f <file>`.
//! The bridge works as follows:
//! - Kernel names (`prefix + crc32c`) come from each operation's set identity,
//!   the same names list sets use for their members
//! - Destroys are preceded by `create -exist`, so destroying a set the kernel
//!   never saw does not abort the transaction
//! - Creates use `-exist`, so sets already in the kernel are left alone
//! - Member adds and deletes use `-exist`, so a replayed transaction is harmless
//! - The transaction file is written next to its final path and atomically
//!   renamed into place, so the runner never reads a torn file
//!
//! Running the `ipset` binary against the file is left to the embedder.

pub mod platform_durability;
pub mod restore;
pub mod restore_file;

pub use restore::render_restore;
pub use restore_file::RestoreFileDataplane;
