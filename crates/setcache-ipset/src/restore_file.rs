//! Restore-file dataplane: commits each sync plan as an `ipset restore` file.
//!
//! Commit uses the atomic rename pattern:
//! 1. Write the transaction to `<path>.tmp`
//! 2. durable_sync the temp file
//! 3. Rename it over `<path>` (atomic on POSIX)
//! 4. durable_sync the parent directory
//!
//! A crash before the rename leaves the previous transaction intact; the
//! orphaned temp file is overwritten by the next commit.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use setcache_core::{Dataplane, SyncError, SyncPlan, SyncResult};

use crate::platform_durability::{durable_sync, sync_dir};
use crate::restore::render_restore;

/// Writes sync plans as restore transactions at a fixed path.
#[derive(Debug)]
pub struct RestoreFileDataplane {
    /// Final location of the transaction file
    path: PathBuf,
    /// Transactions committed since construction
    transactions: u64,
}

impl RestoreFileDataplane {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            transactions: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transactions_written(&self) -> u64 {
        self.transactions
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp: OsString = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn commit(&self, text: &str) -> SyncResult<()> {
        let tmp_path = self.temp_path();
        {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| io_error(&tmp_path, e, "Failed to create restore file"))?;
            file.write_all(text.as_bytes())
                .map_err(|e| io_error(&tmp_path, e, "Failed to write restore file"))?;
            durable_sync(&file).map_err(|e| io_error(&tmp_path, e, "Failed to sync restore file"))?;
        }

        fs::rename(&tmp_path, &self.path)
            .map_err(|e| io_error(&self.path, e, "Failed to rename restore file"))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            sync_dir(parent).map_err(|e| io_error(parent, e, "Failed to sync restore directory"))?;
        }
        Ok(())
    }
}

impl Dataplane for RestoreFileDataplane {
    fn apply(&mut self, plan: &SyncPlan) -> SyncResult<()> {
        let text = render_restore(plan);
        self.commit(&text)?;
        self.transactions += 1;
        info!(
            "committed ipset restore transaction #{} ({} operations) to {}",
            self.transactions,
            plan.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn io_error(path: &Path, err: std::io::Error, context: &str) -> SyncError {
    SyncError::Io {
        path: Some(path.to_path_buf()),
        kind: err.kind(),
        message: format!("{}: {}", context, err),
    }
}
