//! Durable writes for restore transactions.
//!
//! A restore file must be on stable storage before it is renamed into place,
//! and the rename itself must survive a crash. Each platform exposes a
//! different primitive for that.

use std::fs::File;
use std::io;
use std::path::Path;

/// Flush file contents to persistent storage before returning.
///
/// - Linux: `fdatasync()`
/// - macOS/iOS: `fcntl(F_FULLFSYNC)`, plain fsync stops at the drive cache
/// - Windows: `FlushFileBuffers()`
/// - Other: `File::sync_data()`
pub fn durable_sync(file: &File) -> io::Result<()> {
    platform_sync(file)
}

/// Persist directory entries (e.g. a rename) under `dir`.
///
/// Windows cannot open a directory as a file and commits renames through
/// the file system journal, so this is a no-op there.
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    if cfg!(windows) {
        return Ok(());
    }
    let handle = File::open(dir)?;
    durable_sync(&handle)
}

#[cfg(target_os = "linux")]
fn platform_sync(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor comes from a live File borrowed for this call.
    check_zero(unsafe { libc::fdatasync(file.as_raw_fd()) })
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn platform_sync(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor comes from a live File borrowed for this call.
    check_zero(unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) })
}

#[cfg(target_os = "windows")]
fn platform_sync(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::FlushFileBuffers;
    // SAFETY: the handle comes from a live File borrowed for this call.
    let ok = unsafe { FlushFileBuffers(file.as_raw_handle() as *mut _) };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios", target_os = "windows")))]
fn platform_sync(file: &File) -> io::Result<()> {
    file.sync_data()
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
fn check_zero(result: libc::c_int) -> io::Result<()> {
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
