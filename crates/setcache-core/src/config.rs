//! Configuration for the dirty cache
//!
//! Provides platform presets that pick the cache variant and the naming
//! scheme for kernel-visible set names.

/// Kernel set names are limited to 31 bytes (IPSET_MAXNAMELEN minus NUL).
pub const MAX_KERNEL_NAME_LEN: usize = 31;

/// Width of the decimal CRC32C suffix appended to the prefix.
pub const KERNEL_NAME_HASH_DIGITS: usize = 10;

/// Prefix used by the presets and by [`crate::IpSet::new`].
pub const DEFAULT_KERNEL_NAME_PREFIX: &str = "setcache-";

/// Which dirty cache implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheVariant {
    /// Per-member diffs. For platforms that apply incremental add/delete.
    MemberAware,
    /// Dirty set names only. For platforms where a full resync is cheap.
    Coarse,
}

/// Setcache configuration with platform presets
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache implementation chosen at construction time
    pub variant: CacheVariant,
    /// Prefix for kernel-visible set names
    pub kernel_name_prefix: String,
}

impl Config {
    /// Linux: ipset applies incremental add/del cheaply, so track members.
    pub fn linux() -> Self {
        Self {
            variant: CacheVariant::MemberAware,
            kernel_name_prefix: DEFAULT_KERNEL_NAME_PREFIX.to_string(),
        }
    }

    /// Windows: network objects are replaced wholesale, so track set names only.
    pub fn windows() -> Self {
        Self {
            variant: CacheVariant::Coarse,
            kernel_name_prefix: DEFAULT_KERNEL_NAME_PREFIX.to_string(),
        }
    }

    /// Preset for the platform this binary was built for.
    pub fn for_target() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::linux()
        }
    }

    /// Kernel-visible name for a set: prefix plus zero-padded CRC32C of the name.
    pub fn kernel_name(&self, set_name: &str) -> String {
        kernel_name_with_prefix(&self.kernel_name_prefix, set_name)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.kernel_name_prefix.is_empty() {
            return Err("kernel_name_prefix must not be empty".into());
        }
        if !self.kernel_name_prefix.is_ascii() {
            return Err("kernel_name_prefix must be ASCII".into());
        }
        if self.kernel_name_prefix.chars().any(char::is_whitespace) {
            return Err("kernel_name_prefix must not contain whitespace".into());
        }
        let max_prefix = MAX_KERNEL_NAME_LEN - KERNEL_NAME_HASH_DIGITS;
        if self.kernel_name_prefix.len() > max_prefix {
            return Err(format!("kernel_name_prefix must be at most {} bytes", max_prefix));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::for_target() }
}

pub(crate) fn kernel_name_with_prefix(prefix: &str, set_name: &str) -> String {
    let hash = crc32c::crc32c(set_name.as_bytes());
    format!("{}{:0width$}", prefix, hash, width = KERNEL_NAME_HASH_DIGITS)
}
