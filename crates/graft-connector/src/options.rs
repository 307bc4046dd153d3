//! Mount options and connector configuration.
//!
//! Configuration is plain serde data, read from RON. Timeouts are written
//! as seconds (`attr_timeout: 1.5`) and held as `Duration`s.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use graft_types::Owner;

/// Per-mount cache and ownership settings.
///
/// Sub-mounts mounted without explicit options inherit the root mount's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystemOptions {
    /// How long the kernel may cache a failed lookup.
    #[serde(with = "secs")]
    pub negative_timeout: Duration,
    /// How long the kernel may cache attributes.
    #[serde(with = "secs")]
    pub attr_timeout: Duration,
    /// How long the kernel may cache directory entries.
    #[serde(with = "secs")]
    pub entry_timeout: Duration,
    /// Ownership stamped on every entry reply; `None` keeps the backend's.
    pub owner: Option<Owner>,
    /// Skip the handle registry's identity cross-check.
    pub skip_check_handles: bool,
}

impl Default for FileSystemOptions {
    fn default() -> Self {
        Self {
            negative_timeout: Duration::ZERO,
            attr_timeout: Duration::from_secs(1),
            entry_timeout: Duration::from_secs(1),
            owner: current_owner(),
            skip_check_handles: false,
        }
    }
}

/// Owner of the running process.
#[cfg(unix)]
pub fn current_owner() -> Option<Owner> {
    Some(Owner {
        uid: rustix::process::getuid().as_raw(),
        gid: rustix::process::getgid().as_raw(),
    })
}

/// Owner of the running process.
#[cfg(not(unix))]
pub fn current_owner() -> Option<Owner> {
    None
}

/// Settings consumed when a connector is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Options of the root mount.
    pub options: FileSystemOptions,
    /// Run the structural self-check after every tree mutation.
    pub verify_tree: bool,
}

impl ConnectorConfig {
    /// Parse a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// `Duration` as fractional seconds.
pub mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
