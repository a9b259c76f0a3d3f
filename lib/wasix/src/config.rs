//! Session configuration, usually loaded from a TOML file.
//!
//! ```toml
//! mount_prefix = "/lib"
//! max_open_handles = 1024
//! max_file_size = 268435456
//! virtual_mounts = ["/lib", "/tmp"]
//!
//! [[passthrough_mounts]]
//! guest_path = "/data"
//! host_path = "./data"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use virtual_fs::mem_fs::MAX_FILE_SIZE;
use virtual_net::DEFAULT_SOCKET_HANDLE_BASE;

/// First handle number available to mounts and opened files.
pub(crate) const FIRST_FREE_FD: u32 = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassthroughMount {
    /// Where the guest sees the directory.
    pub guest_path: String,
    /// The real directory on the host.
    pub host_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WasiConfig {
    /// Path-only calls naming this directory, or anything under it, always go
    /// to the in-memory tree, whatever directory handle they came with.
    pub mount_prefix: String,
    /// Upper bound on simultaneously open file handles, mounts included.
    pub max_open_handles: usize,
    /// Largest size, in bytes, a file in the in-memory tree may grow to.
    pub max_file_size: u64,
    /// First socket handle. Must sit above every possible file handle.
    pub socket_handle_base: u32,
    /// Guest directories backed by the in-memory tree.
    pub virtual_mounts: Vec<String>,
    /// Guest directories backed by real host directories.
    pub passthrough_mounts: Vec<PassthroughMount>,
    /// When false the guest gets a socket table that refuses every lookup
    /// and connection.
    pub networking: bool,
}

impl Default for WasiConfig {
    fn default() -> Self {
        WasiConfig {
            mount_prefix: "/lib".to_string(),
            max_open_handles: 1024,
            max_file_size: MAX_FILE_SIZE,
            socket_handle_base: DEFAULT_SOCKET_HANDLE_BASE,
            virtual_mounts: vec!["/lib".to_string()],
            passthrough_mounts: Vec::new(),
            networking: true,
        }
    }
}

impl WasiConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: WasiConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_guest_path("mount_prefix", &self.mount_prefix)?;
        if self.mount_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(
                "mount_prefix cannot be the root directory".to_string(),
            ));
        }
        for mount in &self.virtual_mounts {
            check_guest_path("virtual mount", mount)?;
        }
        for mount in &self.passthrough_mounts {
            check_guest_path("passthrough mount", &mount.guest_path)?;
        }

        let highest_fd = (FIRST_FREE_FD as u64).saturating_add(self.max_open_handles as u64);
        if highest_fd >= self.socket_handle_base as u64 {
            return Err(ConfigError::Invalid(format!(
                "socket_handle_base {:#x} overlaps the file handle range (up to {})",
                self.socket_handle_base, highest_fd
            )));
        }
        Ok(())
    }
}

fn check_guest_path(what: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Invalid(format!(
            "{what} `{path}` must be an absolute guest path"
        )));
    }
    if path.contains('\0') {
        return Err(ConfigError::Invalid(format!("{what} contains a nul byte")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_the_default() {
        let config = WasiConfig::from_toml_str("").unwrap();
        assert_eq!(config, WasiConfig::default());
        assert_eq!(config.mount_prefix, "/lib");
        assert_eq!(config.socket_handle_base, 0x4000_0000);
    }

    #[test]
    fn full_config_parses() {
        let config = WasiConfig::from_toml_str(
            r#"
            mount_prefix = "/usr/lib"
            max_open_handles = 16
            max_file_size = 65536
            socket_handle_base = 4096
            virtual_mounts = ["/usr/lib", "/tmp"]
            networking = false

            [[passthrough_mounts]]
            guest_path = "/data"
            host_path = "/srv/data"
            "#,
        )
        .unwrap();

        assert_eq!(config.mount_prefix, "/usr/lib");
        assert_eq!(config.max_open_handles, 16);
        assert_eq!(config.max_file_size, 65536);
        assert_eq!(config.socket_handle_base, 4096);
        assert_eq!(config.virtual_mounts, vec!["/usr/lib", "/tmp"]);
        assert!(!config.networking);
        assert_eq!(
            config.passthrough_mounts,
            vec![PassthroughMount {
                guest_path: "/data".to_string(),
                host_path: PathBuf::from("/srv/data"),
            }]
        );
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            WasiConfig::from_toml_str("mount_prefix = \"lib\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WasiConfig::from_toml_str("mount_prefix = \"/\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WasiConfig::from_toml_str("socket_handle_base = 100"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WasiConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wasmbox.toml");
        std::fs::write(&path, "max_open_handles = 8\n").unwrap();

        let config = WasiConfig::from_file(&path).unwrap();
        assert_eq!(config.max_open_handles, 8);

        assert!(matches!(
            WasiConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
