//! Builder system for configuring a [`WasiEnv`] and creating it.

use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use virtual_fs::FsError;
use virtual_net::{LocalNetworking, SocketTable, UnsupportedNetworking, VirtualNetworking};

use super::WasiEnv;
use crate::{ConfigError, PassthroughMount, WasiConfig, WasiFs};

/// Error type returned when bad data is given to [`WasiEnvBuilder`].
#[derive(Error, Debug)]
pub enum WasiStateCreationError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("mount point `{0}` is not an absolute guest path")]
    InvalidMount(String),
    #[error("passthrough mount `{guest_path}` could not use host directory `{}`", .host_path.display())]
    PassthroughMountFailed {
        guest_path: String,
        host_path: PathBuf,
        #[source]
        source: FsError,
    },
    #[error("socket table base {table:#x} does not match the configured base {configured:#x}")]
    SocketBaseMismatch { table: u32, configured: u32 },
    #[error(transparent)]
    FileSystemError(#[from] FsError),
}

/// Convenient builder API for configuring a guest session.
///
/// Mount points are registered in order, virtual mounts first, and receive
/// handles 3, 4, 5, ...
///
/// ```
/// use wasmbox_wasix::{CaptureBuffer, WasiEnv};
///
/// let stdout = CaptureBuffer::new();
/// let env = WasiEnv::builder()
///     .virtual_mount("/tmp")
///     .stdout(Box::new(stdout.clone()))
///     .file("/lib/site.py", "import os")
///     .build()
///     .unwrap();
///
/// let mounts: Vec<_> = env.fs.mounts().collect();
/// assert_eq!(mounts, vec![("/lib", 3), ("/tmp", 4)]);
/// ```
#[derive(Default)]
pub struct WasiEnvBuilder {
    config: WasiConfig,
    virtual_mounts: Vec<String>,
    passthrough_mounts: Vec<PassthroughMount>,
    stdin: Option<Box<dyn Read + Send>>,
    stdout: Option<Box<dyn Write + Send>>,
    stderr: Option<Box<dyn Write + Send>>,
    networking: Option<Arc<dyn VirtualNetworking>>,
    sockets: Option<Arc<SocketTable>>,
    files: Vec<(String, Vec<u8>)>,
}

impl fmt::Debug for WasiEnvBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasiEnvBuilder")
            .field("config", &self.config)
            .field("virtual_mounts", &self.virtual_mounts)
            .field("passthrough_mounts", &self.passthrough_mounts)
            .field("stdin", &self.stdin.is_some())
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .field("networking", &self.networking)
            .field("files", &self.files.len())
            .finish()
    }
}

impl WasiEnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration. Mounts added through the builder
    /// are kept and registered after the configured ones.
    pub fn config(mut self, config: WasiConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a guest directory backed by the in-memory tree.
    pub fn virtual_mount(mut self, guest_path: impl Into<String>) -> Self {
        self.virtual_mounts.push(guest_path.into());
        self
    }

    /// Adds a guest directory backed by a real host directory.
    pub fn passthrough_mount(
        mut self,
        guest_path: impl Into<String>,
        host_path: impl Into<PathBuf>,
    ) -> Self {
        self.passthrough_mounts.push(PassthroughMount {
            guest_path: guest_path.into(),
            host_path: host_path.into(),
        });
        self
    }

    pub fn stdin(mut self, reader: Box<dyn Read + Send>) -> Self {
        self.stdin = Some(reader);
        self
    }

    pub fn stdout(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.stdout = Some(writer);
        self
    }

    pub fn stderr(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.stderr = Some(writer);
        self
    }

    /// Overrides how sockets reach the outside world.
    pub fn networking(mut self, net: Arc<dyn VirtualNetworking>) -> Self {
        self.networking = Some(net);
        self
    }

    /// Shares an existing socket table with this session. Its handle base
    /// must equal the configured `socket_handle_base`.
    pub fn sockets(mut self, sockets: Arc<SocketTable>) -> Self {
        self.sockets = Some(sockets);
        self
    }

    /// Places a file in the in-memory tree, creating its parent directories.
    pub fn file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), data.into()));
        self
    }

    pub fn build(self) -> Result<WasiEnv, WasiStateCreationError> {
        let WasiEnvBuilder {
            mut config,
            virtual_mounts,
            passthrough_mounts,
            stdin,
            stdout,
            stderr,
            networking,
            sockets,
            files,
        } = self;

        for mount in virtual_mounts {
            if !config.virtual_mounts.contains(&mount) {
                config.virtual_mounts.push(mount);
            }
        }
        config.passthrough_mounts.extend(passthrough_mounts);
        for mount in &config.virtual_mounts {
            if !mount.starts_with('/') {
                return Err(WasiStateCreationError::InvalidMount(mount.clone()));
            }
        }
        for mount in &config.passthrough_mounts {
            if !mount.guest_path.starts_with('/') {
                return Err(WasiStateCreationError::InvalidMount(
                    mount.guest_path.clone(),
                ));
            }
        }
        config.validate()?;

        let mut fs = WasiFs::new(config.max_open_handles, config.socket_handle_base);
        fs.set_max_file_size(config.max_file_size);
        if let Some(stdin) = stdin {
            fs.set_stdin(stdin);
        }
        if let Some(stdout) = stdout {
            fs.set_stdout(stdout);
        }
        if let Some(stderr) = stderr {
            fs.set_stderr(stderr);
        }

        for mount in &config.virtual_mounts {
            fs.add_virtual_mount(mount)?;
        }
        for mount in &config.passthrough_mounts {
            fs.add_passthrough_mount(&mount.guest_path, &mount.host_path)
                .map_err(|source| WasiStateCreationError::PassthroughMountFailed {
                    guest_path: mount.guest_path.clone(),
                    host_path: mount.host_path.clone(),
                    source,
                })?;
        }
        for (path, data) in &files {
            fs.create_with_content(path, data)?;
        }

        let sockets = match sockets {
            Some(sockets) => {
                if sockets.base() != config.socket_handle_base {
                    return Err(WasiStateCreationError::SocketBaseMismatch {
                        table: sockets.base(),
                        configured: config.socket_handle_base,
                    });
                }
                sockets
            }
            None => {
                let net: Arc<dyn VirtualNetworking> = match networking {
                    Some(net) => net,
                    None if config.networking => Arc::new(LocalNetworking::new()),
                    None => Arc::new(UnsupportedNetworking),
                };
                Arc::new(SocketTable::with_base(net, config.socket_handle_base))
            }
        };

        debug!(
            mounts = config.virtual_mounts.len() + config.passthrough_mounts.len(),
            files = files.len(),
            socket_base = config.socket_handle_base,
            "wasi session created"
        );
        Ok(WasiEnv {
            fs,
            sockets,
            config,
        })
    }
}
