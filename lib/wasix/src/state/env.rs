use std::sync::Arc;

use virtual_net::SocketTable;

use super::WasiEnvBuilder;
use crate::{WasiConfig, WasiFs};

/// One guest session.
#[derive(Debug)]
pub struct WasiEnv {
    pub fs: WasiFs,
    /// Shared so several sessions may use one proxy.
    pub sockets: Arc<SocketTable>,
    pub config: WasiConfig,
}

impl WasiEnv {
    pub fn builder() -> WasiEnvBuilder {
        WasiEnvBuilder::new()
    }

    /// The directory whose paths always resolve in the in-memory tree.
    pub fn mount_prefix(&self) -> &str {
        &self.config.mount_prefix
    }

    /// Whether `fd` falls in the socket handle range.
    pub fn is_socket(&self, fd: u32) -> bool {
        self.sockets.owns(fd)
    }
}
