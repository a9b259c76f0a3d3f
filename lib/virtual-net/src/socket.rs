use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use wasmbox_wasi_types::{AddressFamily, SockType};

/// Lifecycle of a guest socket.
///
/// Clients move `Unbound -> Connecting -> Connected` and end in `Closed`.
/// `Bound` and `Listening` belong to the server path, which no operation
/// reaches yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Unbound,
    Bound,
    Listening,
    Connecting,
    Connected,
    Closed,
}

#[derive(Debug)]
pub(crate) struct Socket {
    pub(crate) handle: u32,
    pub(crate) kind: SockType,
    pub(crate) family: AddressFamily,
    pub(crate) state: SocketState,
    pub(crate) peer: Option<SocketAddr>,
    /// Shared so I/O can run on a clone after the table lock is released.
    pub(crate) stream: Option<Arc<TcpStream>>,
}

impl Socket {
    pub(crate) fn new(handle: u32, family: AddressFamily, kind: SockType) -> Self {
        Socket {
            handle,
            kind,
            family,
            state: SocketState::Unbound,
            peer: None,
            stream: None,
        }
    }
}
