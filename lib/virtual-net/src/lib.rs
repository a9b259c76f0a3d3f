//! Maps guest socket handles onto real outbound TCP connections.
//!
//! A [`SocketTable`] owns every guest socket. Name resolution and connection
//! establishment go through a [`VirtualNetworking`] implementation so the
//! embedder decides what the guest may reach; [`LocalNetworking`] uses the
//! host's network stack directly.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream};
use thiserror::Error;

mod host;
mod socket;
mod table;

pub use host::{LocalNetworking, UnsupportedNetworking};
pub use socket::SocketState;
pub use table::{SocketTable, DEFAULT_SOCKET_HANDLE_BASE};

pub use wasmbox_wasi_types::net::{read_wire_addr, write_wire_addr};
pub use wasmbox_wasi_types::{AddressFamily, SockType, WIRE_ADDR_SIZE};

pub type Result<T> = std::result::Result<T, NetworkError>;

/// Host networking as seen by the socket table.
///
/// Both calls block the calling thread until the host answers.
pub trait VirtualNetworking: fmt::Debug + Send + Sync + 'static {
    /// Looks up every address of `host` and pairs it with `port`.
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>>;

    /// Opens a TCP connection to `peer`.
    fn connect_tcp(&self, peer: SocketAddr) -> Result<TcpStream>;
}

#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum NetworkError {
    /// The handle does not name a socket
    #[error("invalid fd")]
    InvalidFd,
    /// The socket is not in a state that allows the operation
    #[error("invalid socket state")]
    InvalidState,
    /// The operation needs a connected socket
    #[error("connection is not open")]
    NotConnected,
    /// The address family is not supported by this socket
    #[error("address family not supported")]
    AddressFamilyNotSupported,
    /// The socket type cannot be used this way
    #[error("protocol wrong type for socket")]
    ProtocolWrongType,
    /// The provided data is invalid
    #[error("invalid input")]
    InvalidInput,
    /// The connection request was refused
    #[error("connection refused")]
    ConnectionRefused,
    /// The connection was reset
    #[error("connection reset")]
    ConnectionReset,
    /// The connection was aborted
    #[error("connection aborted")]
    ConnectionAborted,
    /// A pipe was closed
    #[error("broken pipe (was closed)")]
    BrokenPipe,
    /// The name lookup produced no address
    #[error("host not found")]
    HostNotFound,
    /// No route to the host
    #[error("host unreachable")]
    HostUnreachable,
    /// No route to the network
    #[error("network unreachable")]
    NetworkUnreachable,
    /// The operation did not complete within the given amount of time
    #[error("time out")]
    TimedOut,
    /// The address was in use
    #[error("address is in use")]
    AddressInUse,
    /// The address could not be found
    #[error("address could not be found")]
    AddressNotAvailable,
    /// The operation was interrupted before it could finish
    #[error("operation interrupted")]
    Interrupted,
    /// No more socket handles can be allocated
    #[error("too many open files")]
    TooManyOpenFiles,
    /// The operation is not supported
    #[error("unsupported")]
    Unsupported,
    /// Something failed when doing IO. These errors can generally not be handled.
    /// It may work if tried again.
    #[error("io error")]
    IOError,
}

pub fn io_err_into_net_error(net_error: io::Error) -> NetworkError {
    #[cfg(unix)]
    if let Some(code) = net_error.raw_os_error() {
        match code {
            libc::ENETUNREACH => return NetworkError::NetworkUnreachable,
            libc::EHOSTUNREACH => return NetworkError::HostUnreachable,
            libc::EAFNOSUPPORT => return NetworkError::AddressFamilyNotSupported,
            libc::EPROTOTYPE => return NetworkError::ProtocolWrongType,
            libc::EMFILE | libc::ENFILE => return NetworkError::TooManyOpenFiles,
            _ => {}
        }
    }
    match net_error.kind() {
        io::ErrorKind::BrokenPipe => NetworkError::BrokenPipe,
        io::ErrorKind::AddrInUse => NetworkError::AddressInUse,
        io::ErrorKind::AddrNotAvailable => NetworkError::AddressNotAvailable,
        io::ErrorKind::ConnectionAborted => NetworkError::ConnectionAborted,
        io::ErrorKind::ConnectionRefused => NetworkError::ConnectionRefused,
        io::ErrorKind::ConnectionReset => NetworkError::ConnectionReset,
        io::ErrorKind::Interrupted => NetworkError::Interrupted,
        io::ErrorKind::InvalidInput => NetworkError::InvalidInput,
        io::ErrorKind::NotConnected => NetworkError::NotConnected,
        io::ErrorKind::TimedOut => NetworkError::TimedOut,
        io::ErrorKind::Unsupported => NetworkError::Unsupported,
        _ => NetworkError::IOError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_network_errors() {
        let cases = [
            (io::ErrorKind::ConnectionRefused, NetworkError::ConnectionRefused),
            (io::ErrorKind::ConnectionReset, NetworkError::ConnectionReset),
            (io::ErrorKind::BrokenPipe, NetworkError::BrokenPipe),
            (io::ErrorKind::TimedOut, NetworkError::TimedOut),
            (io::ErrorKind::Other, NetworkError::IOError),
        ];
        for (kind, expected) in cases {
            assert_eq!(io_err_into_net_error(io::Error::from(kind)), expected);
        }
    }

    #[cfg(unix)]
    #[test]
    fn unreachable_errors_keep_their_meaning() {
        let err = io::Error::from_raw_os_error(libc::ENETUNREACH);
        assert_eq!(io_err_into_net_error(err), NetworkError::NetworkUnreachable);

        let err = io::Error::from_raw_os_error(libc::EHOSTUNREACH);
        assert_eq!(io_err_into_net_error(err), NetworkError::HostUnreachable);
    }
}
