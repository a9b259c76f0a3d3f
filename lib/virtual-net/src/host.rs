use crate::{io_err_into_net_error, NetworkError, Result, VirtualNetworking};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpStream};
use tokio::runtime::{Builder, Handle};
use tracing::{debug, trace, warn};

/// Networking backed by the host's own stack.
///
/// Name lookups run on a short-lived current-thread tokio runtime;
/// connections are plain blocking sockets.
#[derive(Debug, Default)]
pub struct LocalNetworking {}

impl LocalNetworking {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        if Handle::try_current().is_ok() {
            // Blocking on a runtime from inside another one panics, so the
            // lookup moves to a thread that has no runtime context.
            std::thread::scope(|scope| {
                scope
                    .spawn(|| block_on_lookup(host, port))
                    .join()
                    .map_err(|_| NetworkError::IOError)?
            })
        } else {
            block_on_lookup(host, port)
        }
    }
}

fn block_on_lookup(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let runtime = Builder::new_current_thread()
        .enable_io()
        .build()
        .map_err(io_err_into_net_error)?;
    match runtime.block_on(tokio::net::lookup_host((host, port))) {
        Ok(addrs) => Ok(addrs.collect()),
        Err(err) => {
            debug!(host, %err, "name lookup failed");
            Err(NetworkError::HostNotFound)
        }
    }
}

impl VirtualNetworking for LocalNetworking {
    fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        if host.is_empty() {
            return Err(NetworkError::InvalidInput);
        }
        let addrs = self.lookup(host, port)?;
        if addrs.is_empty() {
            return Err(NetworkError::HostNotFound);
        }
        trace!(host, count = addrs.len(), "resolved");
        Ok(addrs)
    }

    fn connect_tcp(&self, peer: SocketAddr) -> Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(peer), Type::STREAM, Some(Protocol::TCP))
            .map_err(io_err_into_net_error)?;
        socket.connect(&peer.into()).map_err(io_err_into_net_error)?;
        if let Err(err) = socket.set_nodelay(true) {
            warn!(%peer, %err, "failed to disable nagle");
        }
        Ok(socket.into())
    }
}

/// Networking that refuses everything. Used when the guest gets no network.
#[derive(Debug, Default)]
pub struct UnsupportedNetworking;

impl VirtualNetworking for UnsupportedNetworking {
    fn resolve(&self, _host: &str, _port: u16) -> Result<Vec<SocketAddr>> {
        Err(NetworkError::Unsupported)
    }

    fn connect_tcp(&self, _peer: SocketAddr) -> Result<TcpStream> {
        Err(NetworkError::Unsupported)
    }
}
