use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use wasmbox_wasi_types::{AddressFamily, SockType};

use crate::socket::{Socket, SocketState};
use crate::{io_err_into_net_error, NetworkError, Result, VirtualNetworking};

/// First socket handle, far above any file handle.
pub const DEFAULT_SOCKET_HANDLE_BASE: u32 = 0x4000_0000;

#[derive(Debug)]
struct Inner {
    sockets: HashMap<u32, Socket>,
    next: u32,
}

/// Every socket the guest has opened.
///
/// The lock only guards bookkeeping. It is never held across a name lookup,
/// a connect or a transfer, so a slow peer cannot stall unrelated sockets.
#[derive(Debug)]
pub struct SocketTable {
    inner: Mutex<Inner>,
    base: u32,
    net: Arc<dyn VirtualNetworking>,
}

impl SocketTable {
    pub fn new(net: Arc<dyn VirtualNetworking>) -> Self {
        Self::with_base(net, DEFAULT_SOCKET_HANDLE_BASE)
    }

    pub fn with_base(net: Arc<dyn VirtualNetworking>, base: u32) -> Self {
        SocketTable {
            inner: Mutex::new(Inner {
                sockets: HashMap::new(),
                next: base,
            }),
            base,
            net,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while the lock was held cannot leave the map half-updated:
        // every mutation is a single insert or remove.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Whether `handle` falls in the range reserved for sockets.
    pub fn owns(&self, handle: u32) -> bool {
        handle >= self.base
    }

    pub fn state(&self, handle: u32) -> Result<SocketState> {
        self.lock()
            .sockets
            .get(&handle)
            .map(|s| s.state)
            .ok_or(NetworkError::InvalidFd)
    }

    pub fn kind(&self, handle: u32) -> Result<SockType> {
        self.lock()
            .sockets
            .get(&handle)
            .map(|s| s.kind)
            .ok_or(NetworkError::InvalidFd)
    }

    pub fn peer(&self, handle: u32) -> Result<Option<SocketAddr>> {
        self.lock()
            .sockets
            .get(&handle)
            .map(|s| s.peer)
            .ok_or(NetworkError::InvalidFd)
    }

    /// Allocates an unbound socket. Only IPv4/IPv6 stream sockets exist.
    pub fn open(&self, family: u8, socktype: u8) -> Result<u32> {
        let family =
            AddressFamily::try_from(family).map_err(|_| NetworkError::AddressFamilyNotSupported)?;
        let kind = match SockType::try_from(socktype) {
            Ok(SockType::Stream) => SockType::Stream,
            Ok(SockType::Dgram) => return Err(NetworkError::ProtocolWrongType),
            Err(_) => return Err(NetworkError::InvalidInput),
        };

        let mut inner = self.lock();
        let handle = inner.next;
        inner.next = handle.checked_add(1).ok_or(NetworkError::TooManyOpenFiles)?;
        inner.sockets.insert(handle, Socket::new(handle, family, kind));
        debug!(handle, ?family, "socket opened");
        Ok(handle)
    }

    /// Resolves `host` and returns at most `capacity` addresses.
    pub fn resolve(&self, host: &str, port: u16, capacity: usize) -> Result<Vec<SocketAddr>> {
        let mut addrs = self.net.resolve(host, port)?;
        addrs.truncate(capacity);
        Ok(addrs)
    }

    /// Connects an unbound socket. A failed attempt leaves the socket
    /// closed; it is never retried.
    pub fn connect(&self, handle: u32, peer: SocketAddr) -> Result<()> {
        {
            let mut inner = self.lock();
            let socket = inner
                .sockets
                .get_mut(&handle)
                .ok_or(NetworkError::InvalidFd)?;
            if socket.state != SocketState::Unbound {
                return Err(NetworkError::InvalidState);
            }
            if socket.family != AddressFamily::of(&peer) {
                return Err(NetworkError::AddressFamilyNotSupported);
            }
            socket.state = SocketState::Connecting;
            trace!(handle, %peer, "socket connecting");
        }

        let result = self.net.connect_tcp(peer);

        let mut inner = self.lock();
        let Some(socket) = inner.sockets.get_mut(&handle) else {
            // Closed while the connection was being established.
            if let Ok(stream) = result {
                let _ = stream.shutdown(Shutdown::Both);
            }
            return Err(NetworkError::ConnectionAborted);
        };
        match result {
            Ok(stream) => {
                socket.state = SocketState::Connected;
                socket.peer = Some(peer);
                socket.stream = Some(Arc::new(stream));
                debug!(handle, %peer, "socket connected");
                Ok(())
            }
            Err(err) => {
                socket.state = SocketState::Closed;
                warn!(handle, %peer, %err, "socket connect failed");
                Err(err)
            }
        }
    }

    fn stream(&self, handle: u32) -> Result<Arc<TcpStream>> {
        let inner = self.lock();
        let socket = inner.sockets.get(&handle).ok_or(NetworkError::InvalidFd)?;
        match (&socket.state, &socket.stream) {
            (SocketState::Connected, Some(stream)) => Ok(stream.clone()),
            _ => Err(NetworkError::NotConnected),
        }
    }

    pub fn send(&self, handle: u32, data: &[u8]) -> Result<usize> {
        let stream = self.stream(handle)?;
        let sent = (&*stream).write(data).map_err(io_err_into_net_error)?;
        trace!(handle, sent, "socket send");
        Ok(sent)
    }

    /// Receives into `buf`. `Ok(0)` means the peer closed the connection.
    pub fn recv(&self, handle: u32, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream(handle)?;
        let received = (&*stream).read(buf).map_err(io_err_into_net_error)?;
        trace!(handle, received, "socket recv");
        Ok(received)
    }

    /// Tears down the connection and forgets the socket. Closing an unknown
    /// or already closed handle succeeds.
    pub fn close(&self, handle: u32) -> Result<()> {
        let removed = self.lock().sockets.remove(&handle);
        let Some(mut socket) = removed else {
            trace!(handle, "socket already closed");
            return Ok(());
        };
        if let Some(stream) = socket.stream.take() {
            if let Err(err) = stream.shutdown(Shutdown::Both) {
                trace!(handle = socket.handle, %err, "shutdown on close failed");
            }
        }
        socket.state = SocketState::Closed;
        debug!(handle = socket.handle, state = ?socket.state, "socket closed");
        Ok(())
    }

    /// Server sockets are not provided.
    pub fn accept(&self, handle: u32) -> Result<u32> {
        trace!(handle, "accept is not supported");
        Err(NetworkError::Unsupported)
    }

    /// Half-closing a connection is not provided.
    pub fn shutdown(&self, handle: u32) -> Result<()> {
        trace!(handle, "shutdown is not supported");
        Err(NetworkError::Unsupported)
    }
}
