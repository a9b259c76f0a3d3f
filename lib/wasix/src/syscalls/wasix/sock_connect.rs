use super::*;
use crate::syscalls::*;
use wasmbox_wasi_types::net::read_wire_addr;
use wasmbox_wasi_types::WIRE_ADDR_SIZE;

/// ### `sock_connect()`
/// Initiate a connection on a socket to the specified address
///
/// The call blocks until the connection is established or has failed. A
/// failed attempt closes the socket.
///
/// Note: This is similar to `connect` in POSIX
///
/// ## Parameters
///
/// * `fd` - Socket descriptor
/// * `addr` - Address of the socket to connect to
#[instrument(level = "debug", skip_all, fields(%sock, addr = field::Empty), ret)]
pub fn sock_connect<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    sock: WasiFd,
    addr: WasmPtr,
) -> Errno {
    let raw = wasi_try_mem!(memory.read_vec(addr as u64, WIRE_ADDR_SIZE as u32));
    let peer_addr = wasi_try!(read_wire_addr(&raw));
    Span::current().record("addr", field::display(peer_addr));

    wasi_try_net!(env.sockets.connect(sock, peer_addr));
    Errno::Success
}
