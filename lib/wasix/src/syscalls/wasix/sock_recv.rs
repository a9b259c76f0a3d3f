use super::*;
use crate::syscalls::*;

/// ### `sock_recv()`
/// Receive a message from a socket.
/// Note: This is similar to `recv` in POSIX.
///
/// ## Parameters
///
/// * `buf` - Where the received data is placed
/// * `buf_len` - Capacity of `buf`
///
/// ## Return
///
/// Number of bytes stored in `buf`. Zero means the peer closed the
/// connection.
#[instrument(level = "trace", skip_all, fields(%sock, nread = field::Empty), ret)]
pub fn sock_recv<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    sock: WasiFd,
    buf: WasmPtr,
    buf_len: u32,
    ro_data_len: WasmPtr,
) -> Errno {
    let end = buf as u64 + buf_len as u64;
    if end > memory.size() {
        return Errno::Fault;
    }

    let mut data = vec![0u8; buf_len as usize];
    let read = wasi_try_net!(env.sockets.recv(sock, &mut data));
    wasi_try_mem!(memory.write(buf as u64, &data[..read]));

    Span::current().record("nread", read);
    wasi_try_mem!(memory.write_u32(ro_data_len as u64, read as u32));
    Errno::Success
}
