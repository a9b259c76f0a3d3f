use super::*;
use crate::syscalls::*;

/// ### `sock_send()`
/// Send a message on a socket.
/// Note: This is similar to `send` in POSIX, though it also supports writing
/// the data from multiple buffers in the manner of `writev`.
///
/// ## Parameters
///
/// * `buf` - The data to be sent
/// * `buf_len` - Length of `buf`
///
/// ## Return
///
/// Number of bytes transmitted.
#[instrument(level = "trace", skip_all, fields(%sock, nsent = field::Empty), ret)]
pub fn sock_send<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    sock: WasiFd,
    buf: WasmPtr,
    buf_len: u32,
    ret_data_len: WasmPtr,
) -> Errno {
    let data = wasi_try_mem!(memory.read_vec(buf as u64, buf_len));
    let sent = wasi_try_net!(env.sockets.send(sock, &data));

    Span::current().record("nsent", sent);
    wasi_try_mem!(memory.write_u32(ret_data_len as u64, sent as u32));
    Errno::Success
}
