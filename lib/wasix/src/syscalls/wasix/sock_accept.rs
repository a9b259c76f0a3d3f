use super::*;
use crate::syscalls::*;

/// ### `sock_accept()`
/// Accept a new incoming connection.
/// Note: This is similar to `accept` in POSIX.
///
/// Listening sockets are not provided, so this always fails with `Notsup`.
///
/// ## Parameters
///
/// * `fd` - The listening socket.
/// * `flags` - The desired values of the file descriptor flags.
#[instrument(level = "debug", skip_all, fields(%sock, %fd_flags), ret)]
pub fn sock_accept<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    sock: WasiFd,
    fd_flags: u16,
    ro_fd: WasmPtr,
) -> Errno {
    let fd = wasi_try_net!(env.sockets.accept(sock));
    wasi_try_mem!(memory.write_u32(ro_fd as u64, fd));
    Errno::Success
}
