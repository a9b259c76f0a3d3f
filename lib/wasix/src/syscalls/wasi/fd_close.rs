use super::*;
use crate::syscalls::*;

/// ### `fd_close()`
/// Close an open file descriptor
/// For sockets this tears the connection down first
/// Inputs:
/// - `Fd fd`
///     A file descriptor mapping to an open file to close
/// Errors:
/// - `Errno::Badf`
///     If `fd` is invalid or not open
#[instrument(level = "debug", skip_all, fields(%fd), ret)]
pub fn fd_close(env: &mut WasiEnv, fd: WasiFd) -> Errno {
    if env.is_socket(fd) {
        wasi_try_net!(env.sockets.close(fd));
        return Errno::Success;
    }

    wasi_try_fs!(env.fs.close(fd));
    Errno::Success
}
