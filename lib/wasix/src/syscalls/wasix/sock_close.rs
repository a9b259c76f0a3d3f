use super::*;
use crate::syscalls::*;

/// ### `sock_close()`
/// Close a socket, tearing down its connection. Closing a socket twice
/// succeeds.
#[instrument(level = "debug", skip_all, fields(%sock), ret)]
pub fn sock_close(env: &mut WasiEnv, sock: WasiFd) -> Errno {
    if !env.is_socket(sock) {
        return Errno::Badf;
    }
    wasi_try_net!(env.sockets.close(sock));
    Errno::Success
}
