use super::*;
use crate::syscalls::*;

/// ### `sock_shutdown()`
/// Shut down socket send and receive channels.
/// Note: This is similar to `shutdown` in POSIX.
///
/// Half-closed connections are not provided; this always fails with
/// `Notsup`. Use `sock_close` instead.
///
/// ## Parameters
///
/// * `how` - Which channels on the socket to shut down.
#[instrument(level = "debug", skip_all, fields(%sock, %how), ret)]
pub fn sock_shutdown(env: &mut WasiEnv, sock: WasiFd, how: u8) -> Errno {
    wasi_try_net!(env.sockets.shutdown(sock));
    Errno::Success
}
