use super::*;
use crate::syscalls::*;

/// ### `sock_open()`
/// Create an endpoint for communication.
///
/// Note: This is similar to `socket` in POSIX
///
/// ## Parameters
///
/// * `af` - Address family (2 for IPv4, 10 for IPv6)
/// * `socktype` - Socket type, either datagram (2) or stream (1)
///
/// ## Return
///
/// The file descriptor of the socket that has been opened.
#[instrument(level = "debug", skip_all, fields(%af, %socktype, sock = field::Empty), ret)]
pub fn sock_open<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    af: i32,
    socktype: i32,
    ro_sock: WasmPtr,
) -> Errno {
    let Ok(af) = u8::try_from(af) else {
        return Errno::Afnosupport;
    };
    let Ok(socktype) = u8::try_from(socktype) else {
        return Errno::Inval;
    };

    let sock = wasi_try_net!(env.sockets.open(af, socktype));
    Span::current().record("sock", sock);

    if let Err(err) = memory.write_u32(ro_sock as u64, sock) {
        let _ = env.sockets.close(sock);
        return mem_error_to_wasi(err);
    }
    Errno::Success
}
