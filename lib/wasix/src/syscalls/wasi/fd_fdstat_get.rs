use super::*;
use crate::syscalls::*;
use wasmbox_wasi_types::SockType;

/// ### `fd_fdstat_get()`
/// Get metadata of a file descriptor
/// Input:
/// - `Fd fd`
///     The file descriptor whose metadata will be accessed
/// Output:
/// - `Fdstat *buf_ptr`
///     The location where the metadata will be written
#[instrument(level = "trace", skip_all, fields(%fd), ret)]
pub fn fd_fdstat_get<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    buf_ptr: WasmPtr,
) -> Errno {
    let stat = if env.is_socket(fd) {
        let kind = wasi_try_net!(env.sockets.kind(fd));
        Fdstat {
            fs_filetype: match kind {
                SockType::Stream => Filetype::SocketStream,
                SockType::Dgram => Filetype::SocketDgram,
            },
            fs_flags: Fdflags::empty(),
            fs_rights_base: SOCKET_RIGHTS,
            fs_rights_inheriting: Rights::empty(),
        }
    } else {
        wasi_try_fs!(env.fs.fdstat(fd))
    };

    wasi_try_mem!(memory.write(buf_ptr as u64, &stat.to_le_bytes()));
    Errno::Success
}
