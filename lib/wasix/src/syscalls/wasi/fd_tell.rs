use super::*;
use crate::syscalls::*;

/// ### `fd_tell()`
/// Get the offset of the file descriptor
/// Inputs:
/// - `Fd fd`
///     The file descriptor to access
/// Output:
/// - `Filesize *offset`
///     The offset of `fd` relative to the start of the file
#[instrument(level = "debug", skip_all, fields(%fd, offset = field::Empty), ret)]
pub fn fd_tell<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    offset: WasmPtr,
) -> Errno {
    if env.is_socket(fd) {
        return Errno::Spipe;
    }

    let position = wasi_try_fs!(env.fs.tell(fd));
    Span::current().record("offset", position);
    wasi_try_mem!(memory.write_u64(offset as u64, position));
    Errno::Success
}
