use super::*;
use crate::syscalls::*;

/// ### `fd_seek()`
/// Update file descriptor offset
/// Inputs:
/// - `Fd fd`
///     File descriptor to mutate
/// - `FileDelta offset`
///     Number of bytes to adjust offset by
/// - `Whence whence`
///     What the offset is relative to
/// Output:
/// - `Filesize *newoffset`
///     The new offset relative to the start of the file
#[instrument(level = "trace", skip_all, fields(%fd, %offset, ?whence), ret)]
pub fn fd_seek<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    offset: i64,
    whence: u8,
    newoffset: WasmPtr,
) -> Errno {
    if env.is_socket(fd) {
        return Errno::Spipe;
    }
    let whence = wasi_try!(Whence::try_from(whence).map_err(|_| Errno::Inval));

    let position = wasi_try_fs!(env.fs.seek(fd, offset, whence));
    wasi_try_mem!(memory.write_u64(newoffset as u64, position));
    Errno::Success
}
