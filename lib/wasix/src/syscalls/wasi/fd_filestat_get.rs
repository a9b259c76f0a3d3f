use super::*;
use crate::syscalls::*;

/// ### `fd_filestat_get()`
/// Get the metadata of an open file
/// Input:
/// - `Fd fd`
///     The open file descriptor whose metadata will be read
/// Output:
/// - `Filestat *buf`
///     Where the metadata from `fd` will be written
#[instrument(level = "debug", skip_all, fields(%fd), ret)]
pub fn fd_filestat_get<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    buf: WasmPtr,
) -> Errno {
    let stat = wasi_try!(fd_filestat_get_internal(env, fd));
    wasi_try_mem!(memory.write(buf as u64, &stat.to_le_bytes()));
    Errno::Success
}

pub(crate) fn fd_filestat_get_internal(env: &WasiEnv, fd: WasiFd) -> Result<Filestat, Errno> {
    if env.is_socket(fd) {
        env.sockets.kind(fd).map_err(net_error_into_wasi_err)?;
        return Ok(Filestat {
            st_filetype: Filetype::SocketStream,
            ..Default::default()
        });
    }
    env.fs.fstat(fd).map_err(fs_error_into_wasi_err)
}
