use super::*;
use crate::syscalls::*;

/// ### `fd_filestat_set_size()`
/// Change the size of an open file, zeroing out any new bytes
/// Inputs:
/// - `Fd fd`
///     File descriptor to adjust
/// - `Filesize st_size`
///     New size that `fd` will be set to
#[instrument(level = "debug", skip_all, fields(%fd, %st_size), ret)]
pub fn fd_filestat_set_size(env: &mut WasiEnv, fd: WasiFd, st_size: u64) -> Errno {
    if env.is_socket(fd) {
        return Errno::Inval;
    }

    wasi_try_fs!(env.fs.set_len(fd, st_size));
    Errno::Success
}
