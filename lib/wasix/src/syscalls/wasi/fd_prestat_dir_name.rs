use super::*;
use crate::syscalls::*;

/// ### `fd_prestat_dir_name()`
/// Get the guest path of a preopened directory
/// Inputs:
/// - `Fd fd`
///     The preopened directory
/// - `u32 path_len`
///     Size of the buffer at `path`
/// Output:
/// - `char *path`
///     The directory's path, without a terminating nul
/// Errors:
/// - `Errno::Overflow`
///     If `path_len` is shorter than the name
#[instrument(level = "trace", skip_all, fields(%fd, path = field::Empty), ret)]
pub fn fd_prestat_dir_name<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    path: WasmPtr,
    path_len: u32,
) -> Errno {
    if env.is_socket(fd) {
        return Errno::Badf;
    }
    let name = wasi_try_fs!(env.fs.prestat_name(fd));
    Span::current().record("path", name);

    if (path_len as usize) < name.len() {
        return Errno::Overflow;
    }
    wasi_try_mem!(memory.write(path as u64, name.as_bytes()));
    Errno::Success
}
