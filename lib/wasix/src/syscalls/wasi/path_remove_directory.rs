use super::*;
use crate::syscalls::*;

/// ### `path_remove_directory()`
/// Remove an empty directory
/// Inputs:
/// - `Fd fd`
///     The base file descriptor from which the path is understood
/// - `const char *path`
///     The path to the directory to remove
/// - `u32 path_len`
///     The number of bytes in the `path` array
#[instrument(level = "debug", skip_all, fields(%fd, path = field::Empty), ret)]
pub fn path_remove_directory<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    path: WasmPtr,
    path_len: u32,
) -> Errno {
    let path_string = wasi_try!(read_path(memory, path, path_len));
    Span::current().record("path", path_string.as_str());
    if path_string.is_empty() {
        return Errno::Noent;
    }

    let (at, path_string) = route_path(env, fd, &path_string);
    wasi_try_fs!(env.fs.remove_dir(at, &path_string));
    Errno::Success
}
