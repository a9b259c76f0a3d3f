use super::*;
use crate::syscalls::*;

/// ### `path_unlink_file()`
/// Unlink a file, deleting if the number of hardlinks is 1
/// Inputs:
/// - `Fd fd`
///     The base file descriptor from which the path is understood
/// - `const char *path`
///     Array of UTF-8 bytes representing the path
/// - `u32 path_len`
///     The number of bytes in the `path` array
#[instrument(level = "debug", skip_all, fields(%fd, path = field::Empty), ret)]
pub fn path_unlink_file<M: GuestMemory + ?Sized>(
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
    wasi_try_fs!(env.fs.unlink(at, &path_string));
    Errno::Success
}
