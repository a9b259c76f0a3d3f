use super::*;
use crate::syscalls::*;

/// ### `path_create_directory()`
/// Create directory at a path
/// Inputs:
/// - `Fd fd`
///     The directory that the path is relative to
/// - `const char *path`
///     String containing path data
/// - `u32 path_len`
///     The length of `path`
/// Errors:
/// Required Rights:
/// - Rights::PATH_CREATE_DIRECTORY
///     This right must be set on the directory that the file is created in
#[instrument(level = "debug", skip_all, fields(%fd, path = field::Empty), ret)]
pub fn path_create_directory<M: GuestMemory + ?Sized>(
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
    wasi_try_fs!(env.fs.mkdir(at, &path_string));
    Errno::Success
}
