use super::*;
use crate::syscalls::*;

/// ### `path_readlink()`
/// Read the value of a symlink
/// Inputs:
/// - `Fd dir_fd`
///     The base directory from which `path` is understood
/// - `const char *path`
///     Pointer to UTF-8 bytes that make up the path to the symlink
/// - `u32 path_len`
///     The number of bytes to read from `path`
/// - `u32 buf_len`
///     Space available pointed to by `buf`
/// Outputs:
/// - `char *buf`
///     Pointer to characters containing the path that the symlink points to
/// - `u32 buf_used`
///     The number of bytes written to `buf`
///
/// Symbolic links are never present: an existing path fails with `Inval`,
/// a missing one with `Noent`.
#[instrument(level = "debug", skip_all, fields(%dir_fd, path = field::Empty), ret)]
pub fn path_readlink<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    dir_fd: WasiFd,
    path: WasmPtr,
    path_len: u32,
    _buf: WasmPtr,
    _buf_len: u32,
    _buf_used: WasmPtr,
) -> Errno {
    let path_string = wasi_try!(read_path(memory, path, path_len));
    Span::current().record("path", path_string.as_str());

    let (at, path_string) = route_path(env, dir_fd, &path_string);
    wasi_try_fs!(env.fs.readlink(at, &path_string));
    Errno::Inval
}
