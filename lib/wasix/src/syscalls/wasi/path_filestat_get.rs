use super::*;
use crate::syscalls::*;

/// ### `path_filestat_get()`
/// Access metadata about a file or directory
/// Inputs:
/// - `Fd fd`
///     The directory that `path` is relative to
/// - `LookupFlags flags`
///     Flags to control how `path` is understood
/// - `const char *path`
///     String containing the file path
/// - `u32 path_len`
///     The length of the `path` string
/// Output:
/// - `__wasi_file_stat_t *buf`
///     The location where the metadata will be stored
#[instrument(level = "debug", skip_all, fields(%fd, %flags, path = field::Empty), ret)]
pub fn path_filestat_get<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    flags: u32,
    path: WasmPtr,
    path_len: u32,
    buf: WasmPtr,
) -> Errno {
    let path_string = wasi_try!(read_path(memory, path, path_len));
    Span::current().record("path", path_string.as_str());

    let (at, path_string) = route_path(env, fd, &path_string);
    let stat = wasi_try_fs!(env.fs.stat(at, &path_string));
    wasi_try_mem!(memory.write(buf as u64, &stat.to_le_bytes()));
    Errno::Success
}
