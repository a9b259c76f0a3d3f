use super::*;
use crate::syscalls::*;

/// ### `fd_prestat_get()`
/// Get metadata about a preopened file descriptor
/// Input:
/// - `Fd fd`
///     The preopened file descriptor to query
/// Output:
/// - `__wasi_prestat *buf`
///     Where the metadata will be written
#[instrument(level = "trace", skip_all, fields(%fd), ret)]
pub fn fd_prestat_get<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    buf: WasmPtr,
) -> Errno {
    if env.is_socket(fd) {
        return Errno::Badf;
    }
    let name = wasi_try_fs!(env.fs.prestat_name(fd));
    let prestat = Prestat::dir(name.len() as u32);

    wasi_try_mem!(memory.write(buf as u64, &prestat.to_le_bytes()));
    Errno::Success
}
