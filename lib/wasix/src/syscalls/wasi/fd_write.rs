use super::*;
use crate::syscalls::*;

/// ### `fd_write()`
/// Write data to the file descriptor
/// Inputs:
/// - `Fd fd`
///     File descriptor (opened with writing) to write to
/// - `const __wasi_ciovec_t *iovs`
///     List of vectors to read data from
/// - `u32 iovs_len`
///     Length of data in `iovs`
/// Output:
/// - `u32 *nwritten`
///     Number of bytes written
/// Errors:
///
/// Writing stops at the first buffer that is only partly accepted. An error
/// is only reported when nothing was written at all.
#[instrument(level = "trace", skip_all, fields(%fd, nwritten = field::Empty), ret)]
pub fn fd_write<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    iovs: WasmPtr,
    iovs_len: u32,
    nwritten: WasmPtr,
) -> Errno {
    let iovs = wasi_try_mem!(memory.read_iovecs(iovs as u64, iovs_len));
    wasi_try!(check_iovecs(memory, &iovs));

    let is_socket = env.is_socket(fd);
    let mut total = 0usize;
    for iov in iovs {
        let data = wasi_try_mem!(memory.read_vec(iov.buf as u64, iov.buf_len));
        let result = if is_socket {
            env.sockets.send(fd, &data).map_err(net_error_into_wasi_err)
        } else {
            env.fs.write(fd, &data).map_err(fs_error_into_wasi_err)
        };
        let written = match result {
            Ok(written) => written,
            Err(err) if total == 0 => return err,
            Err(err) => {
                debug!(%fd, %err, total, "write stopped early");
                break;
            }
        };
        total += written;
        if written < data.len() {
            break;
        }
    }

    Span::current().record("nwritten", total);
    wasi_try_mem!(memory.write_u32(nwritten as u64, total as u32));
    Errno::Success
}
