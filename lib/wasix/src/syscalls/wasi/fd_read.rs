use super::*;
use crate::syscalls::*;

/// ### `fd_read()`
/// Read data from file descriptor
/// Inputs:
/// - `Fd fd`
///     File descriptor from which data will be read
/// - `const __wasi_iovec_t *iovs`
///     Vectors where data will be stored
/// - `u32 iovs_len`
///     Length of data in `iovs`
/// Output:
/// - `u32 *nread`
///     Number of bytes read
///
/// Buffers are filled in order and reading stops at the first short one.
/// An error is only reported when nothing was read at all.
#[instrument(level = "trace", skip_all, fields(%fd, nread = field::Empty), ret)]
pub fn fd_read<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    iovs: WasmPtr,
    iovs_len: u32,
    nread: WasmPtr,
) -> Errno {
    let iovs = wasi_try_mem!(memory.read_iovecs(iovs as u64, iovs_len));
    wasi_try!(check_iovecs(memory, &iovs));

    let is_socket = env.is_socket(fd);
    let mut total = 0usize;
    for iov in iovs {
        let mut buf = vec![0u8; iov.buf_len as usize];
        let result = if is_socket {
            env.sockets
                .recv(fd, &mut buf)
                .map_err(net_error_into_wasi_err)
        } else {
            env.fs.read(fd, &mut buf).map_err(fs_error_into_wasi_err)
        };
        let read = match result {
            Ok(read) => read,
            Err(err) if total == 0 => return err,
            Err(err) => {
                debug!(%fd, %err, total, "read stopped early");
                break;
            }
        };
        wasi_try_mem!(memory.write(iov.buf as u64, &buf[..read]));
        total += read;
        if read < buf.len() {
            break;
        }
    }

    Span::current().record("nread", total);
    wasi_try_mem!(memory.write_u32(nread as u64, total as u32));
    Errno::Success
}
