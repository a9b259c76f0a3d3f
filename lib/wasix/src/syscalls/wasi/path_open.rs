use super::*;
use crate::syscalls::*;

/// ### `path_open()`
/// Open file located at the given path
/// Inputs:
/// - `Fd dirfd`
///     The fd corresponding to the directory that the file is in
/// - `LookupFlags dirflags`
///     Flags specifying how the path will be resolved
/// - `char *path`
///     The path of the file or directory to open
/// - `u32 path_len`
///     The length of the `path` string
/// - `Oflags o_flags`
///     How the file will be opened
/// - `Rights fs_rights_base`
///     The rights of the created file descriptor
/// - `Rights fs_rightsinheriting`
///     The rights of file descriptors derived from the created file descriptor
/// - `Fdflags fs_flags`
///     The flags of the file descriptor
/// Output:
/// - `Fd* fd`
///     The new file descriptor
#[allow(clippy::too_many_arguments)]
#[instrument(level = "debug", skip_all, fields(%dirfd, path = field::Empty, follow_symlinks = field::Empty, ret_fd = field::Empty), ret)]
pub fn path_open<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    dirfd: WasiFd,
    dirflags: u32,
    path: WasmPtr,
    path_len: u32,
    o_flags: u16,
    fs_rights_base: u64,
    fs_rights_inheriting: u64,
    fs_flags: u16,
    fd: WasmPtr,
) -> Errno {
    Span::current().record("follow_symlinks", dirflags & 1 != 0);
    let path_string = wasi_try!(read_path(memory, path, path_len));
    Span::current().record("path", path_string.as_str());

    let Some(o_flags) = Oflags::from_bits(o_flags) else {
        return Errno::Inval;
    };
    let Some(fs_flags) = Fdflags::from_bits(fs_flags) else {
        return Errno::Inval;
    };
    if path_string.is_empty() {
        return Errno::Noent;
    }

    let req = open_request(
        o_flags,
        Rights::from_bits_truncate(fs_rights_base),
        Rights::from_bits_truncate(fs_rights_inheriting),
        fs_flags,
    );
    let (at, path_string) = route_path(env, dirfd, &path_string);
    let out_fd = wasi_try_fs!(env.fs.open(at, &path_string, req));
    Span::current().record("ret_fd", out_fd);

    if let Err(err) = memory.write_u32(fd as u64, out_fd) {
        let _ = env.fs.close(out_fd);
        return mem_error_to_wasi(err);
    }
    Errno::Success
}

/// Translates the raw open arguments. A handle without write rights is
/// always readable.
fn open_request(o_flags: Oflags, rights: Rights, inheriting: Rights, fdflags: Fdflags) -> OpenRequest {
    let write = rights.contains(Rights::FD_WRITE);
    let read = rights.contains(Rights::FD_READ) || !write;
    let append = fdflags.contains(Fdflags::APPEND);
    let create = o_flags.contains(Oflags::CREATE);

    OpenRequest {
        conf: OpenOptionsConfig {
            read,
            write: write || append,
            create_new: create && o_flags.contains(Oflags::EXCL),
            create,
            append,
            truncate: o_flags.contains(Oflags::TRUNC),
        },
        directory: o_flags.contains(Oflags::DIRECTORY),
        rights,
        rights_inheriting: inheriting,
        fdflags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_when_no_write_right() {
        let req = open_request(Oflags::empty(), Rights::empty(), Rights::empty(), Fdflags::empty());
        assert!(req.conf.read);
        assert!(!req.conf.write);
        assert!(!req.conf.would_mutate());
    }

    #[test]
    fn exclusive_create() {
        let req = open_request(
            Oflags::CREATE | Oflags::EXCL | Oflags::TRUNC,
            Rights::FD_WRITE,
            Rights::empty(),
            Fdflags::APPEND,
        );
        assert!(!req.conf.read);
        assert!(req.conf.write);
        assert!(req.conf.create);
        assert!(req.conf.create_new);
        assert!(req.conf.truncate);
        assert!(req.conf.append);
        assert!(!req.directory);
    }
}
