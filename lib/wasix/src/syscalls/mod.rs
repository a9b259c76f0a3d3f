//! One function per guest import.
//!
//! Every entry point takes the session, a view of the guest's linear memory
//! and the raw ABI arguments, and returns the call's errno. Failures inside
//! the runtime are translated, never propagated: a guest can not make the
//! host panic.
//!
//! Handle-based calls route on the handle: socket handles go to the socket
//! table, everything else to [`WasiFs`](crate::WasiFs), which knows from the
//! handle's [`Backend`](crate::fs::Backend) whether the tree, a host
//! directory or a standard stream answers. Path-based calls additionally
//! honour the mount-prefix convention (see [`route_path`]).

pub mod wasi;
pub mod wasix;

pub use self::wasi::*;
pub use self::wasix::*;

pub(crate) use tracing::{debug, field, instrument, trace, Span};
pub(crate) use virtual_fs::{FsError, OpenOptionsConfig};
pub(crate) use virtual_net::NetworkError;
pub(crate) use wasmbox_wasi_types::{
    dirent_to_le_bytes, Dirent, Errno, Fd as WasiFd, Fdflags, Fdstat, Filestat, Filetype, Iovec,
    Oflags, Prestat, Rights, Whence, DIRENT_SIZE,
};

pub(crate) use crate::fs::{At, OpenRequest};
pub(crate) use crate::{mem_error_to_wasi, GuestMemory, WasiEnv, WasmPtr};

/// Rights reported for socket handles.
pub(crate) const SOCKET_RIGHTS: Rights = Rights::from_bits_truncate(
    Rights::FD_READ.bits()
        | Rights::FD_WRITE.bits()
        | Rights::FD_FILESTAT_GET.bits()
        | Rights::POLL_FD_READWRITE.bits()
        | Rights::SOCK_SHUTDOWN.bits()
        | Rights::SOCK_ACCEPT.bits(),
);

pub fn fs_error_into_wasi_err(fs_error: FsError) -> Errno {
    match fs_error {
        FsError::EntryNotFound => Errno::Noent,
        FsError::NotADirectory => Errno::Notdir,
        FsError::IsADirectory => Errno::Isdir,
        FsError::AlreadyExists => Errno::Exist,
        FsError::InvalidPath => Errno::Inval,
        FsError::InvalidInput => Errno::Inval,
        FsError::InvalidSeek => Errno::Inval,
        FsError::NotSeekable => Errno::Spipe,
        FsError::PermissionDenied => Errno::Perm,
        FsError::InvalidFd => Errno::Badf,
        FsError::NotOpenForReading => Errno::Badf,
        FsError::NotOpenForWriting => Errno::Badf,
        FsError::TooManyOpenFiles => Errno::Mfile,
        FsError::NameTooLong => Errno::Nametoolong,
        FsError::StorageFull => Errno::Nospc,
        FsError::DirectoryNotEmpty => Errno::Notempty,
        FsError::IOError => Errno::Io,
    }
}

pub fn net_error_into_wasi_err(net_error: NetworkError) -> Errno {
    match net_error {
        NetworkError::InvalidFd => Errno::Badf,
        NetworkError::InvalidState => Errno::Isconn,
        NetworkError::NotConnected => Errno::Notconn,
        NetworkError::AddressFamilyNotSupported => Errno::Afnosupport,
        NetworkError::ProtocolWrongType => Errno::Prototype,
        NetworkError::InvalidInput => Errno::Inval,
        NetworkError::ConnectionRefused => Errno::Connrefused,
        NetworkError::ConnectionReset => Errno::Connreset,
        NetworkError::ConnectionAborted => Errno::Connaborted,
        NetworkError::BrokenPipe => Errno::Pipe,
        NetworkError::HostNotFound => Errno::Hostunreach,
        NetworkError::HostUnreachable => Errno::Hostunreach,
        NetworkError::NetworkUnreachable => Errno::Netunreach,
        NetworkError::TimedOut => Errno::Timedout,
        NetworkError::AddressInUse => Errno::Addrinuse,
        NetworkError::AddressNotAvailable => Errno::Addrnotavail,
        NetworkError::Interrupted => Errno::Intr,
        NetworkError::TooManyOpenFiles => Errno::Mfile,
        NetworkError::Unsupported => Errno::Notsup,
        NetworkError::IOError => Errno::Io,
    }
}

/// Decides where a path-based call starts resolving.
///
/// A path naming the mount prefix directory or anything below it always
/// resolves as an absolute guest path, whatever handle came with it. With the prefix `/lib`, `/lib/os.py`, `lib/os.py` and `./lib/os.py`
/// all become `/lib/os.py`. Every other path starts at `dirfd`.
pub(crate) fn route_path(env: &WasiEnv, dirfd: WasiFd, path: &str) -> (At, String) {
    let prefix = env.mount_prefix();

    if path.starts_with('/') {
        if let Ok(normalized) = crate::fs::normalize_guest_path(path) {
            if crate::fs::strip_mount_point(&normalized, prefix).is_some() {
                return (At::VirtualRoot, normalized);
            }
        }
        return (At::Fd(dirfd), path.to_string());
    }

    let mut relative = path;
    while let Some(rest) = relative.strip_prefix("./") {
        relative = rest.trim_start_matches('/');
    }
    let token = prefix.trim_matches('/');
    let under_prefix = relative
        .strip_prefix(token)
        .map(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(false);
    if under_prefix {
        let absolute = format!("/{relative}");
        trace!(%path, %absolute, "path routed to the in-memory tree");
        return (At::VirtualRoot, absolute);
    }
    (At::Fd(dirfd), path.to_string())
}

/// Reads a guest path argument.
pub(crate) fn read_path<M: GuestMemory + ?Sized>(
    memory: &M,
    path: WasmPtr,
    path_len: u32,
) -> Result<String, Errno> {
    memory
        .read_utf8_string(path as u64, path_len)
        .map_err(mem_error_to_wasi)
}

/// Fails with `Fault` unless every buffer lies inside guest memory.
pub(crate) fn check_iovecs<M: GuestMemory + ?Sized>(memory: &M, iovs: &[Iovec]) -> Result<(), Errno> {
    for iov in iovs {
        let end = iov.buf as u64 + iov.buf_len as u64;
        if end > memory.size() {
            return Err(Errno::Fault);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_routing_convention() {
        let env = WasiEnv::builder().build().unwrap();

        assert_eq!(
            route_path(&env, 9, "/lib/python/os.py"),
            (At::VirtualRoot, "/lib/python/os.py".to_string())
        );
        assert_eq!(
            route_path(&env, 9, "/lib"),
            (At::VirtualRoot, "/lib".to_string())
        );
        assert_eq!(
            route_path(&env, 9, "lib/os.py"),
            (At::VirtualRoot, "/lib/os.py".to_string())
        );
        assert_eq!(
            route_path(&env, 9, "./lib/os.py"),
            (At::VirtualRoot, "/lib/os.py".to_string())
        );
        assert_eq!(
            route_path(&env, 9, "library/x"),
            (At::Fd(9), "library/x".to_string())
        );
        assert_eq!(
            route_path(&env, 9, "/library"),
            (At::Fd(9), "/library".to_string())
        );
        assert_eq!(route_path(&env, 9, "data"), (At::Fd(9), "data".to_string()));
    }

    #[test]
    fn error_mapping_spot_checks() {
        assert_eq!(fs_error_into_wasi_err(FsError::StorageFull), Errno::Nospc);
        assert_eq!(fs_error_into_wasi_err(FsError::NotOpenForWriting), Errno::Badf);
        assert_eq!(fs_error_into_wasi_err(FsError::NotSeekable), Errno::Spipe);
        assert_eq!(net_error_into_wasi_err(NetworkError::InvalidState), Errno::Isconn);
        assert_eq!(net_error_into_wasi_err(NetworkError::HostNotFound), Errno::Hostunreach);
        assert_eq!(net_error_into_wasi_err(NetworkError::Unsupported), Errno::Notsup);
    }
}
