use num_enum::{IntoPrimitive, TryFromPrimitive};

pub type Fd = u32;
pub type Filesize = u64;
pub type Filedelta = i64;
pub type Timestamp = u64;
pub type Inode = u64;
pub type Device = u64;
pub type Linkcount = u64;
pub type Dircookie = u64;

pub const __WASI_STDIN_FILENO: Fd = 0;
pub const __WASI_STDOUT_FILENO: Fd = 1;
pub const __WASI_STDERR_FILENO: Fd = 2;

pub const __WASI_DIRCOOKIE_START: Dircookie = 0;

/// The type of a file descriptor or file.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Filetype {
    Unknown = 0,
    BlockDevice,
    CharacterDevice,
    Directory,
    RegularFile,
    SocketDgram,
    SocketStream,
    SymbolicLink,
}

/// The position relative to which to set the offset of the file descriptor.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Whence {
    Set = 0,
    Cur,
    End,
}

/// Tag of the `prestat` union. Only directories are ever pre-opened.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Preopentype {
    Dir = 0,
}

bitflags::bitflags! {
    /// Open flags used by `path_open`.
    #[derive(Default)]
    pub struct Oflags: u16 {
        const CREATE = 1 << 0;
        const DIRECTORY = 1 << 1;
        const EXCL = 1 << 2;
        const TRUNC = 1 << 3;
    }
}

bitflags::bitflags! {
    /// File descriptor flags.
    #[derive(Default)]
    pub struct Fdflags: u16 {
        const APPEND = 1 << 0;
        const DSYNC = 1 << 1;
        const NONBLOCK = 1 << 2;
        const RSYNC = 1 << 3;
        const SYNC = 1 << 4;
    }
}

bitflags::bitflags! {
    /// File descriptor rights, determining which actions may be performed.
    #[derive(Default)]
    pub struct Rights: u64 {
        const FD_DATASYNC = 1 << 0;
        const FD_READ = 1 << 1;
        const FD_SEEK = 1 << 2;
        const FD_FDSTAT_SET_FLAGS = 1 << 3;
        const FD_SYNC = 1 << 4;
        const FD_TELL = 1 << 5;
        const FD_WRITE = 1 << 6;
        const FD_ADVISE = 1 << 7;
        const FD_ALLOCATE = 1 << 8;
        const PATH_CREATE_DIRECTORY = 1 << 9;
        const PATH_CREATE_FILE = 1 << 10;
        const PATH_LINK_SOURCE = 1 << 11;
        const PATH_LINK_TARGET = 1 << 12;
        const PATH_OPEN = 1 << 13;
        const FD_READDIR = 1 << 14;
        const PATH_READLINK = 1 << 15;
        const PATH_RENAME_SOURCE = 1 << 16;
        const PATH_RENAME_TARGET = 1 << 17;
        const PATH_FILESTAT_GET = 1 << 18;
        const PATH_FILESTAT_SET_SIZE = 1 << 19;
        const PATH_FILESTAT_SET_TIMES = 1 << 20;
        const FD_FILESTAT_GET = 1 << 21;
        const FD_FILESTAT_SET_SIZE = 1 << 22;
        const FD_FILESTAT_SET_TIMES = 1 << 23;
        const PATH_SYMLINK = 1 << 24;
        const PATH_REMOVE_DIRECTORY = 1 << 25;
        const PATH_UNLINK_FILE = 1 << 26;
        const POLL_FD_READWRITE = 1 << 27;
        const SOCK_SHUTDOWN = 1 << 28;
        const SOCK_ACCEPT = 1 << 29;
    }
}

impl Rights {
    /// Rights granted to a regular file opened for reading.
    pub const FILE_READ: Rights = Rights::from_bits_truncate(
        Rights::FD_READ.bits()
            | Rights::FD_SEEK.bits()
            | Rights::FD_TELL.bits()
            | Rights::FD_FILESTAT_GET.bits()
            | Rights::POLL_FD_READWRITE.bits(),
    );

    /// Rights granted to a regular file opened for writing.
    pub const FILE_WRITE: Rights = Rights::from_bits_truncate(
        Rights::FD_WRITE.bits()
            | Rights::FD_SEEK.bits()
            | Rights::FD_TELL.bits()
            | Rights::FD_DATASYNC.bits()
            | Rights::FD_SYNC.bits()
            | Rights::FD_ALLOCATE.bits()
            | Rights::FD_FILESTAT_GET.bits()
            | Rights::FD_FILESTAT_SET_SIZE.bits()
            | Rights::POLL_FD_READWRITE.bits(),
    );

    /// Rights granted to a directory handle, including mount roots.
    pub const DIRECTORY: Rights = Rights::from_bits_truncate(
        Rights::PATH_CREATE_DIRECTORY.bits()
            | Rights::PATH_CREATE_FILE.bits()
            | Rights::PATH_OPEN.bits()
            | Rights::FD_READDIR.bits()
            | Rights::PATH_READLINK.bits()
            | Rights::PATH_FILESTAT_GET.bits()
            | Rights::PATH_FILESTAT_SET_SIZE.bits()
            | Rights::FD_FILESTAT_GET.bits()
            | Rights::PATH_REMOVE_DIRECTORY.bits()
            | Rights::PATH_UNLINK_FILE.bits(),
    );

    /// Rights granted to the standard streams.
    pub const STDIO: Rights = Rights::from_bits_truncate(
        Rights::FD_READ.bits()
            | Rights::FD_WRITE.bits()
            | Rights::FD_FILESTAT_GET.bits()
            | Rights::POLL_FD_READWRITE.bits(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits_match_abi() {
        assert_eq!(Oflags::TRUNC.bits(), 8);
        assert_eq!(Fdflags::SYNC.bits(), 16);
        assert_eq!(Rights::PATH_OPEN.bits(), 1 << 13);
        assert_eq!(Rights::SOCK_ACCEPT.bits(), 1 << 29);
        assert!(Oflags::from_bits(1 << 4).is_none());
    }

    #[test]
    fn filetype_from_raw() {
        assert_eq!(Filetype::try_from(3u8).ok(), Some(Filetype::Directory));
        assert_eq!(u8::from(Filetype::SocketStream), 6);
        assert!(Whence::try_from(3u8).is_err());
    }

    #[test]
    fn directory_rights_do_not_include_io() {
        assert!(!Rights::DIRECTORY.contains(Rights::FD_READ));
        assert!(Rights::DIRECTORY.contains(Rights::FD_READDIR));
        assert!(Rights::FILE_WRITE.contains(Rights::FD_FILESTAT_SET_SIZE));
    }
}
