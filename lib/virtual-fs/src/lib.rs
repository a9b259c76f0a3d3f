use std::io;
use thiserror::Error;

pub mod host_fs;
pub mod mem_fs;

pub type Result<T> = std::result::Result<T, FsError>;

/// Longest single path component accepted by either backend.
pub const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptionsConfig {
    pub read: bool,
    pub write: bool,
    pub create_new: bool,
    pub create: bool,
    pub append: bool,
    pub truncate: bool,
}

impl OpenOptionsConfig {
    pub const fn read_only() -> Self {
        OpenOptionsConfig {
            read: true,
            write: false,
            create_new: false,
            create: false,
            append: false,
            truncate: false,
        }
    }

    /// Whether the handle may modify the file.
    pub const fn would_mutate(&self) -> bool {
        self.write || self.append || self.truncate || self.create || self.create_new
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileType {
    pub dir: bool,
    pub file: bool,
    pub symlink: bool,
    pub char_device: bool,
}

impl FileType {
    pub fn new_dir() -> Self {
        Self {
            dir: true,
            ..Default::default()
        }
    }

    pub fn new_file() -> Self {
        Self {
            file: true,
            ..Default::default()
        }
    }

    pub fn is_dir(&self) -> bool {
        self.dir
    }

    pub fn is_file(&self) -> bool {
        self.file
    }

    pub fn is_symlink(&self) -> bool {
        self.symlink
    }

    pub fn is_char_device(&self) -> bool {
        self.char_device
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    pub ino: u64,
    pub ft: FileType,
    pub accessed: u64,
    pub created: u64,
    pub modified: u64,
    pub len: u64,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        self.ft.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.ft.is_dir()
    }

    pub fn file_type(&self) -> FileType {
        self.ft
    }

    pub fn len(&self) -> u64 {
        self.len
    }
}

/// One row of a directory listing. `.` and `..` are included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub ino: u64,
    pub ft: FileType,
}

/// Error type for external users
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// The requested file or directory could not be found
    #[error("entry not found")]
    EntryNotFound,
    /// A path component that had to be a directory was something else
    #[error("not a directory")]
    NotADirectory,
    /// Expected a file but found a directory
    #[error("is a directory")]
    IsADirectory,
    /// File exists
    #[error("file exists")]
    AlreadyExists,
    /// The path could not be parsed
    #[error("invalid path")]
    InvalidPath,
    /// The provided data is invalid
    #[error("invalid input")]
    InvalidInput,
    /// The seek would move the cursor before the start of the file
    #[error("invalid seek")]
    InvalidSeek,
    /// The handle has no position, as for the standard streams
    #[error("not seekable")]
    NotSeekable,
    /// Caller was not allowed to perform this operation
    #[error("permission denied")]
    PermissionDenied,
    /// The fd given was not usable
    #[error("invalid fd")]
    InvalidFd,
    /// The handle was not opened with read access
    #[error("not open for reading")]
    NotOpenForReading,
    /// The handle was not opened with write access, or the file is read-only
    #[error("not open for writing")]
    NotOpenForWriting,
    /// The handle table is full
    #[error("too many open files")]
    TooManyOpenFiles,
    /// A path component is longer than [`MAX_NAME_LEN`]
    #[error("name too long")]
    NameTooLong,
    /// A write or resize would exceed the largest supported file
    #[error("storage full")]
    StorageFull,
    /// The directory still has children
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// Something failed when doing IO. These errors can generally not be handled.
    /// It may work if tried again.
    #[error("io error")]
    IOError,
}

impl From<io::Error> for FsError {
    fn from(io_error: io::Error) -> Self {
        #[cfg(unix)]
        if let Some(code) = io_error.raw_os_error() {
            match code {
                libc::ENOTDIR => return FsError::NotADirectory,
                libc::EISDIR => return FsError::IsADirectory,
                libc::ENOTEMPTY => return FsError::DirectoryNotEmpty,
                libc::ENAMETOOLONG => return FsError::NameTooLong,
                libc::ENOSPC => return FsError::StorageFull,
                libc::EMFILE | libc::ENFILE => return FsError::TooManyOpenFiles,
                libc::ESPIPE => return FsError::NotSeekable,
                libc::EBADF => return FsError::InvalidFd,
                _ => {}
            }
        }
        match io_error.kind() {
            io::ErrorKind::NotFound => FsError::EntryNotFound,
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
            io::ErrorKind::InvalidInput => FsError::InvalidInput,
            io::ErrorKind::InvalidData => FsError::InvalidInput,
            _ => FsError::IOError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_fs_errors() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(FsError::from(err), FsError::EntryNotFound);

        let err = io::Error::from(io::ErrorKind::AlreadyExists);
        assert_eq!(FsError::from(err), FsError::AlreadyExists);

        let err = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(FsError::from(err), FsError::IOError);
    }

    #[cfg(unix)]
    #[test]
    fn raw_os_errors_take_precedence() {
        let err = io::Error::from_raw_os_error(libc::ENOTEMPTY);
        assert_eq!(FsError::from(err), FsError::DirectoryNotEmpty);
    }
}
