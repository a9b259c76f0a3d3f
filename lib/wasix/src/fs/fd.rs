use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;

use tracing::trace;
use virtual_fs::host_fs::HostDir;
use virtual_fs::mem_fs::NodeId;
use virtual_fs::{DirEntry, FsError};
use wasmbox_wasi_types::{Fd as WasiFd, Fdflags, Filetype, Rights};

use super::stdio::Stdio;

/// Which implementation answers calls made on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Virtual,
    Passthrough,
    Stdio,
}

/// What a handle refers to. Handles never own tree nodes; a node removed
/// while a handle still refers to it makes that handle report `EntryNotFound`.
#[derive(Debug)]
pub enum Kind {
    Stdio(Stdio),
    File {
        node: NodeId,
    },
    Dir {
        node: NodeId,
    },
    /// A guest-visible root of the in-memory tree.
    Mount {
        node: NodeId,
    },
    HostFile {
        file: File,
    },
    HostDir {
        root: Arc<HostDir>,
        /// Path below `root`.
        rel: String,
    },
    /// A guest-visible root backed by a real directory.
    HostMount {
        root: Arc<HostDir>,
    },
}

impl Kind {
    pub fn backend(&self) -> Backend {
        match self {
            Kind::Stdio(_) => Backend::Stdio,
            Kind::File { .. } | Kind::Dir { .. } | Kind::Mount { .. } => Backend::Virtual,
            Kind::HostFile { .. } | Kind::HostDir { .. } | Kind::HostMount { .. } => {
                Backend::Passthrough
            }
        }
    }

    pub fn filetype(&self) -> Filetype {
        match self {
            Kind::Stdio(_) => Filetype::CharacterDevice,
            Kind::File { .. } | Kind::HostFile { .. } => Filetype::RegularFile,
            Kind::Dir { .. } | Kind::Mount { .. } | Kind::HostDir { .. } | Kind::HostMount { .. } => {
                Filetype::Directory
            }
        }
    }

    pub fn is_dir(&self) -> bool {
        self.filetype() == Filetype::Directory
    }

    pub fn is_mount(&self) -> bool {
        matches!(self, Kind::Mount { .. } | Kind::HostMount { .. })
    }
}

#[derive(Debug)]
pub struct Fd {
    pub kind: Kind,
    pub rights: Rights,
    pub rights_inheriting: Rights,
    pub flags: Fdflags,
    /// Flags that determine how the [`Fd`] can be used.
    pub open_flags: u16,
    /// Private to this handle: two handles on one file move independently.
    pub offset: u64,
    /// The guest path this handle was opened with. For mounts, the mount
    /// point the guest sees.
    pub path: Option<String>,
    /// Listing captured when iteration last started at cookie 0, so that
    /// resumed reads page through a stable view.
    pub dir_snapshot: Option<Vec<DirEntry>>,
}

impl Fd {
    /// This [`Fd`] can be used with read system calls.
    pub const READ: u16 = 1;
    /// This [`Fd`] can be used with write system calls.
    pub const WRITE: u16 = 2;
    /// This [`Fd`] can append in write system calls. Note that the append
    /// permission implies the write permission.
    pub const APPEND: u16 = 4;
    /// This [`Fd`] truncated the file when it was opened.
    pub const TRUNCATE: u16 = 8;
    /// This [`Fd`] was allowed to create the file it refers to.
    pub const CREATE: u16 = 16;

    pub fn new(kind: Kind, rights: Rights, open_flags: u16, path: Option<String>) -> Self {
        Fd {
            kind,
            rights,
            rights_inheriting: Rights::empty(),
            flags: Fdflags::empty(),
            open_flags,
            offset: 0,
            path,
            dir_snapshot: None,
        }
    }

    pub fn stdio(stream: Stdio) -> Self {
        let open_flags = match stream {
            Stdio::Stdin(_) => Fd::READ,
            Stdio::Stdout(_) | Stdio::Stderr(_) => Fd::WRITE | Fd::APPEND,
        };
        let mut fd = Fd::new(Kind::Stdio(stream), Rights::STDIO, open_flags, None);
        if open_flags & Fd::APPEND != 0 {
            fd.flags = Fdflags::APPEND;
        }
        fd
    }

    pub fn backend(&self) -> Backend {
        self.kind.backend()
    }

    pub fn is_readable(&self) -> bool {
        self.open_flags & Fd::READ != 0
    }

    pub fn is_writable(&self) -> bool {
        self.open_flags & (Fd::WRITE | Fd::APPEND) != 0
    }

    pub fn is_append(&self) -> bool {
        self.open_flags & Fd::APPEND != 0
    }
}

/// The flat handle namespace shared by every kind of open resource.
///
/// 0, 1 and 2 are the standard streams. Everything else is numbered from 3
/// upwards and numbers are never reused. All handles stay below `limit`,
/// where the socket range begins.
#[derive(Debug)]
pub struct FdTable {
    fds: BTreeMap<WasiFd, Fd>,
    next: WasiFd,
    max_open: usize,
    limit: WasiFd,
}

impl FdTable {
    pub fn new(max_open: usize, limit: WasiFd) -> Self {
        FdTable {
            fds: BTreeMap::new(),
            next: crate::config::FIRST_FREE_FD,
            max_open,
            limit,
        }
    }

    /// Places a standard stream at its reserved number.
    pub fn insert_stdio(&mut self, raw: WasiFd, stream: Stdio) {
        self.fds.insert(raw, Fd::stdio(stream));
    }

    fn open_count(&self) -> usize {
        self.fds
            .iter()
            .filter(|(_, fd)| fd.backend() != Backend::Stdio)
            .count()
    }

    pub fn insert(&mut self, fd: Fd) -> Result<WasiFd, FsError> {
        if self.open_count() >= self.max_open || self.next >= self.limit {
            return Err(FsError::TooManyOpenFiles);
        }
        let raw = self.next;
        self.next += 1;
        trace!(fd = raw, backend = ?fd.backend(), path = ?fd.path, "handle opened");
        self.fds.insert(raw, fd);
        Ok(raw)
    }

    pub fn get(&self, raw: WasiFd) -> Result<&Fd, FsError> {
        self.fds.get(&raw).ok_or(FsError::InvalidFd)
    }

    pub fn get_mut(&mut self, raw: WasiFd) -> Result<&mut Fd, FsError> {
        self.fds.get_mut(&raw).ok_or(FsError::InvalidFd)
    }

    pub fn remove(&mut self, raw: WasiFd) -> Result<Fd, FsError> {
        let fd = self.fds.remove(&raw).ok_or(FsError::InvalidFd)?;
        trace!(fd = raw, "handle closed");
        Ok(fd)
    }

    pub fn contains(&self, raw: WasiFd) -> bool {
        self.fds.contains_key(&raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WasiFd, &Fd)> {
        self.fds.iter().map(|(raw, fd)| (*raw, fd))
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use virtual_fs::mem_fs::FileSystem;

    fn table(max_open: usize, limit: WasiFd) -> FdTable {
        let mut table = FdTable::new(max_open, limit);
        table.insert_stdio(0, Stdio::Stdin(Box::new(io::empty())));
        table.insert_stdio(1, Stdio::Stdout(Box::new(io::sink())));
        table.insert_stdio(2, Stdio::Stderr(Box::new(io::sink())));
        table
    }

    fn dir_fd(fs: &FileSystem) -> Fd {
        Fd::new(Kind::Dir { node: fs.root() }, Rights::DIRECTORY, Fd::READ, None)
    }

    #[test]
    fn numbering_starts_after_stdio_and_is_monotonic() {
        let fs = FileSystem::new();
        let mut table = table(8, 100);

        let a = table.insert(dir_fd(&fs)).unwrap();
        let b = table.insert(dir_fd(&fs)).unwrap();
        assert_eq!((a, b), (3, 4));

        table.remove(a).unwrap();
        let c = table.insert(dir_fd(&fs)).unwrap();
        assert_eq!(c, 5);
        assert_eq!(table.get(a).unwrap_err(), FsError::InvalidFd);
        assert_eq!(table.get(1).unwrap().backend(), Backend::Stdio);
    }

    #[test]
    fn table_full_is_an_error() {
        let fs = FileSystem::new();
        let mut table = table(2, 100);

        table.insert(dir_fd(&fs)).unwrap();
        table.insert(dir_fd(&fs)).unwrap();
        assert_eq!(table.insert(dir_fd(&fs)), Err(FsError::TooManyOpenFiles));

        let mut table = self::table(10, 4);
        table.insert(dir_fd(&fs)).unwrap();
        assert_eq!(table.insert(dir_fd(&fs)), Err(FsError::TooManyOpenFiles));
    }

    #[test]
    fn stdio_modes() {
        let table = table(1, 10);
        assert!(table.get(0).unwrap().is_readable());
        assert!(!table.get(0).unwrap().is_writable());
        assert!(table.get(2).unwrap().is_writable());
        assert_eq!(table.get(2).unwrap().kind.filetype(), Filetype::CharacterDevice);
    }
}
