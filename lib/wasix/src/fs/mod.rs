//! The session's filesystem: the in-memory tree, any passthrough mounts of
//! real directories, and the table of open handles on top of both.

mod fd;
mod stdio;

pub use fd::{Backend, Fd, FdTable, Kind};
pub use stdio::{CaptureBuffer, Stdio};

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use virtual_fs::host_fs::{metadata_from_host, HostDir};
use virtual_fs::mem_fs::{FileSystem, NodeId};
use virtual_fs::{DirEntry, FileType, FsError, Metadata, OpenOptionsConfig};
use wasmbox_wasi_types::{
    Fd as WasiFd, Fdflags, Fdstat, Filestat, Filetype, Rights, Whence, __WASI_STDERR_FILENO,
    __WASI_STDIN_FILENO, __WASI_STDOUT_FILENO,
};

pub type Result<T> = std::result::Result<T, FsError>;

/// Where a path-based operation starts resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum At {
    /// Relative paths start at the directory behind this handle. Absolute
    /// paths start at the covering passthrough mount, or the tree root.
    Fd(WasiFd),
    /// The path is absolute and ignores any handle. A passthrough mount
    /// below the prefix still wins over the in-memory tree.
    VirtualRoot,
}

impl From<WasiFd> for At {
    fn from(fd: WasiFd) -> Self {
        At::Fd(fd)
    }
}

/// Everything `open` needs besides the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRequest {
    pub conf: OpenOptionsConfig,
    /// The caller insists on a directory.
    pub directory: bool,
    pub rights: Rights,
    pub rights_inheriting: Rights,
    pub fdflags: Fdflags,
}

impl OpenRequest {
    pub fn read() -> Self {
        OpenRequest {
            conf: OpenOptionsConfig::read_only(),
            rights: Rights::FILE_READ | Rights::DIRECTORY,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct Mount {
    guest_path: String,
    fd: WasiFd,
    host: Option<Arc<HostDir>>,
}

enum Location {
    Virtual { start: NodeId, path: String },
    Host { root: Arc<HostDir>, rel: String },
}

/// The filesystem half of a guest session.
#[derive(Debug)]
pub struct WasiFs {
    tree: FileSystem,
    fds: FdTable,
    mounts: Vec<Mount>,
}

impl WasiFs {
    /// An empty tree with the host's standard streams on 0, 1 and 2.
    ///
    /// At most `max_open` handles may be open at once, and every handle
    /// number stays below `fd_limit`.
    pub fn new(max_open: usize, fd_limit: WasiFd) -> Self {
        let mut fds = FdTable::new(max_open, fd_limit);
        fds.insert_stdio(__WASI_STDIN_FILENO, Stdio::inherit_stdin());
        fds.insert_stdio(__WASI_STDOUT_FILENO, Stdio::inherit_stdout());
        fds.insert_stdio(__WASI_STDERR_FILENO, Stdio::inherit_stderr());
        WasiFs {
            tree: FileSystem::new(),
            fds,
            mounts: Vec::new(),
        }
    }

    /// Caps the size of in-memory files created from now on.
    pub fn set_max_file_size(&mut self, limit: u64) {
        self.tree.set_max_file_size(limit);
    }

    pub fn tree(&self) -> &FileSystem {
        &self.tree
    }

    pub fn fd_table(&self) -> &FdTable {
        &self.fds
    }

    pub fn get_fd(&self, fd: WasiFd) -> Result<&Fd> {
        self.fds.get(fd)
    }

    pub fn backend(&self, fd: WasiFd) -> Result<Backend> {
        Ok(self.fds.get(fd)?.backend())
    }

    pub fn set_stdin(&mut self, reader: Box<dyn Read + Send>) {
        self.fds.insert_stdio(__WASI_STDIN_FILENO, Stdio::Stdin(reader));
    }

    pub fn set_stdout(&mut self, writer: Box<dyn Write + Send>) {
        self.fds.insert_stdio(__WASI_STDOUT_FILENO, Stdio::Stdout(writer));
    }

    pub fn set_stderr(&mut self, writer: Box<dyn Write + Send>) {
        self.fds.insert_stdio(__WASI_STDERR_FILENO, Stdio::Stderr(writer));
    }

    /// Exposes the tree directory at `guest_path` (created if missing) as a
    /// pre-opened directory and returns its handle.
    pub fn add_virtual_mount(&mut self, guest_path: &str) -> Result<WasiFd> {
        let guest_path = normalize_guest_path(guest_path)?;
        let node = self.tree.mkdirp(&guest_path)?;
        let fd = self.insert_mount(Kind::Mount { node }, &guest_path)?;
        self.mounts.push(Mount {
            guest_path: guest_path.clone(),
            fd,
            host: None,
        });
        debug!(%fd, guest_path = %guest_path, "virtual mount added");
        Ok(fd)
    }

    /// Exposes the real directory `host_path` at `guest_path`. Paths below the
    /// mount point are served from the host from then on.
    pub fn add_passthrough_mount(&mut self, guest_path: &str, host_path: &Path) -> Result<WasiFd> {
        let guest_path = normalize_guest_path(guest_path)?;
        let root = Arc::new(HostDir::new(host_path)?);
        // Keeps the mount point visible in listings of its parent.
        self.tree.mkdirp(&guest_path)?;
        let fd = self.insert_mount(
            Kind::HostMount {
                root: Arc::clone(&root),
            },
            &guest_path,
        )?;
        self.mounts.push(Mount {
            guest_path: guest_path.clone(),
            fd,
            host: Some(root),
        });
        debug!(%fd, guest_path = %guest_path, host_path = %host_path.display(), "passthrough mount added");
        Ok(fd)
    }

    fn insert_mount(&mut self, kind: Kind, guest_path: &str) -> Result<WasiFd> {
        let mut fd = Fd::new(kind, Rights::DIRECTORY, Fd::READ, Some(guest_path.to_string()));
        fd.rights_inheriting = Rights::all();
        self.fds.insert(fd)
    }

    /// Guest mount points with their handles, in registration order.
    pub fn mounts(&self) -> impl Iterator<Item = (&str, WasiFd)> {
        self.mounts.iter().map(|m| (m.guest_path.as_str(), m.fd))
    }

    fn locate(&self, at: At, path: &str) -> Result<Location> {
        let dirfd = match at {
            At::VirtualRoot => return self.locate_absolute(path),
            At::Fd(_) if path.starts_with('/') => return self.locate_absolute(path),
            At::Fd(dirfd) => dirfd,
        };

        match &self.fds.get(dirfd)?.kind {
            Kind::Dir { node } | Kind::Mount { node } => Ok(Location::Virtual {
                start: *node,
                path: path.to_string(),
            }),
            Kind::HostDir { root, rel } => Ok(Location::Host {
                root: Arc::clone(root),
                rel: format!("{rel}/{path}"),
            }),
            Kind::HostMount { root } => Ok(Location::Host {
                root: Arc::clone(root),
                rel: path.to_string(),
            }),
            Kind::File { .. } | Kind::HostFile { .. } | Kind::Stdio(_) => {
                Err(FsError::NotADirectory)
            }
        }
    }

    fn locate_absolute(&self, path: &str) -> Result<Location> {
        let normalized = normalize_guest_path(path)?;
        let covering = self
            .mounts
            .iter()
            .filter_map(|m| {
                let root = m.host.as_ref()?;
                let rest = strip_mount_point(&normalized, &m.guest_path)?;
                Some((m.guest_path.len(), root, rest))
            })
            .max_by_key(|(len, _, _)| *len);

        match covering {
            Some((_, root, rest)) => Ok(Location::Host {
                root: Arc::clone(root),
                rel: rest.to_string(),
            }),
            None => Ok(Location::Virtual {
                start: self.tree.root(),
                path: path.to_string(),
            }),
        }
    }

    /// Opens `path` and returns the new handle.
    pub fn open(&mut self, at: At, path: &str, req: OpenRequest) -> Result<WasiFd> {
        let conf = req.conf;
        let mutating = conf.write || conf.append || conf.truncate;
        let creating = conf.create || conf.create_new;

        let kind = match self.locate(at, path)? {
            Location::Virtual { start, path } => {
                let resolved = self.tree.resolve(start, &path)?;
                let existing = match &resolved.leaf {
                    None => Some(resolved.parent),
                    Some(name) => self.tree.child(resolved.parent, name)?,
                };
                match (existing, resolved.leaf) {
                    (Some(_), _) if conf.create_new => return Err(FsError::AlreadyExists),
                    (Some(node), _) if self.tree.is_dir(node)? => {
                        if mutating {
                            return Err(FsError::IsADirectory);
                        }
                        Kind::Dir { node }
                    }
                    (Some(_), _) if req.directory => return Err(FsError::NotADirectory),
                    (Some(node), _) => {
                        if conf.truncate {
                            self.tree.set_len(node, 0)?;
                        }
                        Kind::File { node }
                    }
                    (None, _) if !creating => return Err(FsError::EntryNotFound),
                    (None, _) if req.directory => return Err(FsError::InvalidInput),
                    (None, Some(name)) => Kind::File {
                        node: self.tree.create_file(resolved.parent, &name)?,
                    },
                    (None, None) => return Err(FsError::InvalidPath),
                }
            }
            Location::Host { root, rel } => {
                let rel = host_rel(&rel)?;
                match root.metadata(&rel) {
                    Ok(meta) if meta.is_dir() => {
                        if conf.create_new {
                            return Err(FsError::AlreadyExists);
                        }
                        if mutating {
                            return Err(FsError::IsADirectory);
                        }
                        Kind::HostDir { root, rel }
                    }
                    Ok(_) if req.directory => return Err(FsError::NotADirectory),
                    Err(FsError::EntryNotFound) if req.directory && creating => {
                        return Err(FsError::InvalidInput)
                    }
                    _ => Kind::HostFile {
                        file: root.open(&rel, &conf)?,
                    },
                }
            }
        };

        let mode = if kind.is_dir() {
            Fd::READ
        } else {
            open_mode(&conf)
        };
        let mut fd = Fd::new(kind, req.rights, mode, Some(path.to_string()));
        fd.rights_inheriting = req.rights_inheriting;
        fd.flags = req.fdflags;
        if conf.append {
            fd.flags |= Fdflags::APPEND;
        }
        self.fds.insert(fd)
    }

    pub fn mkdir(&mut self, at: At, path: &str) -> Result<()> {
        match self.locate(at, path)? {
            Location::Virtual { start, path } => {
                let resolved = self.tree.resolve(start, &path)?;
                let name = resolved.leaf.ok_or(FsError::AlreadyExists)?;
                self.tree.create_dir(resolved.parent, &name)?;
                Ok(())
            }
            Location::Host { root, rel } => root.create_dir(&rel),
        }
    }

    /// Creates every missing directory along the absolute tree path `path`.
    pub fn mkdirp(&mut self, path: &str) -> Result<()> {
        self.tree.mkdirp(path).map(|_| ())
    }

    /// Writes a whole file into the tree, creating its parent directories.
    pub fn create_with_content(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.tree.create_with_content(path, data).map(|_| ())
    }

    pub fn stat(&self, at: At, path: &str) -> Result<Filestat> {
        let meta = match self.locate(at, path)? {
            Location::Virtual { start, path } => {
                let node = self.tree.lookup(start, &path)?;
                self.tree.metadata(node)?
            }
            Location::Host { root, rel } => root.metadata(&rel)?,
        };
        Ok(filestat_from(&meta))
    }

    /// Removes a file. Directories are refused.
    pub fn unlink(&mut self, at: At, path: &str) -> Result<()> {
        match self.locate(at, path)? {
            Location::Virtual { start, path } => {
                let resolved = self.tree.resolve(start, &path)?;
                let name = resolved.leaf.ok_or(FsError::IsADirectory)?;
                self.tree.unlink(resolved.parent, &name)
            }
            Location::Host { root, rel } => root.remove_file(&rel),
        }
    }

    /// Removes an empty directory.
    pub fn remove_dir(&mut self, at: At, path: &str) -> Result<()> {
        match self.locate(at, path)? {
            Location::Virtual { start, path } => {
                let resolved = self.tree.resolve(start, &path)?;
                let name = resolved.leaf.ok_or(FsError::InvalidInput)?;
                self.refuse_mount_point(resolved.parent, &name)?;
                self.tree.rmdir(resolved.parent, &name)
            }
            Location::Host { root, rel } => root.remove_dir(&rel),
        }
    }

    /// Removes a file or a whole directory subtree from the in-memory tree.
    pub fn remove(&mut self, at: At, path: &str) -> Result<()> {
        match self.locate(at, path)? {
            Location::Virtual { start, path } => {
                let resolved = self.tree.resolve(start, &path)?;
                let name = resolved.leaf.ok_or(FsError::InvalidInput)?;
                self.refuse_mount_point(resolved.parent, &name)?;
                self.tree.remove(resolved.parent, &name)
            }
            Location::Host { .. } => Err(FsError::PermissionDenied),
        }
    }

    fn refuse_mount_point(&self, parent: NodeId, name: &str) -> Result<()> {
        let Some(node) = self.tree.child(parent, name)? else {
            return Ok(());
        };
        let mounted = self
            .fds
            .iter()
            .any(|(_, fd)| matches!(fd.kind, Kind::Mount { node: n } if n == node));
        if mounted {
            return Err(FsError::PermissionDenied);
        }
        Ok(())
    }

    /// The full listing behind a directory handle, `.` and `..` first.
    pub fn readdir(&self, fd: WasiFd) -> Result<Vec<DirEntry>> {
        match &self.fds.get(fd)?.kind {
            Kind::Dir { node } | Kind::Mount { node } => self.tree.list(*node),
            Kind::HostDir { root, rel } => root.read_dir(rel),
            Kind::HostMount { root } => root.read_dir(""),
            Kind::File { .. } | Kind::HostFile { .. } | Kind::Stdio(_) => {
                Err(FsError::NotADirectory)
            }
        }
    }

    /// The entries from position `cookie` onwards. Listing from cookie 0
    /// takes a fresh snapshot; later cookies page through that snapshot.
    pub fn readdir_from(&mut self, fd: WasiFd, cookie: u64) -> Result<Vec<DirEntry>> {
        let fresh = if cookie == 0 || self.fds.get(fd)?.dir_snapshot.is_none() {
            Some(self.readdir(fd)?)
        } else {
            None
        };

        let entry = self.fds.get_mut(fd)?;
        if let Some(listing) = fresh {
            entry.dir_snapshot = Some(listing);
        }
        let snapshot = entry.dir_snapshot.as_deref().unwrap_or_default();
        let skip = usize::try_from(cookie).unwrap_or(usize::MAX);
        Ok(snapshot.iter().skip(skip).cloned().collect())
    }

    pub fn read(&mut self, fd: WasiFd, buf: &mut [u8]) -> Result<usize> {
        let entry = self.fds.get_mut(fd)?;
        if entry.kind.is_dir() {
            return Err(FsError::IsADirectory);
        }
        if !entry.is_readable() {
            return Err(FsError::NotOpenForReading);
        }

        let read = match &mut entry.kind {
            Kind::Stdio(Stdio::Stdin(reader)) => return Ok(reader.read(buf)?),
            Kind::File { node } => self.tree.read_at(*node, entry.offset, buf)?,
            Kind::HostFile { file } => {
                file.seek(SeekFrom::Start(entry.offset))?;
                file.read(buf).map_err(host_io_error)?
            }
            _ => return Err(FsError::NotOpenForReading),
        };
        entry.offset += read as u64;
        Ok(read)
    }

    pub fn write(&mut self, fd: WasiFd, data: &[u8]) -> Result<usize> {
        let entry = self.fds.get_mut(fd)?;
        if entry.kind.is_dir() {
            return Err(FsError::IsADirectory);
        }
        if !entry.is_writable() {
            return Err(FsError::NotOpenForWriting);
        }
        let append = entry.is_append() || entry.flags.contains(Fdflags::APPEND);

        let written = match &mut entry.kind {
            Kind::Stdio(Stdio::Stdout(writer)) | Kind::Stdio(Stdio::Stderr(writer)) => {
                writer.write_all(data).map_err(host_io_error)?;
                writer.flush().map_err(host_io_error)?;
                return Ok(data.len());
            }
            Kind::File { node } => {
                if append {
                    entry.offset = self.tree.len(*node)?;
                }
                self.tree.write_at(*node, entry.offset, data)?
            }
            Kind::HostFile { file } => {
                entry.offset = if append {
                    file.seek(SeekFrom::End(0))?
                } else {
                    file.seek(SeekFrom::Start(entry.offset))?
                };
                file.write(data).map_err(host_io_error)?
            }
            _ => return Err(FsError::NotOpenForWriting),
        };
        entry.offset += written as u64;
        Ok(written)
    }

    /// Moves the handle's cursor and returns the new position.
    pub fn seek(&mut self, fd: WasiFd, offset: i64, whence: Whence) -> Result<u64> {
        let entry = self.fds.get_mut(fd)?;
        let end = match &entry.kind {
            Kind::Stdio(_) => return Err(FsError::NotSeekable),
            Kind::File { node } => self.tree.len(*node)?,
            Kind::HostFile { file } => file.metadata()?.len(),
            _ => return Err(FsError::InvalidInput),
        };
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => entry.offset,
            Whence::End => end,
        };
        let position = base
            .checked_add_signed(offset)
            .ok_or(FsError::InvalidSeek)?;
        trace!(%fd, position, "seek");
        entry.offset = position;
        Ok(position)
    }

    pub fn tell(&self, fd: WasiFd) -> Result<u64> {
        let entry = self.fds.get(fd)?;
        match entry.kind {
            Kind::Stdio(_) => Err(FsError::NotSeekable),
            _ => Ok(entry.offset),
        }
    }

    pub fn close(&mut self, fd: WasiFd) -> Result<()> {
        let entry = self.fds.remove(fd)?;
        if entry.kind.is_mount() {
            self.mounts.retain(|m| m.fd != fd);
            debug!(%fd, path = ?entry.path, "mount closed");
        }
        Ok(())
    }

    pub fn fstat(&self, fd: WasiFd) -> Result<Filestat> {
        let meta = match &self.fds.get(fd)?.kind {
            Kind::Stdio(_) => {
                return Ok(Filestat {
                    st_filetype: Filetype::CharacterDevice,
                    ..Default::default()
                })
            }
            Kind::File { node } | Kind::Dir { node } | Kind::Mount { node } => {
                self.tree.metadata(*node)?
            }
            Kind::HostFile { file } => metadata_from_host(&file.metadata()?),
            Kind::HostDir { root, rel } => root.metadata(rel)?,
            Kind::HostMount { root } => root.metadata("")?,
        };
        Ok(filestat_from(&meta))
    }

    pub fn fdstat(&self, fd: WasiFd) -> Result<Fdstat> {
        let entry = self.fds.get(fd)?;
        Ok(Fdstat {
            fs_filetype: entry.kind.filetype(),
            fs_flags: entry.flags,
            fs_rights_base: entry.rights,
            fs_rights_inheriting: entry.rights_inheriting,
        })
    }

    /// Truncates or zero-extends the file behind `fd`.
    pub fn set_len(&mut self, fd: WasiFd, len: u64) -> Result<()> {
        let entry = self.fds.get(fd)?;
        if entry.kind.is_dir() {
            return Err(FsError::IsADirectory);
        }
        if !entry.is_writable() {
            return Err(FsError::NotOpenForWriting);
        }
        match &entry.kind {
            Kind::File { node } => self.tree.set_len(*node, len),
            Kind::HostFile { file } => file.set_len(len).map_err(host_io_error),
            _ => Err(FsError::InvalidInput),
        }
    }

    /// The guest path of a mount handle.
    pub fn prestat_name(&self, fd: WasiFd) -> Result<&str> {
        let entry = self.fds.get(fd)?;
        if !entry.kind.is_mount() {
            return Err(FsError::InvalidFd);
        }
        entry.path.as_deref().ok_or(FsError::InvalidFd)
    }

    /// Checks that `path` exists; symbolic links are never present, so any
    /// existing path is simply not a link.
    pub fn readlink(&self, at: At, path: &str) -> Result<()> {
        self.stat(at, path).map(|_| ())
    }

    /// Marks a tree file read-only, or writable again.
    pub fn set_read_only(&mut self, path: &str, read_only: bool) -> Result<()> {
        let node = self.tree.lookup(self.tree.root(), path)?;
        self.tree.set_read_only(node, read_only)
    }

    /// A copy of a tree file's content.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let node = self.tree.lookup(self.tree.root(), path)?;
        Ok(self.tree.contents(node)?.to_vec())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.tree.lookup(self.tree.root(), path).is_ok()
    }
}

fn open_mode(conf: &OpenOptionsConfig) -> u16 {
    let mut flags = 0;
    if conf.read {
        flags |= Fd::READ;
    }
    if conf.write {
        flags |= Fd::WRITE;
    }
    if conf.append {
        flags |= Fd::APPEND;
    }
    if conf.truncate {
        flags |= Fd::TRUNCATE;
    }
    if conf.create || conf.create_new {
        flags |= Fd::CREATE;
    }
    flags
}

fn host_io_error(err: std::io::Error) -> FsError {
    warn!("host I/O failed: {err}");
    err.into()
}

/// Normalizes a path below a passthrough root into the form stored on its
/// handles.
fn host_rel(rel: &str) -> Result<String> {
    let normalized = virtual_fs::host_fs::normalize_path(rel)?;
    Ok(normalized.to_string_lossy().into_owned())
}

fn filestat_from(meta: &Metadata) -> Filestat {
    Filestat {
        st_dev: 0,
        st_ino: meta.ino,
        st_filetype: filetype_from(meta.ft),
        st_nlink: 1,
        st_size: meta.len,
        st_atim: meta.accessed,
        st_mtim: meta.modified,
        st_ctim: meta.created,
    }
}

fn filetype_from(ft: FileType) -> Filetype {
    if ft.is_dir() {
        Filetype::Directory
    } else if ft.is_symlink() {
        Filetype::SymbolicLink
    } else if ft.is_char_device() {
        Filetype::CharacterDevice
    } else if ft.is_file() {
        Filetype::RegularFile
    } else {
        Filetype::Unknown
    }
}

pub(crate) fn dirent_type(entry: &DirEntry) -> Filetype {
    filetype_from(entry.ft)
}

/// Collapses an absolute guest path: repeated slashes and `.` go away, `..`
/// pops a component and stops at the root.
pub(crate) fn normalize_guest_path(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath);
    }
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

/// The part of `path` below `mount_point`, or `None` if `path` is elsewhere.
/// Both must be normalized.
pub(crate) fn strip_mount_point<'a>(path: &'a str, mount_point: &str) -> Option<&'a str> {
    if mount_point == "/" {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(mount_point)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (WasiFs, WasiFd) {
        let mut fs = WasiFs::new(64, 1 << 20);
        let lib = fs.add_virtual_mount("/lib").unwrap();
        (fs, lib)
    }

    fn rw_create() -> OpenRequest {
        OpenRequest {
            conf: OpenOptionsConfig {
                read: true,
                write: true,
                create: true,
                ..Default::default()
            },
            rights: Rights::FILE_READ | Rights::FILE_WRITE,
            ..Default::default()
        }
    }

    #[test]
    fn first_mount_is_handle_three() {
        let (mut fs, lib) = session();
        assert_eq!(lib, 3);
        assert_eq!(fs.prestat_name(lib), Ok("/lib"));
        assert_eq!(fs.prestat_name(1), Err(FsError::InvalidFd));

        let tmp = fs.add_virtual_mount("/tmp/./").unwrap();
        assert_eq!(tmp, 4);
        assert_eq!(fs.prestat_name(tmp), Ok("/tmp"));
        assert_eq!(
            fs.mounts().collect::<Vec<_>>(),
            vec![("/lib", 3), ("/tmp", 4)]
        );
    }

    #[test]
    fn cursors_are_per_handle() {
        let (mut fs, lib) = session();
        let a = fs.open(At::Fd(lib), "shared.txt", rw_create()).unwrap();
        let b = fs.open(At::Fd(lib), "shared.txt", rw_create()).unwrap();

        assert_eq!(fs.write(a, b"hello"), Ok(5));
        assert_eq!(fs.tell(a), Ok(5));
        assert_eq!(fs.tell(b), Ok(0));

        let mut buf = [0u8; 3];
        assert_eq!(fs.read(b, &mut buf), Ok(3));
        assert_eq!(&buf, b"hel");
        assert_eq!(fs.tell(a), Ok(5));
        assert_eq!(fs.tell(b), Ok(3));
    }

    #[test]
    fn open_flag_errors() {
        let (mut fs, lib) = session();
        fs.create_with_content("/lib/file", b"data").unwrap();
        fs.mkdirp("/lib/dir").unwrap();

        let exclusive = OpenRequest {
            conf: OpenOptionsConfig {
                write: true,
                create_new: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            fs.open(At::Fd(lib), "file", exclusive),
            Err(FsError::AlreadyExists)
        );

        let write = OpenRequest {
            conf: OpenOptionsConfig {
                write: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(fs.open(At::Fd(lib), "dir", write), Err(FsError::IsADirectory));
        assert_eq!(fs.open(At::Fd(lib), "missing", write), Err(FsError::EntryNotFound));

        let directory = OpenRequest {
            directory: true,
            ..OpenRequest::read()
        };
        assert_eq!(
            fs.open(At::Fd(lib), "file", directory),
            Err(FsError::NotADirectory)
        );
        let dir = fs.open(At::Fd(lib), "dir", directory).unwrap();
        assert_eq!(fs.fdstat(dir).unwrap().fs_filetype, Filetype::Directory);
        assert_eq!(
            fs.open(At::Fd(lib), "file/x", OpenRequest::read()),
            Err(FsError::NotADirectory)
        );

        let file = fs.open(At::Fd(lib), "file", OpenRequest::read()).unwrap();
        assert_eq!(
            fs.open(At::Fd(file), "x", OpenRequest::read()),
            Err(FsError::NotADirectory)
        );
        assert_eq!(fs.write(file, b"x"), Err(FsError::NotOpenForWriting));
    }

    #[test]
    fn truncate_on_open() {
        let (mut fs, lib) = session();
        fs.create_with_content("/lib/log", b"old content").unwrap();

        let req = OpenRequest {
            conf: OpenOptionsConfig {
                write: true,
                truncate: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let fd = fs.open(At::Fd(lib), "log", req).unwrap();
        assert_eq!(fs.fstat(fd).unwrap().st_size, 0);
        assert_eq!(fs.write(fd, b"new"), Ok(3));
        assert_eq!(fs.read_file("/lib/log").unwrap(), b"new");
    }

    #[test]
    fn append_writes_go_to_the_end() {
        let (mut fs, lib) = session();
        fs.create_with_content("/lib/log", b"one\n").unwrap();

        let req = OpenRequest {
            conf: OpenOptionsConfig {
                append: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let fd = fs.open(At::Fd(lib), "log", req).unwrap();
        fs.seek(fd, 0, Whence::Set).unwrap();
        fs.write(fd, b"two\n").unwrap();
        assert_eq!(fs.read_file("/lib/log").unwrap(), b"one\ntwo\n");
        assert!(fs.fdstat(fd).unwrap().fs_flags.contains(Fdflags::APPEND));
    }

    #[test]
    fn seek_rules() {
        let (mut fs, lib) = session();
        let fd = fs.open(At::Fd(lib), "f", rw_create()).unwrap();
        fs.write(fd, b"0123456789").unwrap();

        assert_eq!(fs.seek(fd, -4, Whence::End), Ok(6));
        assert_eq!(fs.seek(fd, 2, Whence::Cur), Ok(8));
        assert_eq!(fs.seek(fd, -9, Whence::Cur), Err(FsError::InvalidSeek));
        assert_eq!(fs.tell(fd), Ok(8));
        assert_eq!(fs.seek(fd, 20, Whence::Set), Ok(20));

        assert_eq!(fs.seek(1, 0, Whence::Set), Err(FsError::NotSeekable));
        assert_eq!(fs.tell(0), Err(FsError::NotSeekable));
        assert_eq!(fs.seek(lib, 0, Whence::Set), Err(FsError::InvalidInput));
    }

    #[test]
    fn stat_and_remove() {
        let (mut fs, lib) = session();
        fs.mkdirp("/a/b/c").unwrap();
        fs.mkdirp("/a/b/c").unwrap();

        let stat = fs.stat(At::Fd(lib), "/a/b/c").unwrap();
        assert_eq!(stat.st_filetype, Filetype::Directory);
        assert_eq!(fs.readdir_from(lib, 0).unwrap().len(), 2);

        fs.remove(At::VirtualRoot, "/a").unwrap();
        assert_eq!(fs.stat(At::Fd(lib), "/a/b/c"), Err(FsError::EntryNotFound));
        assert_eq!(fs.remove(At::VirtualRoot, "/lib"), Err(FsError::PermissionDenied));
    }

    #[test]
    fn handles_outlive_their_nodes() {
        let (mut fs, lib) = session();
        let fd = fs.open(At::Fd(lib), "gone", rw_create()).unwrap();
        fs.unlink(At::Fd(lib), "gone").unwrap();

        assert_eq!(fs.write(fd, b"x"), Err(FsError::EntryNotFound));
        assert_eq!(fs.fstat(fd), Err(FsError::EntryNotFound));
        assert_eq!(fs.close(fd), Ok(()));
        assert_eq!(fs.close(fd), Err(FsError::InvalidFd));
    }

    #[test]
    fn mkdir_and_rmdir() {
        let (mut fs, lib) = session();
        fs.mkdir(At::Fd(lib), "d").unwrap();
        assert_eq!(fs.mkdir(At::Fd(lib), "d"), Err(FsError::AlreadyExists));
        assert_eq!(fs.mkdir(At::Fd(lib), "."), Err(FsError::AlreadyExists));
        fs.create_with_content("/lib/d/f", b"").unwrap();

        assert_eq!(fs.remove_dir(At::Fd(lib), "d"), Err(FsError::DirectoryNotEmpty));
        assert_eq!(fs.unlink(At::Fd(lib), "d"), Err(FsError::IsADirectory));
        fs.unlink(At::Fd(lib), "d/f").unwrap();
        fs.remove_dir(At::Fd(lib), "d").unwrap();
        assert!(!fs.exists("/lib/d"));
    }

    #[test]
    fn read_only_files_refuse_writes() {
        let (mut fs, lib) = session();
        fs.create_with_content("/lib/ro", b"fixed").unwrap();
        fs.set_read_only("/lib/ro", true).unwrap();

        let fd = fs.open(At::Fd(lib), "ro", rw_create()).unwrap();
        assert_eq!(fs.write(fd, b"x"), Err(FsError::NotOpenForWriting));
        assert_eq!(fs.set_len(fd, 0), Err(FsError::NotOpenForWriting));

        let mut buf = [0u8; 5];
        assert_eq!(fs.read(fd, &mut buf), Ok(5));
        assert_eq!(&buf, b"fixed");
    }

    #[test]
    fn stdio_routing() {
        let (mut fs, _) = session();
        let out = CaptureBuffer::new();
        fs.set_stdout(Box::new(out.clone()));
        fs.set_stdin(Box::new(&b"typed"[..]));

        assert_eq!(fs.write(1, b"printed"), Ok(7));
        assert_eq!(out.contents(), b"printed");

        let mut buf = [0u8; 8];
        assert_eq!(fs.read(0, &mut buf), Ok(5));
        assert_eq!(fs.read(1, &mut buf), Err(FsError::NotOpenForReading));
        assert_eq!(fs.write(0, b"x"), Err(FsError::NotOpenForWriting));
        assert_eq!(fs.backend(2), Ok(Backend::Stdio));
        assert_eq!(fs.fstat(2).unwrap().st_filetype, Filetype::CharacterDevice);
    }

    #[test]
    fn passthrough_mount_serves_host_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"from host").unwrap();

        let (mut fs, _) = session();
        let data = fs.add_passthrough_mount("/data", dir.path()).unwrap();
        assert_eq!(data, 4);
        assert_eq!(fs.backend(data), Ok(Backend::Passthrough));

        let fd = fs.open(At::Fd(3), "/data/hello.txt", OpenRequest::read()).unwrap();
        assert_eq!(fs.backend(fd), Ok(Backend::Passthrough));
        let mut buf = [0u8; 32];
        assert_eq!(fs.read(fd, &mut buf), Ok(9));
        assert_eq!(&buf[..9], b"from host");

        let out = fs.open(At::Fd(data), "new.txt", rw_create()).unwrap();
        assert_eq!(fs.write(out, b"abc"), Ok(3));
        assert_eq!(std::fs::read(dir.path().join("new.txt")).unwrap(), b"abc");

        fs.mkdir(At::Fd(data), "sub").unwrap();
        assert!(dir.path().join("sub").is_dir());
        let names: Vec<String> = fs.readdir(data).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec![".", "..", "hello.txt", "new.txt", "sub"]);

        // `..` never leaves the mount.
        let escaped = fs.stat(At::Fd(data), "../../hello.txt").unwrap();
        assert_eq!(escaped.st_size, 9);
    }

    #[test]
    fn guest_paths_are_normalized() {
        assert_eq!(normalize_guest_path("/a//b/./c/").unwrap(), "/a/b/c");
        assert_eq!(normalize_guest_path("/a/../../b").unwrap(), "/b");
        assert_eq!(normalize_guest_path("/").unwrap(), "/");
        assert_eq!(normalize_guest_path("a"), Err(FsError::InvalidPath));

        assert_eq!(strip_mount_point("/data/x/y", "/data"), Some("x/y"));
        assert_eq!(strip_mount_point("/data", "/data"), Some(""));
        assert_eq!(strip_mount_point("/database", "/data"), None);
        assert_eq!(strip_mount_point("/x", "/"), Some("x"));
    }
}
