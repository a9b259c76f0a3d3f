//! This module contains the [`FileSystem`] type itself.

use super::*;
use crate::{DirEntry, FsError, Result, MAX_NAME_LEN};
use slab::Slab;
use std::fmt;
use tracing::trace;

/// Identity number of the root directory.
const ROOT_INO: u64 = 1;

/// The in-memory directory tree.
///
/// Nodes live in a slab; directories own their children through the slab
/// slots recorded in their child table. Removing an entry tears down the
/// whole subtree beneath it.
pub struct FileSystem {
    storage: Slab<Node>,
    root: NodeId,
    next_ino: u64,
    max_file_size: u64,
}

/// Outcome of walking a path: the directory that holds the last component,
/// and that component. `leaf` is `None` when the path names `parent` itself
/// (empty path, `.`, a trailing `..`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub parent: NodeId,
    pub leaf: Option<String>,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    pub fn new() -> Self {
        let mut storage = Slab::new();
        let slot = storage.insert(Node::Directory(DirectoryNode {
            ino: ROOT_INO,
            name: "/".to_string(),
            parent: None,
            children: IndexMap::new(),
            times: Times::now(),
        }));

        Self {
            storage,
            root: NodeId {
                slot,
                ino: ROOT_INO,
            },
            next_ino: ROOT_INO + 1,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    /// Caps the size of files created from now on.
    pub fn set_max_file_size(&mut self, limit: u64) {
        self.max_file_size = limit;
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.storage
            .get(id.slot)
            .filter(|node| node.ino() == id.ino)
            .ok_or(FsError::EntryNotFound)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.storage
            .get_mut(id.slot)
            .filter(|node| node.ino() == id.ino)
            .ok_or(FsError::EntryNotFound)
    }

    fn dir(&self, id: NodeId) -> Result<&DirectoryNode> {
        match self.node(id)? {
            Node::Directory(dir) => Ok(dir),
            Node::File(_) => Err(FsError::NotADirectory),
        }
    }

    fn dir_mut(&mut self, id: NodeId) -> Result<&mut DirectoryNode> {
        match self.node_mut(id)? {
            Node::Directory(dir) => Ok(dir),
            Node::File(_) => Err(FsError::NotADirectory),
        }
    }

    fn file(&self, id: NodeId) -> Result<&FileNode> {
        match self.node(id)? {
            Node::File(file) => Ok(file),
            Node::Directory(_) => Err(FsError::IsADirectory),
        }
    }

    fn file_mut(&mut self, id: NodeId) -> Result<&mut FileNode> {
        match self.node_mut(id)? {
            Node::File(file) => Ok(file),
            Node::Directory(_) => Err(FsError::IsADirectory),
        }
    }

    pub fn is_dir(&self, id: NodeId) -> Result<bool> {
        Ok(matches!(self.node(id)?, Node::Directory(_)))
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.dir(id)?.parent)
    }

    /// Walks `path` and stops before its last component.
    ///
    /// Absolute paths start at the root, relative ones at `start`. Empty and
    /// `.` components are skipped, `..` moves to the parent (and stays put at
    /// the root). Every intermediate component must exist and be a directory.
    pub fn resolve(&self, start: NodeId, path: &str) -> Result<Resolved> {
        let mut current = if path.starts_with('/') {
            self.root
        } else {
            start
        };
        self.dir(current)?;

        let components: Vec<&str> = path
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        let Some((last, intermediate)) = components.split_last() else {
            return Ok(Resolved {
                parent: current,
                leaf: None,
            });
        };

        for component in intermediate {
            current = self.step(current, component)?;
        }

        if *last == ".." {
            return Ok(Resolved {
                parent: self.step(current, last)?,
                leaf: None,
            });
        }
        check_name(last)?;

        Ok(Resolved {
            parent: current,
            leaf: Some(last.to_string()),
        })
    }

    fn step(&self, dir: NodeId, name: &str) -> Result<NodeId> {
        let node = self.dir(dir)?;
        if name == ".." {
            return Ok(node.parent.unwrap_or(dir));
        }
        check_name(name)?;

        let child = *node.children.get(name).ok_or(FsError::EntryNotFound)?;
        match self.node(child)? {
            Node::Directory(_) => Ok(child),
            Node::File(_) => Err(FsError::NotADirectory),
        }
    }

    /// Resolves `path` all the way to a node.
    pub fn lookup(&self, start: NodeId, path: &str) -> Result<NodeId> {
        let resolved = self.resolve(start, path)?;
        match resolved.leaf {
            None => Ok(resolved.parent),
            Some(name) => self
                .child(resolved.parent, &name)?
                .ok_or(FsError::EntryNotFound),
        }
    }

    pub fn child(&self, dir: NodeId, name: &str) -> Result<Option<NodeId>> {
        Ok(self.dir(dir)?.children.get(name).copied())
    }

    pub fn create_file(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        let limit = self.max_file_size;
        self.insert(dir, name, |ino, name| {
            Node::File(FileNode {
                ino,
                name,
                store: ByteStore::with_limit(limit),
                times: Times::now(),
            })
        })
    }

    pub fn create_dir(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        self.insert(dir, name, |ino, name| {
            Node::Directory(DirectoryNode {
                ino,
                name,
                parent: Some(dir),
                children: IndexMap::new(),
                times: Times::now(),
            })
        })
    }

    fn insert(
        &mut self,
        dir: NodeId,
        name: &str,
        make: impl FnOnce(u64, String) -> Node,
    ) -> Result<NodeId> {
        check_name(name)?;
        if name == ".." {
            return Err(FsError::InvalidPath);
        }
        if self.dir(dir)?.children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }

        let ino = self.next_ino;
        self.next_ino += 1;
        let slot = self.storage.insert(make(ino, name.to_string()));
        let id = NodeId { slot, ino };

        let parent = self.dir_mut(dir)?;
        parent.children.insert(name.to_string(), id);
        parent.times.modified = time();

        trace!(ino, name, parent = dir.ino, "node created");
        Ok(id)
    }

    /// Creates every missing directory along `path`, which is always taken
    /// relative to the root. Existing directories are reused.
    pub fn mkdirp(&mut self, path: &str) -> Result<NodeId> {
        let mut current = self.root;
        for component in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            if component == ".." {
                current = self.dir(current)?.parent.unwrap_or(current);
                continue;
            }
            current = match self.child(current, component)? {
                Some(existing) => {
                    self.dir(existing)?;
                    existing
                }
                None => self.create_dir(current, component)?,
            };
        }
        Ok(current)
    }

    /// Writes a whole file at a root-relative `path`, creating its parent
    /// directories first. Existing content is replaced.
    pub fn create_with_content(&mut self, path: &str, data: &[u8]) -> Result<NodeId> {
        let trimmed = path.trim_end_matches('/');
        let (dir_path, name) = match trimmed.rsplit_once('/') {
            Some((dir_path, name)) => (dir_path, name),
            None => ("", trimmed),
        };
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::InvalidPath);
        }

        let dir = self.mkdirp(dir_path)?;
        let id = match self.child(dir, name)? {
            Some(existing) => existing,
            None => self.create_file(dir, name)?,
        };
        let file = self.file_mut(id)?;
        file.store.replace(data)?;
        file.times.modified = time();
        Ok(id)
    }

    /// Detaches `name` from `dir` and destroys it along with everything
    /// below it.
    pub fn remove(&mut self, dir: NodeId, name: &str) -> Result<()> {
        let id = self
            .dir_mut(dir)?
            .children
            .shift_remove(name)
            .ok_or(FsError::EntryNotFound)?;
        if let Ok(parent) = self.dir_mut(dir) {
            parent.times.modified = time();
        }
        self.teardown(id);
        trace!(ino = id.ino, name, "node removed");
        Ok(())
    }

    fn teardown(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if !self.contains(id) {
                continue;
            }
            if let Node::Directory(dir) = self.storage.remove(id.slot) {
                pending.extend(dir.children.into_values());
            }
        }
    }

    /// Removes a file entry. Directories are refused with `IsADirectory`.
    pub fn unlink(&mut self, dir: NodeId, name: &str) -> Result<()> {
        let id = self.child(dir, name)?.ok_or(FsError::EntryNotFound)?;
        self.file(id)?;
        self.remove(dir, name)
    }

    /// Removes an empty directory entry.
    pub fn rmdir(&mut self, dir: NodeId, name: &str) -> Result<()> {
        let id = self.child(dir, name)?.ok_or(FsError::EntryNotFound)?;
        if !self.dir(id)?.children.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.remove(dir, name)
    }

    /// Lists a directory: `.` and `..` first, then the children in the
    /// order they were created.
    pub fn list(&self, dir: NodeId) -> Result<Vec<DirEntry>> {
        let node = self.dir(dir)?;
        let parent_ino = node.parent.map(|p| p.ino).unwrap_or(node.ino);

        let mut entries = Vec::with_capacity(node.children.len() + 2);
        entries.push(DirEntry {
            name: ".".to_string(),
            ino: node.ino,
            ft: FileType::new_dir(),
        });
        entries.push(DirEntry {
            name: "..".to_string(),
            ino: parent_ino,
            ft: FileType::new_dir(),
        });
        for (name, child) in node.children.iter() {
            if let Ok(child) = self.node(*child) {
                entries.push(DirEntry {
                    name: name.clone(),
                    ino: child.ino(),
                    ft: child.file_type(),
                });
            }
        }
        Ok(entries)
    }

    pub fn metadata(&self, id: NodeId) -> Result<Metadata> {
        Ok(self.node(id)?.metadata())
    }

    pub fn len(&self, id: NodeId) -> Result<u64> {
        Ok(self.file(id)?.store.len() as u64)
    }

    pub fn contents(&self, id: NodeId) -> Result<&[u8]> {
        Ok(self.file(id)?.store.as_bytes())
    }

    pub fn read_at(&mut self, id: NodeId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let file = self.file_mut(id)?;
        file.times.accessed = time();
        Ok(file.store.read_at(offset, buf))
    }

    pub fn write_at(&mut self, id: NodeId, offset: u64, data: &[u8]) -> Result<usize> {
        let file = self.file_mut(id)?;
        let written = file.store.write_at(offset, data)?;
        file.times.modified = time();
        Ok(written)
    }

    pub fn set_len(&mut self, id: NodeId, len: u64) -> Result<()> {
        let file = self.file_mut(id)?;
        file.store.set_len(len)?;
        file.times.modified = time();
        Ok(())
    }

    pub fn is_read_only(&self, id: NodeId) -> Result<bool> {
        Ok(self.file(id)?.store.is_read_only())
    }

    pub fn set_read_only(&mut self, id: NodeId, read_only: bool) -> Result<()> {
        self.file_mut(id)?.store.set_read_only(read_only);
        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::NameTooLong);
    }
    if name.is_empty() || name == "." || name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidPath);
    }
    Ok(())
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            formatter,
            "\n{inode:<8}    {ty:<4}    name",
            inode = "inode",
            ty = "type",
        )?;

        fn debug(
            fs: &FileSystem,
            id: NodeId,
            formatter: &mut fmt::Formatter<'_>,
            indentation: usize,
        ) -> fmt::Result {
            let Ok(node) = fs.node(id) else {
                return Ok(());
            };
            writeln!(
                formatter,
                "{inode:<8}    {ty:<4}   {indentation_symbol:indentation_width$}{name}",
                inode = node.ino(),
                ty = match node {
                    Node::File(_) => "file",
                    Node::Directory(_) => "dir",
                },
                name = node.name(),
                indentation_symbol = " ",
                indentation_width = indentation * 2 + 1,
            )?;

            if let Node::Directory(dir) = node {
                for child in dir.children.values() {
                    debug(fs, *child, formatter, indentation + 1)?;
                }
            }
            Ok(())
        }

        debug(self, self.root, formatter, 0)
    }
}
