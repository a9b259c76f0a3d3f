mod file;
mod filesystem;

pub use file::{ByteStore, MAX_FILE_SIZE};
pub use filesystem::{FileSystem, Resolved};

use indexmap::IndexMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{FileType, Metadata};

/// A reference to a node in the tree.
///
/// `slot` indexes the node storage and `ino` is the node's identity number.
/// Slots are recycled once a node is removed but identity numbers never are,
/// so an id that outlived its node is detected instead of aliasing a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: usize,
    ino: u64,
}

impl NodeId {
    pub fn ino(&self) -> u64 {
        self.ino
    }
}

#[derive(Debug, Clone, Copy)]
struct Times {
    accessed: u64,
    modified: u64,
    created: u64,
}

impl Times {
    fn now() -> Self {
        let now = time();
        Times {
            accessed: now,
            modified: now,
            created: now,
        }
    }
}

#[derive(Debug)]
struct FileNode {
    ino: u64,
    name: String,
    store: ByteStore,
    times: Times,
}

#[derive(Debug)]
struct DirectoryNode {
    ino: u64,
    name: String,
    /// Back-reference used for `..` only; never used to free anything.
    parent: Option<NodeId>,
    children: IndexMap<String, NodeId>,
    times: Times,
}

#[derive(Debug)]
enum Node {
    File(FileNode),
    Directory(DirectoryNode),
}

impl Node {
    fn ino(&self) -> u64 {
        match self {
            Self::File(FileNode { ino, .. }) => *ino,
            Self::Directory(DirectoryNode { ino, .. }) => *ino,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::File(FileNode { name, .. }) => name,
            Self::Directory(DirectoryNode { name, .. }) => name,
        }
    }

    fn file_type(&self) -> FileType {
        match self {
            Self::File(_) => FileType::new_file(),
            Self::Directory(_) => FileType::new_dir(),
        }
    }

    fn metadata(&self) -> Metadata {
        let (times, len) = match self {
            Self::File(FileNode { times, store, .. }) => (times, store.len() as u64),
            Self::Directory(DirectoryNode { times, children, .. }) => {
                (times, children.len() as u64)
            }
        };
        Metadata {
            ino: self.ino(),
            ft: self.file_type(),
            accessed: times.accessed,
            created: times.created,
            modified: times.modified,
            len,
        }
    }
}

/// Nanoseconds since the unix epoch; zero if the host clock is before it.
fn time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
