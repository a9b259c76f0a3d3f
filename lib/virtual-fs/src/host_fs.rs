//! A real directory on the host, exposed to the guest under a mount.
//!
//! Guest paths are normalized lexically before they touch the host:
//! `..` can never climb above the mount's root directory. Symbolic links
//! that lead outside the root are refused with `PermissionDenied`.

use crate::{DirEntry, FileType, FsError, Metadata, OpenOptionsConfig, Result, MAX_NAME_LEN};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HostDir {
    root: PathBuf,
}

pub fn canonicalize(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(FsError::EntryNotFound);
    }
    fs::canonicalize(path).map_err(Into::into)
}

/// Lexically normalizes a guest path into a relative host path. Leading
/// `/`, `.` components and `..` that would escape the root are dropped.
pub fn normalize_path(path: &str) -> Result<PathBuf> {
    let mut ret = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Prefix(..) => return Err(FsError::InvalidPath),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                ret.pop();
            }
            Component::Normal(c) => {
                if c.len() > MAX_NAME_LEN {
                    return Err(FsError::NameTooLong);
                }
                ret.push(c);
            }
        }
    }
    Ok(ret)
}

impl HostDir {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = canonicalize(&root.into())?;
        if !root.is_dir() {
            return Err(FsError::NotADirectory);
        }
        debug!(root = %root.display(), "host directory opened");
        Ok(HostDir { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a path inside the mount to the host path it refers to.
    pub fn prepare_path(&self, path: &str) -> Result<PathBuf> {
        let host_path = self.root.join(normalize_path(path)?);
        self.confine(&host_path)?;
        Ok(host_path)
    }

    /// Checks that the deepest existing ancestor of `host_path`, once
    /// symbolic links are followed, is still below the root.
    fn confine(&self, host_path: &Path) -> Result<()> {
        for ancestor in host_path.ancestors() {
            if fs::symlink_metadata(ancestor).is_err() {
                continue;
            }
            let real = fs::canonicalize(ancestor).map_err(|_| FsError::PermissionDenied)?;
            if !real.starts_with(&self.root) {
                debug!(path = %host_path.display(), "host path leaves the mount");
                return Err(FsError::PermissionDenied);
            }
            return Ok(());
        }
        Ok(())
    }

    pub fn open(&self, path: &str, conf: &OpenOptionsConfig) -> Result<fs::File> {
        let host_path = self.prepare_path(path)?;
        if host_path.is_dir() {
            return Err(FsError::IsADirectory);
        }
        // The host refuses `create_new` or `create` without write access;
        // a guest may ask for either alongside read-only rights.
        let write = conf.write || conf.append || conf.truncate || conf.create || conf.create_new;
        fs::OpenOptions::new()
            .read(conf.read || !write)
            .write(write && !conf.append)
            .append(conf.append)
            .truncate(conf.truncate)
            .create(conf.create)
            .create_new(conf.create_new)
            .open(host_path)
            .map_err(Into::into)
    }

    pub fn metadata(&self, path: &str) -> Result<Metadata> {
        let host_path = self.prepare_path(path)?;
        let meta = fs::metadata(host_path)?;
        Ok(metadata_from_host(&meta))
    }

    pub fn create_dir(&self, path: &str) -> Result<()> {
        let host_path = self.prepare_path(path)?;
        if host_path == self.root {
            return Err(FsError::AlreadyExists);
        }
        fs::create_dir(host_path).map_err(Into::into)
    }

    pub fn remove_file(&self, path: &str) -> Result<()> {
        let host_path = self.prepare_path(path)?;
        if host_path.is_dir() {
            return Err(FsError::IsADirectory);
        }
        fs::remove_file(host_path).map_err(Into::into)
    }

    pub fn remove_dir(&self, path: &str) -> Result<()> {
        let host_path = self.prepare_path(path)?;
        if host_path == self.root {
            return Err(FsError::PermissionDenied);
        }
        if !host_path.is_dir() {
            return Err(if host_path.exists() {
                FsError::NotADirectory
            } else {
                FsError::EntryNotFound
            });
        }
        fs::remove_dir(host_path).map_err(Into::into)
    }

    /// Lists a directory with `.` and `..` first and the remaining entries
    /// sorted by name.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let host_path = self.prepare_path(path)?;
        let this = fs::metadata(&host_path)?;
        if !this.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let parent_ino = match host_path.parent() {
            Some(parent) if host_path != self.root => {
                metadata_from_host(&fs::metadata(parent)?).ino
            }
            _ => metadata_from_host(&this).ino,
        };

        let mut children = Vec::new();
        for entry in fs::read_dir(&host_path)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            children.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                ino: metadata_from_host(&meta).ino,
                ft: file_type_from_host(&meta),
            });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));

        let mut entries = vec![
            DirEntry {
                name: ".".to_string(),
                ino: metadata_from_host(&this).ino,
                ft: FileType::new_dir(),
            },
            DirEntry {
                name: "..".to_string(),
                ino: parent_ino,
                ft: FileType::new_dir(),
            },
        ];
        entries.extend(children);
        Ok(entries)
    }
}

fn file_type_from_host(meta: &fs::Metadata) -> FileType {
    let ft = meta.file_type();
    FileType {
        dir: ft.is_dir(),
        file: ft.is_file(),
        symlink: ft.is_symlink(),
        char_device: false,
    }
}

fn nanos(time: std::io::Result<SystemTime>) -> u64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

pub fn metadata_from_host(meta: &fs::Metadata) -> Metadata {
    #[cfg(unix)]
    let ino = {
        use std::os::unix::fs::MetadataExt;
        meta.ino()
    };
    #[cfg(not(unix))]
    let ino = 0;

    Metadata {
        ino,
        ft: file_type_from_host(meta),
        accessed: nanos(meta.accessed()),
        created: nanos(meta.created()),
        modified: nanos(meta.modified()),
        len: meta.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};

    #[test]
    fn test_normalize_path_stays_inside() {
        assert_eq!(normalize_path("/a/b/../c").unwrap(), PathBuf::from("a/c"));
        assert_eq!(normalize_path("../../etc/passwd").unwrap(), PathBuf::from("etc/passwd"));
        assert_eq!(normalize_path("./x/./y/").unwrap(), PathBuf::from("x/y"));
        assert_eq!(normalize_path("").unwrap(), PathBuf::new());
    }

    #[test]
    fn test_prepare_path_is_confined() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = HostDir::new(temp.path()).unwrap();

        let escaped = dir.prepare_path("../../../../etc/passwd").unwrap();
        assert!(escaped.starts_with(dir.root()));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_can_not_leave_the_root() {
        let outside = tempfile::TempDir::new().unwrap();
        fs::write(outside.path().join("secret"), b"s").unwrap();
        let temp = tempfile::TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("out")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("gone"), temp.path().join("dangling"))
            .unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("inside")).unwrap();
        let dir = HostDir::new(temp.path()).unwrap();

        let conf = OpenOptionsConfig {
            write: true,
            create: true,
            ..Default::default()
        };
        assert_eq!(
            dir.open("out/secret", &OpenOptionsConfig::read_only()).unwrap_err(),
            FsError::PermissionDenied
        );
        assert_eq!(dir.metadata("out").unwrap_err(), FsError::PermissionDenied);
        assert_eq!(dir.create_dir("out/new"), Err(FsError::PermissionDenied));
        assert_eq!(dir.open("dangling", &conf).unwrap_err(), FsError::PermissionDenied);
        assert!(!outside.path().join("gone").exists());

        dir.open("inside/ok.txt", &conf).unwrap();
        assert!(temp.path().join("real/ok.txt").exists());
    }

    #[test]
    fn test_open_write_then_read() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = HostDir::new(temp.path()).unwrap();

        let conf = OpenOptionsConfig {
            write: true,
            create: true,
            ..Default::default()
        };
        let mut file = dir.open("hello.txt", &conf).unwrap();
        file.write_all(b"hello host").unwrap();
        drop(file);

        let mut file = dir.open("/hello.txt", &OpenOptionsConfig::read_only()).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello host");

        assert_eq!(dir.metadata("hello.txt").unwrap().len(), 10);
        assert_eq!(
            dir.open("missing", &OpenOptionsConfig::read_only()).unwrap_err(),
            FsError::EntryNotFound
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_read_dir_and_removal() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = HostDir::new(temp.path()).unwrap();

        dir.create_dir("sub").unwrap();
        fs::write(temp.path().join("b.txt"), b"b").unwrap();
        fs::write(temp.path().join("sub/inner"), b"i").unwrap();

        let names: Vec<String> = dir.read_dir("/").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec![".", "..", "b.txt", "sub"]);

        assert_eq!(dir.remove_file("sub"), Err(FsError::IsADirectory));
        assert_eq!(dir.remove_dir("b.txt"), Err(FsError::NotADirectory));
        assert_eq!(dir.remove_dir("sub"), Err(FsError::DirectoryNotEmpty));
        assert_eq!(dir.remove_file("sub/inner"), Ok(()));
        assert_eq!(dir.remove_dir("sub"), Ok(()));
        assert_eq!(dir.remove_dir(""), Err(FsError::PermissionDenied));
    }
}
