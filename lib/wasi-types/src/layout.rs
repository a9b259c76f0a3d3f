//! Fixed binary records exchanged with the guest through linear memory.
//!
//! Every record is encoded little-endian at the exact offsets the guest C
//! library expects; padding bytes are always zero.

use byteorder::{ByteOrder, LittleEndian};

use crate::types::{
    Device, Dircookie, Fdflags, Filesize, Filetype, Inode, Linkcount, Preopentype, Rights,
    Timestamp,
};

pub const FILESTAT_SIZE: usize = 64;
pub const FDSTAT_SIZE: usize = 24;
pub const PRESTAT_SIZE: usize = 8;
pub const DIRENT_SIZE: usize = 24;
pub const IOVEC_SIZE: usize = 8;

/// File attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filestat {
    pub st_dev: Device,
    pub st_ino: Inode,
    pub st_filetype: Filetype,
    pub st_nlink: Linkcount,
    pub st_size: Filesize,
    pub st_atim: Timestamp,
    pub st_mtim: Timestamp,
    pub st_ctim: Timestamp,
}

impl Default for Filestat {
    fn default() -> Self {
        Filestat {
            st_dev: 0,
            st_ino: 0,
            st_filetype: Filetype::Unknown,
            st_nlink: 1,
            st_size: 0,
            st_atim: 0,
            st_mtim: 0,
            st_ctim: 0,
        }
    }
}

impl Filestat {
    pub fn to_le_bytes(&self) -> [u8; FILESTAT_SIZE] {
        let mut out = [0u8; FILESTAT_SIZE];
        LittleEndian::write_u64(&mut out[0..8], self.st_dev);
        LittleEndian::write_u64(&mut out[8..16], self.st_ino);
        out[16] = self.st_filetype.into();
        LittleEndian::write_u64(&mut out[24..32], self.st_nlink);
        LittleEndian::write_u64(&mut out[32..40], self.st_size);
        LittleEndian::write_u64(&mut out[40..48], self.st_atim);
        LittleEndian::write_u64(&mut out[48..56], self.st_mtim);
        LittleEndian::write_u64(&mut out[56..64], self.st_ctim);
        out
    }
}

/// File descriptor attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fdstat {
    pub fs_filetype: Filetype,
    pub fs_flags: Fdflags,
    pub fs_rights_base: Rights,
    pub fs_rights_inheriting: Rights,
}

impl Fdstat {
    pub fn to_le_bytes(&self) -> [u8; FDSTAT_SIZE] {
        let mut out = [0u8; FDSTAT_SIZE];
        out[0] = self.fs_filetype.into();
        LittleEndian::write_u16(&mut out[2..4], self.fs_flags.bits());
        LittleEndian::write_u64(&mut out[8..16], self.fs_rights_base.bits());
        LittleEndian::write_u64(&mut out[16..24], self.fs_rights_inheriting.bits());
        out
    }
}

/// Information about a pre-opened capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prestat {
    pub pr_type: Preopentype,
    pub pr_name_len: u32,
}

impl Prestat {
    pub fn dir(name_len: u32) -> Self {
        Prestat {
            pr_type: Preopentype::Dir,
            pr_name_len: name_len,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; PRESTAT_SIZE] {
        let mut out = [0u8; PRESTAT_SIZE];
        out[0] = self.pr_type.into();
        LittleEndian::write_u32(&mut out[4..8], self.pr_name_len);
        out
    }
}

/// A directory entry header. The name follows it in guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dirent {
    pub d_next: Dircookie,
    pub d_ino: Inode,
    pub d_namlen: u32,
    pub d_type: Filetype,
}

pub fn dirent_to_le_bytes(ent: &Dirent) -> [u8; DIRENT_SIZE] {
    let mut out = [0u8; DIRENT_SIZE];
    LittleEndian::write_u64(&mut out[0..8], ent.d_next);
    LittleEndian::write_u64(&mut out[8..16], ent.d_ino);
    LittleEndian::write_u32(&mut out[16..20], ent.d_namlen);
    out[20] = ent.d_type.into();
    out
}

/// A region of guest memory used by scatter/gather I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Iovec {
    pub buf: u32,
    pub buf_len: u32,
}

impl Iovec {
    /// Decodes one 8-byte record. `bytes` must hold at least [`IOVEC_SIZE`] bytes.
    pub fn from_le_bytes(bytes: &[u8; IOVEC_SIZE]) -> Self {
        Iovec {
            buf: LittleEndian::read_u32(&bytes[0..4]),
            buf_len: LittleEndian::read_u32(&bytes[4..8]),
        }
    }
}
