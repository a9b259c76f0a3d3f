//! File content storage.

use crate::{FsError, Result};

/// Default size cap for a single in-memory file.
pub const MAX_FILE_SIZE: u64 = 1 << 32;

/// A growable byte buffer with random access.
///
/// The size of the file is always the length of the buffer. Writing past the
/// end zero-fills the gap. Growing beyond `limit`, or failing to allocate the
/// extra room, is reported as `StorageFull`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStore {
    buffer: Vec<u8>,
    read_only: bool,
    limit: u64,
}

impl Default for ByteStore {
    fn default() -> Self {
        Self::with_limit(MAX_FILE_SIZE)
    }
}

impl ByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: u64) -> Self {
        Self {
            buffer: Vec::new(),
            read_only: false,
            limit,
        }
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            ..Self::default()
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Copies bytes starting at `offset` into `buf`.
    ///
    /// Returns fewer bytes than requested near the end of the file and zero
    /// at or beyond it; end-of-file is never an error.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> usize {
        let len = self.buffer.len() as u64;
        if offset >= len {
            return 0;
        }
        let start = offset as usize;
        let amount = buf.len().min(self.buffer.len() - start);
        buf[..amount].copy_from_slice(&self.buffer[start..start + amount]);
        amount
    }

    /// Writes `data` at `offset`, zero-filling any gap past the current end.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if self.read_only {
            return Err(FsError::NotOpenForWriting);
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(FsError::StorageFull)?;
        if end > self.buffer.len() as u64 {
            self.grow(end)?;
        }
        let start = offset as usize;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// Shrinks or zero-extends the content to exactly `len` bytes.
    pub fn set_len(&mut self, len: u64) -> Result<()> {
        if self.read_only {
            return Err(FsError::NotOpenForWriting);
        }
        if len > self.buffer.len() as u64 {
            self.grow(len)?;
        } else {
            self.buffer.truncate(len as usize);
        }
        Ok(())
    }

    /// Replaces the whole content.
    pub fn replace(&mut self, data: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(FsError::NotOpenForWriting);
        }
        if data.len() as u64 > self.limit {
            return Err(FsError::StorageFull);
        }
        self.buffer.clear();
        self.grow(data.len() as u64)?;
        self.buffer.copy_from_slice(data);
        Ok(())
    }

    /// Zero-extends the buffer to `len` bytes without aborting on
    /// allocation failure.
    fn grow(&mut self, len: u64) -> Result<()> {
        if len > self.limit {
            return Err(FsError::StorageFull);
        }
        let len = usize::try_from(len).map_err(|_| FsError::StorageFull)?;
        let extra = len.saturating_sub(self.buffer.len());
        self.buffer
            .try_reserve_exact(extra)
            .map_err(|_| FsError::StorageFull)?;
        self.buffer.resize(len, 0);
        Ok(())
    }
}

#[cfg(test)]
mod test_read_write_seek {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_then_read_back() {
        let mut store = ByteStore::new();
        assert_eq!(store.write_at(0, b"foobarbazqux"), Ok(12));

        let mut buf = vec![0; 12];
        assert_eq!(store.read_at(0, &mut buf), 12);
        assert_eq!(buf, b"foobarbazqux");
    }

    #[test]
    fn test_short_read_at_eof() {
        let store = ByteStore::from_bytes(b"abc".to_vec());

        let mut buf = [0u8; 8];
        assert_eq!(store.read_at(1, &mut buf), 2);
        assert_eq!(&buf[..2], b"bc");
        assert_eq!(store.read_at(3, &mut buf), 0);
        assert_eq!(store.read_at(100, &mut buf), 0);
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let mut store = ByteStore::new();
        assert_eq!(store.write_at(5, b"AB"), Ok(2));
        assert_eq!(store.as_bytes(), b"\0\0\0\0\0AB");
    }

    #[test]
    fn test_overwrite_in_the_middle() {
        let mut store = ByteStore::from_bytes(b"hello world".to_vec());
        store.write_at(6, b"WORLD!!").unwrap();
        assert_eq!(store.as_bytes(), b"hello WORLD!!");
    }

    #[test]
    fn test_set_len_grow_and_shrink() {
        let mut store = ByteStore::from_bytes(b"abcdef".to_vec());

        store.set_len(9).unwrap();
        assert_eq!(store.as_bytes(), b"abcdef\0\0\0");

        store.set_len(2).unwrap();
        assert_eq!(store.as_bytes(), b"ab");

        store.set_len(0).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let mut store = ByteStore::from_bytes(b"ro".to_vec());
        store.set_read_only(true);

        assert_eq!(store.write_at(0, b"x"), Err(FsError::NotOpenForWriting));
        assert_eq!(store.set_len(0), Err(FsError::NotOpenForWriting));
        assert_eq!(store.replace(b"y"), Err(FsError::NotOpenForWriting));
        assert_eq!(store.as_bytes(), b"ro");
    }

    #[test]
    fn test_write_beyond_limit_is_storage_full() {
        let mut store = ByteStore::new();
        assert_eq!(store.write_at(MAX_FILE_SIZE, b"x"), Err(FsError::StorageFull));
        assert_eq!(store.write_at(u64::MAX, b"x"), Err(FsError::StorageFull));
        assert!(store.is_empty());
    }

    #[test]
    fn test_configured_limit_caps_growth() {
        let mut store = ByteStore::with_limit(8);
        assert_eq!(store.write_at(0, b"12345678"), Ok(8));
        assert_eq!(store.write_at(8, b"9"), Err(FsError::StorageFull));
        assert_eq!(store.set_len(9), Err(FsError::StorageFull));
        assert_eq!(store.replace(b"123456789"), Err(FsError::StorageFull));
        assert_eq!(store.as_bytes(), b"12345678");

        store.set_len(4).unwrap();
        assert_eq!(store.as_bytes(), b"1234");
    }

    #[test]
    fn test_huge_gap_does_not_abort() {
        let mut store = ByteStore::with_limit(u64::MAX);
        assert_eq!(store.write_at(u64::MAX - 1, b"x"), Err(FsError::StorageFull));
        assert_eq!(store.set_len(1 << 63), Err(FsError::StorageFull));
        assert!(store.is_empty());
    }
}
