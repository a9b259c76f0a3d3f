use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;
use wasmbox_wasi_types::{Iovec, IOVEC_SIZE};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccessError {
    /// The access touches bytes outside of the guest memory.
    #[error("memory access out of bounds")]
    HeapOutOfBounds,
    /// An address calculation overflowed.
    #[error("address calculation overflow")]
    Overflow,
    /// A guest string was not valid UTF-8.
    #[error("string is not valid utf-8")]
    NonUtf8String,
}

/// The guest's linear memory, as far as the syscall bridge needs it.
///
/// Every access is bounds-checked. Integers are little-endian.
pub trait GuestMemory {
    fn size(&self) -> u64;

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError>;

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError>;

    fn read_u32(&self, offset: u64) -> Result<u32, MemoryAccessError> {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf)?;
        Ok(LittleEndian::read_u32(&buf))
    }

    fn write_u32(&mut self, offset: u64, value: u32) -> Result<(), MemoryAccessError> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write(offset, &buf)
    }

    fn write_u64(&mut self, offset: u64, value: u64) -> Result<(), MemoryAccessError> {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.write(offset, &buf)
    }

    fn read_vec(&self, offset: u64, len: u32) -> Result<Vec<u8>, MemoryAccessError> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(MemoryAccessError::Overflow)?;
        if end > self.size() {
            return Err(MemoryAccessError::HeapOutOfBounds);
        }
        let mut buf = vec![0u8; len as usize];
        self.read(offset, &mut buf)?;
        Ok(buf)
    }

    fn read_utf8_string(&self, offset: u64, len: u32) -> Result<String, MemoryAccessError> {
        let bytes = self.read_vec(offset, len)?;
        String::from_utf8(bytes).map_err(|_| MemoryAccessError::NonUtf8String)
    }

    /// Reads `count` consecutive 8-byte iovec records.
    fn read_iovecs(&self, offset: u64, count: u32) -> Result<Vec<Iovec>, MemoryAccessError> {
        let len = count
            .checked_mul(IOVEC_SIZE as u32)
            .ok_or(MemoryAccessError::Overflow)?;
        let raw = self.read_vec(offset, len)?;
        Ok(raw
            .chunks_exact(IOVEC_SIZE)
            .filter_map(|chunk| <&[u8; IOVEC_SIZE]>::try_from(chunk).ok())
            .map(Iovec::from_le_bytes)
            .collect())
    }
}

fn checked_range(size: usize, offset: u64, len: usize) -> Result<std::ops::Range<usize>, MemoryAccessError> {
    let start = usize::try_from(offset).map_err(|_| MemoryAccessError::Overflow)?;
    let end = start.checked_add(len).ok_or(MemoryAccessError::Overflow)?;
    if end > size {
        return Err(MemoryAccessError::HeapOutOfBounds);
    }
    Ok(start..end)
}

impl GuestMemory for [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError> {
        let range = checked_range(self.len(), offset, buf.len())?;
        buf.copy_from_slice(&self[range]);
        Ok(())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError> {
        let range = checked_range(self.len(), offset, data.len())?;
        self[range].copy_from_slice(data);
        Ok(())
    }
}

impl GuestMemory for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError> {
        GuestMemory::read(self.as_slice(), offset, buf)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError> {
        GuestMemory::write(self.as_mut_slice(), offset, data)
    }
}

#[cfg(feature = "wasmer")]
fn from_wasmer(err: wasmer::MemoryAccessError) -> MemoryAccessError {
    #[allow(unreachable_patterns)]
    match err {
        wasmer::MemoryAccessError::Overflow => MemoryAccessError::Overflow,
        wasmer::MemoryAccessError::NonUtf8String => MemoryAccessError::NonUtf8String,
        _ => MemoryAccessError::HeapOutOfBounds,
    }
}

#[cfg(feature = "wasmer")]
impl GuestMemory for wasmer::MemoryView<'_> {
    fn size(&self) -> u64 {
        self.data_size()
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryAccessError> {
        wasmer::MemoryView::read(self, offset, buf).map_err(from_wasmer)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), MemoryAccessError> {
        wasmer::MemoryView::write(self, offset, data).map_err(from_wasmer)
    }
}
