use super::*;
use crate::fs::dirent_type;
use crate::syscalls::*;

/// ### `fd_readdir()`
/// Read data from directory specified by file descriptor
/// Inputs:
/// - `Fd fd`
///     File descriptor from which directory data will be read
/// - `void *buf`
///     Buffer where directory entries are stored
/// - `u32 buf_len`
///     Length of data in `buf`
/// - `Dircookie cookie`
///     Where the directory reading should start from
/// Output:
/// - `u32 *bufused`
///     The Number of bytes stored in `buf`; if less than `buf_len` then entire
///     directory has been read
///
/// Only whole entries are written. When more entries remain than fit, the
/// unused tail is zeroed and `bufused` equals `buf_len`. If even the first
/// entry does not fit, its leading bytes fill the buffer so the caller can
/// retry with a larger one.
#[instrument(level = "trace", skip_all, fields(%fd, %cookie, bufused = field::Empty), ret)]
pub fn fd_readdir<M: GuestMemory + ?Sized>(
    env: &mut WasiEnv,
    memory: &mut M,
    fd: WasiFd,
    buf: WasmPtr,
    buf_len: u32,
    cookie: u64,
    bufused: WasmPtr,
) -> Errno {
    if (buf_len as usize) < DIRENT_SIZE {
        return Errno::Inval;
    }
    if buf as u64 + buf_len as u64 > memory.size() {
        return Errno::Fault;
    }
    if env.is_socket(fd) {
        return Errno::Notdir;
    }
    let entries = wasi_try_fs!(env.fs.readdir_from(fd, cookie));

    let out = encode_dirents(&entries, cookie, buf_len as usize);
    Span::current().record("bufused", out.len());
    wasi_try_mem!(memory.write(buf as u64, &out));
    wasi_try_mem!(memory.write_u32(bufused as u64, out.len() as u32));
    Errno::Success
}

fn encode_dirents(entries: &[virtual_fs::DirEntry], cookie: u64, capacity: usize) -> Vec<u8> {
    let needed: usize = entries
        .iter()
        .map(|entry| DIRENT_SIZE + entry.name.len())
        .sum();
    let mut out = Vec::with_capacity(needed.min(capacity));
    let mut more = false;

    for (index, entry) in entries.iter().enumerate() {
        let name = entry.name.as_bytes();
        let dirent = Dirent {
            d_next: cookie.saturating_add(index as u64 + 1),
            d_ino: entry.ino,
            d_namlen: name.len() as u32,
            d_type: dirent_type(entry),
        };
        let header = dirent_to_le_bytes(&dirent);

        if out.len() + DIRENT_SIZE + name.len() > capacity {
            if out.is_empty() {
                let mut record = header.to_vec();
                record.extend_from_slice(name);
                record.truncate(capacity);
                out = record;
            }
            more = true;
            break;
        }
        out.extend_from_slice(&header);
        out.extend_from_slice(name);
    }

    if more {
        out.resize(capacity, 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtual_fs::{DirEntry, FileType};

    fn entry(name: &str) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            ino: 7,
            ft: FileType::new_file(),
        }
    }

    #[test]
    fn whole_entries_then_zero_fill() {
        // 24 + 3 bytes each
        let entries = vec![entry("one"), entry("two"), entry("six")];
        let out = encode_dirents(&entries, 0, 60);

        assert_eq!(out.len(), 60);
        assert_eq!(&out[24..27], b"one");
        assert_eq!(&out[51..54], b"two");
        assert!(out[54..].iter().all(|b| *b == 0));
        // The second record resumes at cookie 2.
        assert_eq!(out[27], 2);
    }

    #[test]
    fn last_page_is_short() {
        let entries = vec![entry("one")];
        let out = encode_dirents(&entries, 4, 100);
        assert_eq!(out.len(), 27);
        assert_eq!(out[0], 5);
        assert_eq!(out[20], u8::from(Filetype::RegularFile));
    }

    #[test]
    fn oversized_first_entry_fills_the_buffer() {
        let long = "x".repeat(40);
        let out = encode_dirents(&[entry(&long)], 0, 32);
        assert_eq!(out.len(), 32);
        assert_eq!(out[16], 40);
        assert_eq!(&out[24..], b"xxxxxxxx");
    }
}
