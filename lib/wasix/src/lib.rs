//! Wasmbox's host-side WASI implementation
//!
//! A [`WasiEnv`] is one guest session: an in-memory filesystem tree with its
//! handle table, any passthrough mounts of real host directories, and a
//! socket proxy. Build one with [`WasiEnvBuilder`], then answer the guest's
//! imports by calling the functions in [`syscalls`] with the session and a
//! view of the guest's linear memory.
//!
//! ```
//! use wasmbox_wasix::{syscalls, WasiEnv};
//! use wasmbox_wasix::types::Errno;
//!
//! let mut env = WasiEnv::builder()
//!     .file("/lib/hello.txt", b"hi".to_vec())
//!     .build()
//!     .unwrap();
//! assert!(env.fs.exists("/lib/hello.txt"));
//!
//! // The first mount always lands on handle 3.
//! let mut memory = vec![0u8; 64];
//! assert_eq!(syscalls::fd_prestat_get(&mut env, &mut memory, 3, 0), Errno::Success);
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
mod macros;
mod config;
pub mod fs;
mod memory;
mod state;
pub mod syscalls;

pub use wasmbox_wasi_types as types;
pub use virtual_fs;
pub use virtual_fs::FsError;
pub use virtual_net;
pub use virtual_net::{
    LocalNetworking, NetworkError, SocketTable, UnsupportedNetworking, VirtualNetworking,
};

pub use crate::config::{ConfigError, PassthroughMount, WasiConfig};
pub use crate::fs::{CaptureBuffer, WasiFs};
pub use crate::memory::{GuestMemory, MemoryAccessError};
pub use crate::state::{WasiEnv, WasiEnvBuilder, WasiStateCreationError};
pub use crate::syscalls::{fs_error_into_wasi_err, net_error_into_wasi_err};

use wasmbox_wasi_types::Errno;

/// Guest linear-memory address.
pub type WasmPtr = u32;

/// Convert memory access error to WASI error
pub fn mem_error_to_wasi(err: MemoryAccessError) -> Errno {
    match err {
        MemoryAccessError::HeapOutOfBounds => Errno::Fault,
        MemoryAccessError::Overflow => Errno::Overflow,
        MemoryAccessError::NonUtf8String => Errno::Inval,
    }
}
