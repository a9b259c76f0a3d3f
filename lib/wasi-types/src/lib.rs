#![deny(unused_mut)]
#![allow(clippy::identity_op)]

//! Wasmbox's WASI types implementation.
//!
//! Scalar types, flag sets and the exact binary records shared by the
//! virtual filesystem, the socket proxy and the syscall bridge in
//! `wasmbox-wasix`.

mod errno;
pub mod layout;
pub mod net;
mod types;

pub use errno::Errno;
pub use layout::*;
pub use net::{AddressFamily, SockType, WIRE_ADDR_SIZE};
pub use types::*;
