//! The socket calls of the guest library. They share the `wasi` import
//! module and errno space with the filesystem calls.

mod sock_accept;
mod sock_close;
mod sock_connect;
mod sock_open;
mod sock_recv;
mod sock_resolve;
mod sock_send;
mod sock_shutdown;

pub use sock_accept::*;
pub use sock_close::*;
pub use sock_connect::*;
pub use sock_open::*;
pub use sock_recv::*;
pub use sock_resolve::*;
pub use sock_send::*;
pub use sock_shutdown::*;

use crate::syscalls::*;
