//! The `wasi_snapshot_preview1` filesystem calls.

mod fd_close;
mod fd_fdstat_get;
mod fd_filestat_get;
mod fd_filestat_set_size;
mod fd_prestat_dir_name;
mod fd_prestat_get;
mod fd_read;
mod fd_readdir;
mod fd_seek;
mod fd_tell;
mod fd_write;
mod path_create_directory;
mod path_filestat_get;
mod path_open;
mod path_readlink;
mod path_remove_directory;
mod path_unlink_file;

pub use fd_close::*;
pub use fd_fdstat_get::*;
pub use fd_filestat_get::*;
pub use fd_filestat_set_size::*;
pub use fd_prestat_dir_name::*;
pub use fd_prestat_get::*;
pub use fd_read::*;
pub use fd_readdir::*;
pub use fd_seek::*;
pub use fd_tell::*;
pub use fd_write::*;
pub use path_create_directory::*;
pub use path_filestat_get::*;
pub use path_open::*;
pub use path_readlink::*;
pub use path_remove_directory::*;
pub use path_unlink_file::*;

use crate::syscalls::*;
