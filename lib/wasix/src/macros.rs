//! Macros to simplify some common WASI-specific tasks.

/// Like the `try!` macro or `?` syntax: returns the value if the computation
/// succeeded or returns the error value.
macro_rules! wasi_try {
    ($expr:expr) => {{
        let res: Result<_, wasmbox_wasi_types::Errno> = $expr;
        match res {
            Ok(val) => val,
            Err(err) => {
                tracing::debug!("wasi::wasi_try::err: {:?}", err);
                return err;
            }
        }
    }};
}

/// Like `wasi_try` but converts a filesystem error first.
macro_rules! wasi_try_fs {
    ($expr:expr) => {{
        wasi_try!($expr.map_err($crate::syscalls::fs_error_into_wasi_err))
    }};
}

/// Like `wasi_try` but converts a socket error first.
macro_rules! wasi_try_net {
    ($expr:expr) => {{
        wasi_try!($expr.map_err($crate::syscalls::net_error_into_wasi_err))
    }};
}

/// Like `wasi_try` but converts a `MemoryAccessError` to a `wasi::Errno`.
macro_rules! wasi_try_mem {
    ($expr:expr) => {{
        wasi_try!($expr.map_err($crate::mem_error_to_wasi))
    }};
}
