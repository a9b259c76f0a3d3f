//! The per-session context handed to every syscall.
//!
//! There is no global state: each [`WasiEnv`] owns its own tree, handle table
//! and socket table, so independent sessions can live side by side in one
//! host process.

mod builder;
mod env;

pub use self::builder::{WasiEnvBuilder, WasiStateCreationError};
pub use self::env::WasiEnv;
