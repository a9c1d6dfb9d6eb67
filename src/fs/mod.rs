//! Filesystem utilities for joblock.
//!
//! The file-backed store, the config writer, and `init` publish files through
//! atomic writes so readers never observe a half-written table.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
