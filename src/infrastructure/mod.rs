//! Store backends.
//!
//! `in_memory` is always available; `rocksdb` requires the `storage-rocksdb` feature.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
