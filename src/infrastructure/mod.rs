//! Adapters implementing the domain ports.

pub mod authorizer;
pub mod in_memory;
pub mod record;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
