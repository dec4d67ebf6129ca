//! Adapters implementing the domain ports.

pub mod email;
pub mod in_memory;
pub mod jwt;
pub mod notifier;
pub mod password;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod staging;
