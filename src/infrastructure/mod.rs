//! Adapters for the domain ports: storage backends and audit sinks.

pub mod audit;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
