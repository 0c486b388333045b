//! # Persistent Storage Backends
//!
//! Disk-backed implementations of [`RelationshipStore`](crate::RelationshipStore).

pub mod redb_store;

pub use redb_store::RedbStore;
