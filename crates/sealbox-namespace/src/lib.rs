//! Sealbox Namespace Store - Hierarchical tenancy boundaries
//!
//! This crate implements the namespace store: creation, lookup, listing,
//! metadata mutation, and deletion of isolated tenancy boundaries arranged
//! in a tree, persisted through a flat key-value backend.

pub mod backend;
pub mod metadata;
pub mod store;

// Re-exports
pub use backend::{MemoryBackend, RedbBackend, StorageBackend};
pub use metadata::MetadataDelta;
pub use store::NamespaceStore;
