//! Sealbox Common - Shared types and utilities
//!
//! This crate provides common types, error definitions, and configuration
//! used across all Sealbox components.

pub mod config;
pub mod error;
pub mod types;

pub use config::NamespaceStoreConfig;
pub use error::{Error, Result};
pub use types::*;
