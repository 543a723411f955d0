//! Provis Persistence - Bootstrap config model and storage
//!
//! This crate provides:
//! - Domain model types for bootstrap configs and cached channels
//! - The `ConfigPersistence` trait every storage backend implements
//! - An in-memory backend

pub mod memory;
pub mod model;
pub mod traits;

// Re-export persistence traits
pub use traits::ConfigPersistence;

// Re-export in-memory backend
pub use memory::MemoryConfigStore;

// Re-export model types
pub use model::{
    Channel, Config, ConfigsPage, ConnectionRecord, Filter, Metadata, State, channel_ids,
};
