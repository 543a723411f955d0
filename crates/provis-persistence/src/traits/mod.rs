//! Persistence traits for the bootstrap config storage layer

pub mod config;

pub use config::ConfigPersistence;
