//! Provis Things - Client side of the remote things and channels service
//!
//! This crate provides:
//! - The `ThingsRegistry` seam the bootstrap engine depends on
//! - Thing, channel and connection models
//! - An HTTP registry client and an in-memory registry

pub mod client;
pub mod memory;
pub mod model;
pub mod traits;

pub use client::{HttpThingsRegistry, ThingsClientConfig};
pub use memory::MemoryThingsRegistry;
pub use model::{Channel, Connection, Credentials, Thing};
pub use traits::ThingsRegistry;
