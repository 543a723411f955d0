//! Provis Auth - Identity resolution and authorization
//!
//! This crate provides:
//! - The `IdentityGateway` seam the bootstrap engine depends on
//! - Authorization request and policy models
//! - A JWT and policy-table gateway

pub mod model;
pub mod service;
pub mod traits;

// Re-export commonly used types
pub use model::*;
pub use service::JwtIdentityGateway;
pub use traits::IdentityGateway;
