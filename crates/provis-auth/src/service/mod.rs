//! Identity gateway implementations

pub mod gateway;
pub mod token;

pub use gateway::JwtIdentityGateway;
