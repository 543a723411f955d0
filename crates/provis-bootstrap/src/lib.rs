//! Provis Bootstrap - Config lifecycle and connection reconciliation
//!
//! This crate provides:
//! - `BootstrapService`: provisioning, connection and state operations
//! - Channel-set reconciliation
//! - Device-facing config rendering
//! - Consumption of things service lifecycle events

pub mod error;
pub mod events;
pub mod reader;
pub mod reconciler;
pub mod service;

pub use error::{BootstrapError, BootstrapResult, Failure, Operation};
pub use events::{EventConsumer, ThingsEvent};
pub use reader::{BootstrapResponse, ConfigReader, ConfigResponse, JsonConfigReader};
pub use reconciler::ChannelDiff;
pub use service::BootstrapService;
