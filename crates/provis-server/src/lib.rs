//! Provis Server - process wiring for the bootstrap engine
//!
//! This crate provides:
//! - Configuration loading from file, environment and command line
//! - Logging initialisation
//! - Construction of the bootstrap service and the event loop feeding it

pub mod model;
pub mod startup;
