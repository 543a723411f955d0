//! Provis Common - Shared types, errors, and utilities
//!
//! This crate provides the foundational types used across all Provis components:
//! - Error taxonomy and error codes
//! - External key encryption
//! - Id generation

pub mod crypto;
pub mod error;
pub mod utils;

// Re-exports for convenience
pub use crypto::{CryptoError, CryptoResult, ExternalKeyCipher};
pub use error::{ErrorCode, ErrorKind, ProvisError};
pub use utils::{IdProvider, UuidProvider, dedup_ids};
