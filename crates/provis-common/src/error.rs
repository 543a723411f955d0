//! Error types and error codes for Provis
//!
//! This module defines:
//! - `ProvisError`: Application-specific error enum shared by all collaborators
//! - `ErrorKind`: The coarse failure taxonomy callers branch on
//! - `ErrorCode`: Structured error codes for API responses

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Application-specific error types
///
/// Collaborator traits return `anyhow::Result` and signal typed conditions by
/// wrapping one of these variants. Use [`find_in`] or [`kind_of`] to recover
/// it from an error chain.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisError {
    #[error("authentication failed")]
    Authentication,

    #[error("authorization failed")]
    Authorization,

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("entity already exists: {0}")]
    Conflict(String),

    #[error("remote service error: {0}")]
    RemoteFailure(String),

    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    RemoteFailure,
    MalformedEntity,
    Decryption,
    IllegalArgument,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RemoteFailure => "remote_failure",
            ErrorKind::MalformedEntity => "malformed_entity",
            ErrorKind::Decryption => "decryption",
            ErrorKind::IllegalArgument => "illegal_argument",
            ErrorKind::Internal => "internal",
        }
    }

    /// Error code reported to API clients for this kind
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            ErrorKind::Authentication => AUTHENTICATION_FAILED,
            ErrorKind::Authorization => ACCESS_DENIED,
            ErrorKind::NotFound => RESOURCE_NOT_FOUND,
            ErrorKind::Conflict => RESOURCE_CONFLICT,
            ErrorKind::RemoteFailure => THINGS_SERVICE_ERROR,
            ErrorKind::MalformedEntity => MALFORMED_ENTITY,
            ErrorKind::Decryption => EXTERNAL_KEY_ERROR,
            ErrorKind::IllegalArgument => PARAMETER_VALIDATE_ERROR,
            ErrorKind::Internal => SERVER_ERROR,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ProvisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisError::Authentication => ErrorKind::Authentication,
            ProvisError::Authorization => ErrorKind::Authorization,
            ProvisError::NotFound(_) => ErrorKind::NotFound,
            ProvisError::Conflict(_) => ErrorKind::Conflict,
            ProvisError::RemoteFailure(_) => ErrorKind::RemoteFailure,
            ProvisError::MalformedEntity(_) => ErrorKind::MalformedEntity,
            ProvisError::Decryption(_) => ErrorKind::Decryption,
            ProvisError::IllegalArgument(_) => ErrorKind::IllegalArgument,
            ProvisError::Database(_) | ProvisError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        ProvisError::NotFound(entity.into())
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        ProvisError::Conflict(entity.into())
    }
}

/// Find the first `ProvisError` anywhere in an error chain
pub fn find_in(err: &anyhow::Error) -> Option<&ProvisError> {
    // downcast_ref on the handle also sees context values, chain() only sources
    err.downcast_ref::<ProvisError>()
        .or_else(|| err.chain().find_map(|e| e.downcast_ref::<ProvisError>()))
}

/// Classify an error chain, if it carries a `ProvisError`
pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
    find_in(err).map(ProvisError::kind)
}

/// Whether the chain reports a missing entity
pub fn is_not_found(err: &anyhow::Error) -> bool {
    kind_of(err) == Some(ErrorKind::NotFound)
}

/// Whether the chain reports a duplicate / already-in-state entity
pub fn is_conflict(err: &anyhow::Error) -> bool {
    kind_of(err) == Some(ErrorKind::Conflict)
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const AUTHENTICATION_FAILED: ErrorCode<'static> = ErrorCode {
    code: 10003,
    message: "authentication failed",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const MALFORMED_ENTITY: ErrorCode<'static> = ErrorCode {
    code: 20006,
    message: "malformed entity specification",
};

pub const EXTERNAL_KEY_ERROR: ErrorCode<'static> = ErrorCode {
    code: 24000,
    message: "invalid external key",
};

pub const THINGS_SERVICE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 24001,
    message: "failed to receive response from Things service",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
