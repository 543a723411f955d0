//! Bootstrap engine errors
//!
//! Every error returned by the engine names the operation that failed, so
//! callers can tell which phase broke without parsing message text.

use provis_common::error::kind_of;
use provis_common::{CryptoError, ErrorCode, ErrorKind};

/// Engine operation an error is tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    View,
    Update,
    UpdateCert,
    UpdateConnections,
    List,
    Remove,
    Bootstrap,
    ChangeState,
    UpdateChannel,
    RemoveConfig,
    RemoveChannel,
    ConnectThing,
    DisconnectThing,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "failed to add bootstrap configuration",
            Operation::View => "failed to view bootstrap configuration",
            Operation::Update => "failed to update bootstrap configuration",
            Operation::UpdateCert => "failed to update cert",
            Operation::UpdateConnections => "failed to update connections",
            Operation::List => "failed to list bootstrap configurations",
            Operation::Remove => "failed to remove bootstrap configuration",
            Operation::Bootstrap => "failed to read bootstrap configuration",
            Operation::ChangeState => "failed to change state of bootstrap configuration",
            Operation::UpdateChannel => "failed to update channel",
            Operation::RemoveConfig => "failed to remove bootstrap configuration of deleted thing",
            Operation::RemoveChannel => "failed to remove channel",
            Operation::ConnectThing => "failed to connect thing",
            Operation::DisconnectThing => "failed to disconnect thing",
        }
    }

    /// Tag a failure with this operation
    pub fn err(self, failure: impl Into<Failure>) -> BootstrapError {
        BootstrapError {
            operation: self,
            failure: failure.into(),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What went wrong inside an operation
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("authentication failed")]
    Authentication,

    #[error("authorization failed")]
    Authorization,

    /// The things service failed or rejected a side effect. Registry detail
    /// is logged, not carried.
    #[error("failed to receive response from Things service")]
    Things,

    #[error("failed to get bootstrap configuration for given external key")]
    ExternalKey,

    #[error("failed to get bootstrap configuration for given encrypted external key")]
    ExternalKeySecure(#[source] CryptoError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Failure::Authentication | Failure::ExternalKey => ErrorKind::Authentication,
            Failure::Authorization => ErrorKind::Authorization,
            Failure::Things => ErrorKind::RemoteFailure,
            Failure::ExternalKeySecure(_) => ErrorKind::Decryption,
            Failure::Other(err) => kind_of(err).unwrap_or(ErrorKind::Internal),
        }
    }
}

/// Error returned by every engine operation
#[derive(Debug, thiserror::Error)]
#[error("{operation}: {failure}")]
pub struct BootstrapError {
    pub operation: Operation,
    #[source]
    pub failure: Failure,
}

impl BootstrapError {
    pub fn kind(&self) -> ErrorKind {
        self.failure.kind()
    }

    /// Error code reported to API clients
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self.failure {
            Failure::ExternalKey | Failure::ExternalKeySecure(_) => {
                provis_common::error::EXTERNAL_KEY_ERROR
            }
            _ => self.kind().error_code(),
        }
    }

    pub fn is_things(&self) -> bool {
        matches!(self.failure, Failure::Things)
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
