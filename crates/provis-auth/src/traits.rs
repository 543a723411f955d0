//! Identity gateway trait

use async_trait::async_trait;

use crate::model::{AuthorizeRequest, Identity, ListObjectsRequest};

/// Resolves caller tokens and answers authorization questions
///
/// Implementations report an invalid token as `ProvisError::Authentication`.
/// A denied permission is `Ok(false)`, not an error.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Resolve a token to the caller's user and domain
    async fn identify(&self, token: &str) -> anyhow::Result<Identity>;

    /// Check a single permission
    async fn authorize(&self, request: &AuthorizeRequest) -> anyhow::Result<bool>;

    /// Ids of every object the subject holds the permission on
    async fn list_all_objects(&self, request: &ListObjectsRequest) -> anyhow::Result<Vec<String>>;
}
