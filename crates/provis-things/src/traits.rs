//! Things registry trait

use async_trait::async_trait;

use crate::model::{Channel, Connection, Thing};

/// Remote service owning things, channels and their connections
///
/// Every call carries the caller's token. Missing entities or links are
/// reported as `ProvisError::NotFound`, an existing connection as
/// `ProvisError::Conflict`, anything else as `ProvisError::RemoteFailure`.
#[async_trait]
pub trait ThingsRegistry: Send + Sync {
    async fn create_thing(&self, thing: Thing, token: &str) -> anyhow::Result<Thing>;

    async fn thing(&self, id: &str, token: &str) -> anyhow::Result<Thing>;

    async fn delete_thing(&self, id: &str, token: &str) -> anyhow::Result<()>;

    async fn channel(&self, id: &str, token: &str) -> anyhow::Result<Channel>;

    async fn connect(&self, connection: &Connection, token: &str) -> anyhow::Result<()>;

    async fn disconnect_thing(
        &self,
        thing_id: &str,
        channel_id: &str,
        token: &str,
    ) -> anyhow::Result<()>;
}
