//! Config persistence trait
//!
//! Defines the interface for bootstrap config storage operations. Missing
//! entities are reported as `ProvisError::NotFound`, duplicates as
//! `ProvisError::Conflict`, wrapped in the returned `anyhow::Error`.

use async_trait::async_trait;

use crate::model::{Channel, Config, ConfigsPage, ConnectionRecord, Filter, State};

/// Bootstrap config persistence operations
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    /// Persist a new config together with its connection list.
    ///
    /// `config.channels` holds channels not cached yet; `connections` is the
    /// full list of connected channel ids. Returns the saved thing id.
    async fn save(&self, config: Config, connections: &[String]) -> anyhow::Result<String>;

    /// Retrieve a config by thing id within a domain
    async fn retrieve_by_id(&self, domain_id: &str, id: &str) -> anyhow::Result<Config>;

    /// List configs of a domain, optionally restricted to the given thing ids
    async fn retrieve_all(
        &self,
        domain_id: &str,
        thing_ids: &[String],
        filter: &Filter,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<ConfigsPage>;

    /// Retrieve a config by its external id, regardless of domain
    async fn retrieve_by_external_id(&self, external_id: &str) -> anyhow::Result<Config>;

    /// Update the editable fields (name and content) of a config
    async fn update(&self, config: Config) -> anyhow::Result<()>;

    /// Replace the certificate fields of a config and return the result
    async fn update_cert(
        &self,
        domain_id: &str,
        thing_id: &str,
        client_cert: &str,
        client_key: &str,
        ca_cert: &str,
    ) -> anyhow::Result<Config>;

    /// Cache `channels` and replace the config's connection list atomically
    async fn update_connections(
        &self,
        domain_id: &str,
        id: &str,
        channels: Vec<Channel>,
        connections: &[String],
    ) -> anyhow::Result<()>;

    /// Remove a config
    async fn remove(&self, domain_id: &str, id: &str) -> anyhow::Result<()>;

    /// Change the state of a config
    async fn change_state(&self, domain_id: &str, id: &str, state: State) -> anyhow::Result<()>;

    /// Return the cached channels among `ids`
    async fn list_existing(&self, domain_id: &str, ids: &[String]) -> anyhow::Result<Vec<Channel>>;

    // Event-driven mutators. These bypass domain scoping.

    /// Remove the config owning the given thing
    async fn remove_thing(&self, id: &str) -> anyhow::Result<()>;

    /// Overwrite the cached copy of a channel
    async fn update_channel(&self, channel: Channel) -> anyhow::Result<()>;

    /// Drop a channel from the cache and from every config
    async fn remove_channel(&self, id: &str) -> anyhow::Result<()>;

    /// Record that the things service connected the thing to the channel
    async fn connect_thing(&self, channel_id: &str, thing_id: &str) -> anyhow::Result<()>;

    /// Record that the things service disconnected the thing from the channel
    async fn disconnect_thing(&self, channel_id: &str, thing_id: &str) -> anyhow::Result<()>;

    /// Read the connection record of a thing/channel pair
    async fn connection_record(
        &self,
        channel_id: &str,
        thing_id: &str,
    ) -> anyhow::Result<Option<ConnectionRecord>>;
}
