//! In-memory persistence backend
//!
//! Every operation takes a single lock over the whole state, so multi-step
//! writes (config + channel cache + connections) commit atomically or not at
//! all. Channels are cached once per domain and shared by every config of
//! that domain referencing them.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use provis_common::{ProvisError, dedup_ids};

use crate::model::{Channel, Config, ConfigsPage, ConnectionRecord, Filter, State};
use crate::traits::ConfigPersistence;

#[derive(Debug, Default)]
struct StoredConfig {
    /// Config without channels; they are resolved from the cache on read
    config: Config,
    connections: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    configs: HashMap<String, StoredConfig>,
    /// Keyed by (domain_id, channel_id)
    channels: HashMap<(String, String), Channel>,
    /// Keyed by (thing_id, channel_id)
    links: HashMap<(String, String), ConnectionRecord>,
}

fn channel_key(domain_id: &str, channel_id: &str) -> (String, String) {
    (domain_id.to_string(), channel_id.to_string())
}

impl MemoryState {
    fn channel(&self, domain_id: &str, channel_id: &str) -> Option<&Channel> {
        self.channels.get(&channel_key(domain_id, channel_id))
    }

    fn assemble(&self, stored: &StoredConfig) -> Config {
        let mut config = stored.config.clone();
        config.channels = stored
            .connections
            .iter()
            .filter_map(|id| self.channel(&stored.config.domain_id, id).cloned())
            .collect();
        config
    }

    fn owned(&self, domain_id: &str, id: &str) -> anyhow::Result<&StoredConfig> {
        self.configs
            .get(id)
            .filter(|stored| stored.config.domain_id == domain_id)
            .ok_or_else(|| ProvisError::not_found(format!("config {}", id)).into())
    }

    fn owned_mut(&mut self, domain_id: &str, id: &str) -> anyhow::Result<&mut StoredConfig> {
        self.configs
            .get_mut(id)
            .filter(|stored| stored.config.domain_id == domain_id)
            .ok_or_else(|| ProvisError::not_found(format!("config {}", id)).into())
    }

    /// Validate that every connection resolves to a cached or pending channel
    fn resolve_connections(
        &self,
        domain_id: &str,
        connections: &[String],
        pending: &[Channel],
    ) -> anyhow::Result<Vec<String>> {
        let pending: HashSet<&str> = pending.iter().map(|ch| ch.id.as_str()).collect();
        let connections = dedup_ids(connections);
        if let Some(missing) = connections
            .iter()
            .find(|id| self.channel(domain_id, id).is_none() && !pending.contains(id.as_str()))
        {
            return Err(ProvisError::MalformedEntity(format!("unknown channel {}", missing)).into());
        }
        Ok(connections)
    }

    /// Cache channels under `domain_id`, replacing older copies
    fn cache_channels(&mut self, domain_id: &str, channels: Vec<Channel>) {
        for mut channel in channels {
            if channel.domain_id.is_empty() {
                channel.domain_id = domain_id.to_string();
            }
            self.channels.insert(channel_key(domain_id, &channel.id), channel);
        }
    }

    fn record_link(&mut self, channel_id: &str, thing_id: &str, connected: bool) {
        if !self.configs.contains_key(thing_id) {
            debug!(thing_id, channel_id, "No bootstrap config for thing, ignoring link event");
            return;
        }
        self.links.insert(
            (thing_id.to_string(), channel_id.to_string()),
            ConnectionRecord {
                channel_id: channel_id.to_string(),
                thing_id: thing_id.to_string(),
                connected,
                updated_at: chrono::Utc::now(),
            },
        );
    }
}

/// In-memory config store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    state: RwLock<MemoryState>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored configs
    pub fn len(&self) -> usize {
        self.state.read().configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached copy of a channel in any domain, if any
    pub fn cached_channel(&self, id: &str) -> Option<Channel> {
        self.state
            .read()
            .channels
            .values()
            .find(|channel| channel.id == id)
            .cloned()
    }

    /// Cached copy of a channel as seen by `domain_id`
    pub fn cached_channel_in(&self, domain_id: &str, id: &str) -> Option<Channel> {
        self.state.read().channel(domain_id, id).cloned()
    }
}

#[async_trait]
impl ConfigPersistence for MemoryConfigStore {
    async fn save(&self, mut config: Config, connections: &[String]) -> anyhow::Result<String> {
        if config.thing_id.is_empty() {
            return Err(ProvisError::IllegalArgument("thing id is empty".to_string()).into());
        }

        let mut state = self.state.write();
        if state.configs.contains_key(&config.thing_id) {
            return Err(ProvisError::conflict(format!("config {}", config.thing_id)).into());
        }
        if !config.external_id.is_empty()
            && state
                .configs
                .values()
                .any(|stored| stored.config.external_id == config.external_id)
        {
            return Err(
                ProvisError::conflict(format!("external id {}", config.external_id)).into(),
            );
        }

        let channels = std::mem::take(&mut config.channels);
        let connections = state.resolve_connections(&config.domain_id, connections, &channels)?;
        state.cache_channels(&config.domain_id, channels);

        let thing_id = config.thing_id.clone();
        state.configs.insert(
            thing_id.clone(),
            StoredConfig {
                config,
                connections,
            },
        );

        Ok(thing_id)
    }

    async fn retrieve_by_id(&self, domain_id: &str, id: &str) -> anyhow::Result<Config> {
        let state = self.state.read();
        let stored = state.owned(domain_id, id)?;
        Ok(state.assemble(stored))
    }

    async fn retrieve_all(
        &self,
        domain_id: &str,
        thing_ids: &[String],
        filter: &Filter,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<ConfigsPage> {
        let state = self.state.read();
        let allowed: HashSet<&str> = thing_ids.iter().map(String::as_str).collect();

        let mut matching: Vec<&StoredConfig> = state
            .configs
            .values()
            .filter(|stored| stored.config.domain_id == domain_id)
            .filter(|stored| allowed.is_empty() || allowed.contains(stored.config.thing_id.as_str()))
            .filter(|stored| filter.matches(&stored.config))
            .collect();
        matching.sort_by(|a, b| a.config.thing_id.cmp(&b.config.thing_id));

        let configs = matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|stored| state.assemble(stored))
            .collect();

        Ok(ConfigsPage {
            total: matching.len() as u64,
            offset,
            limit,
            configs,
        })
    }

    async fn retrieve_by_external_id(&self, external_id: &str) -> anyhow::Result<Config> {
        let state = self.state.read();
        if external_id.is_empty() {
            return Err(ProvisError::not_found("empty external id").into());
        }
        state
            .configs
            .values()
            .find(|stored| stored.config.external_id == external_id)
            .map(|stored| state.assemble(stored))
            .ok_or_else(|| ProvisError::not_found(format!("external id {}", external_id)).into())
    }

    async fn update(&self, config: Config) -> anyhow::Result<()> {
        let mut state = self.state.write();
        let stored = state.owned_mut(&config.domain_id, &config.thing_id)?;
        stored.config.name = config.name;
        stored.config.content = config.content;
        Ok(())
    }

    async fn update_cert(
        &self,
        domain_id: &str,
        thing_id: &str,
        client_cert: &str,
        client_key: &str,
        ca_cert: &str,
    ) -> anyhow::Result<Config> {
        let mut state = self.state.write();
        let stored = state.owned_mut(domain_id, thing_id)?;
        stored.config.client_cert = client_cert.to_string();
        stored.config.client_key = client_key.to_string();
        stored.config.ca_cert = ca_cert.to_string();

        let state = parking_lot::RwLockWriteGuard::downgrade(state);
        let stored = state.owned(domain_id, thing_id)?;
        Ok(state.assemble(stored))
    }

    async fn update_connections(
        &self,
        domain_id: &str,
        id: &str,
        channels: Vec<Channel>,
        connections: &[String],
    ) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.owned(domain_id, id)?;
        let connections = state.resolve_connections(domain_id, connections, &channels)?;

        state.cache_channels(domain_id, channels);
        state.owned_mut(domain_id, id)?.connections = connections;
        Ok(())
    }

    async fn remove(&self, domain_id: &str, id: &str) -> anyhow::Result<()> {
        let mut state = self.state.write();
        if state.owned(domain_id, id).is_ok() {
            state.configs.remove(id);
            state.links.retain(|(thing_id, _), _| thing_id != id);
        }
        Ok(())
    }

    async fn change_state(&self, domain_id: &str, id: &str, new_state: State) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.owned_mut(domain_id, id)?.config.state = new_state;
        Ok(())
    }

    async fn list_existing(&self, domain_id: &str, ids: &[String]) -> anyhow::Result<Vec<Channel>> {
        let state = self.state.read();
        Ok(dedup_ids(ids)
            .iter()
            .filter_map(|id| state.channel(domain_id, id))
            .cloned()
            .collect())
    }

    async fn remove_thing(&self, id: &str) -> anyhow::Result<()> {
        let mut state = self.state.write();
        if state.configs.remove(id).is_some() {
            state.links.retain(|(thing_id, _), _| thing_id != id);
            debug!(thing_id = id, "Removed config of deleted thing");
        }
        Ok(())
    }

    async fn update_channel(&self, channel: Channel) -> anyhow::Result<()> {
        let mut state = self.state.write();
        let updated_at = channel.updated_at.or_else(|| Some(chrono::Utc::now()));
        let mut found = false;
        for cached in state.channels.values_mut().filter(|cached| cached.id == channel.id) {
            cached.name = channel.name.clone();
            cached.metadata = channel.metadata.clone();
            cached.description = channel.description.clone();
            cached.updated_at = updated_at;
            cached.updated_by = channel.updated_by.clone();
            found = true;
        }
        if !found {
            debug!(channel_id = %channel.id, "Channel not cached, ignoring update");
        }
        Ok(())
    }

    async fn remove_channel(&self, id: &str) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.channels.retain(|(_, channel_id), _| channel_id != id);
        for stored in state.configs.values_mut() {
            stored.connections.retain(|channel_id| channel_id != id);
        }
        state.links.retain(|(_, channel_id), _| channel_id != id);
        Ok(())
    }

    async fn connect_thing(&self, channel_id: &str, thing_id: &str) -> anyhow::Result<()> {
        self.state.write().record_link(channel_id, thing_id, true);
        Ok(())
    }

    async fn disconnect_thing(&self, channel_id: &str, thing_id: &str) -> anyhow::Result<()> {
        self.state.write().record_link(channel_id, thing_id, false);
        Ok(())
    }

    async fn connection_record(
        &self,
        channel_id: &str,
        thing_id: &str,
    ) -> anyhow::Result<Option<ConnectionRecord>> {
        Ok(self
            .state
            .read()
            .links
            .get(&(thing_id.to_string(), channel_id.to_string()))
            .cloned())
    }
}
