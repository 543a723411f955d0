//! In-memory things registry

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use provis_common::ProvisError;

use crate::model::{Channel, Connection, Credentials, Thing};
use crate::traits::ThingsRegistry;

/// Things registry held in process memory
///
/// Tokens are not checked.
#[derive(Debug, Default)]
pub struct MemoryThingsRegistry {
    things: DashMap<String, Thing>,
    channels: DashMap<String, Channel>,
    connections: DashSet<Connection>,
}

impl MemoryThingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_thing(&self, thing: Thing) {
        self.things.insert(thing.id.clone(), thing);
    }

    pub fn add_channel(&self, channel: Channel) {
        self.channels.insert(channel.id.clone(), channel);
    }

    pub fn remove_channel(&self, id: &str) {
        self.channels.remove(id);
        self.connections.retain(|conn| conn.channel_id != id);
    }

    pub fn has_thing(&self, id: &str) -> bool {
        self.things.contains_key(id)
    }

    pub fn is_connected(&self, channel_id: &str, thing_id: &str) -> bool {
        self.connections
            .contains(&Connection::new(channel_id, thing_id))
    }

    /// Channel ids the thing is connected to, sorted
    pub fn connected_channels(&self, thing_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .connections
            .iter()
            .filter(|conn| conn.thing_id == thing_id)
            .map(|conn| conn.channel_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ThingsRegistry for MemoryThingsRegistry {
    async fn create_thing(&self, mut thing: Thing, _token: &str) -> anyhow::Result<Thing> {
        if thing.id.is_empty() {
            thing.id = uuid::Uuid::new_v4().to_string();
        }
        if self.things.contains_key(&thing.id) {
            return Err(ProvisError::conflict(format!("thing {}", thing.id)).into());
        }
        if thing.credentials.secret.is_empty() {
            thing.credentials = Credentials {
                identity: thing.id.clone(),
                secret: uuid::Uuid::new_v4().to_string(),
            };
        }

        self.things.insert(thing.id.clone(), thing.clone());
        Ok(thing)
    }

    async fn thing(&self, id: &str, _token: &str) -> anyhow::Result<Thing> {
        self.things
            .get(id)
            .map(|thing| thing.value().clone())
            .ok_or_else(|| ProvisError::not_found(format!("thing {}", id)).into())
    }

    async fn delete_thing(&self, id: &str, _token: &str) -> anyhow::Result<()> {
        if self.things.remove(id).is_none() {
            return Err(ProvisError::not_found(format!("thing {}", id)).into());
        }
        self.connections.retain(|conn| conn.thing_id != id);
        Ok(())
    }

    async fn channel(&self, id: &str, _token: &str) -> anyhow::Result<Channel> {
        self.channels
            .get(id)
            .map(|channel| channel.value().clone())
            .ok_or_else(|| ProvisError::not_found(format!("channel {}", id)).into())
    }

    async fn connect(&self, connection: &Connection, _token: &str) -> anyhow::Result<()> {
        if !self.things.contains_key(&connection.thing_id) {
            return Err(ProvisError::not_found(format!("thing {}", connection.thing_id)).into());
        }
        if !self.channels.contains_key(&connection.channel_id) {
            return Err(
                ProvisError::not_found(format!("channel {}", connection.channel_id)).into(),
            );
        }
        if !self.connections.insert(connection.clone()) {
            return Err(ProvisError::conflict(format!(
                "connection {}/{}",
                connection.channel_id, connection.thing_id
            ))
            .into());
        }
        Ok(())
    }

    async fn disconnect_thing(
        &self,
        thing_id: &str,
        channel_id: &str,
        _token: &str,
    ) -> anyhow::Result<()> {
        match self.connections.remove(&Connection::new(channel_id, thing_id)) {
            Some(_) => Ok(()),
            None => Err(
                ProvisError::not_found(format!("connection {}/{}", channel_id, thing_id)).into(),
            ),
        }
    }
}
