// Registry wrapper counting calls and injecting failures

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use provis_common::ProvisError;
use provis_things::{Channel, Connection, MemoryThingsRegistry, Thing, ThingsRegistry};

#[derive(Debug, Default)]
pub struct Calls {
    pub create_thing: AtomicUsize,
    pub thing: AtomicUsize,
    pub delete_thing: AtomicUsize,
    pub channel: AtomicUsize,
    pub connect: AtomicUsize,
    pub disconnect: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Calls that change links between things and channels
    pub fn link_changes(&self) -> usize {
        Self::get(&self.connect) + Self::get(&self.disconnect)
    }

    pub fn total(&self) -> usize {
        Self::get(&self.create_thing)
            + Self::get(&self.thing)
            + Self::get(&self.delete_thing)
            + Self::get(&self.channel)
            + self.link_changes()
    }
}

/// In-memory registry whose calls can be made to fail per channel
#[derive(Default)]
pub struct FlakyRegistry {
    pub inner: MemoryThingsRegistry,
    pub calls: Calls,
    connect_failures: Mutex<HashMap<String, ProvisError>>,
    disconnect_failures: Mutex<HashMap<String, ProvisError>>,
    channel_failures: Mutex<HashMap<String, ProvisError>>,
    delete_failure: Mutex<Option<ProvisError>>,
}

impl FlakyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self, channel_id: &str, err: ProvisError) {
        self.connect_failures
            .lock()
            .insert(channel_id.to_string(), err);
    }

    pub fn fail_disconnect(&self, channel_id: &str, err: ProvisError) {
        self.disconnect_failures
            .lock()
            .insert(channel_id.to_string(), err);
    }

    pub fn fail_channel(&self, channel_id: &str, err: ProvisError) {
        self.channel_failures
            .lock()
            .insert(channel_id.to_string(), err);
    }

    pub fn fail_delete(&self, err: ProvisError) {
        *self.delete_failure.lock() = Some(err);
    }

    pub fn reset_calls(&self) {
        for counter in [
            &self.calls.create_thing,
            &self.calls.thing,
            &self.calls.delete_thing,
            &self.calls.channel,
            &self.calls.connect,
            &self.calls.disconnect,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn injected(map: &Mutex<HashMap<String, ProvisError>>, key: &str) -> Option<ProvisError> {
        map.lock().get(key).cloned()
    }
}

#[async_trait]
impl ThingsRegistry for FlakyRegistry {
    async fn create_thing(&self, thing: Thing, token: &str) -> anyhow::Result<Thing> {
        self.calls.create_thing.fetch_add(1, Ordering::SeqCst);
        self.inner.create_thing(thing, token).await
    }

    async fn thing(&self, id: &str, token: &str) -> anyhow::Result<Thing> {
        self.calls.thing.fetch_add(1, Ordering::SeqCst);
        self.inner.thing(id, token).await
    }

    async fn delete_thing(&self, id: &str, token: &str) -> anyhow::Result<()> {
        self.calls.delete_thing.fetch_add(1, Ordering::SeqCst);
        let failure = self.delete_failure.lock().clone();
        if let Some(err) = failure {
            return Err(err.into());
        }
        self.inner.delete_thing(id, token).await
    }

    async fn channel(&self, id: &str, token: &str) -> anyhow::Result<Channel> {
        self.calls.channel.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::injected(&self.channel_failures, id) {
            return Err(err.into());
        }
        self.inner.channel(id, token).await
    }

    async fn connect(&self, connection: &Connection, token: &str) -> anyhow::Result<()> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::injected(&self.connect_failures, &connection.channel_id) {
            return Err(err.into());
        }
        self.inner.connect(connection, token).await
    }

    async fn disconnect_thing(
        &self,
        thing_id: &str,
        channel_id: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::injected(&self.disconnect_failures, channel_id) {
            return Err(err.into());
        }
        self.inner.disconnect_thing(thing_id, channel_id, token).await
    }
}
