//! Common test utilities for engine integration tests
//!
//! This module provides shared test infrastructure including:
//! - StaticIdentityGateway: token table with switchable permissions
//! - FlakyRegistry: call-counting registry with injected failures
//! - Harness: a service wired to in-memory collaborators

#![allow(dead_code)]

#[allow(dead_code, unused_imports)]
pub mod identity;
#[allow(dead_code, unused_imports)]
pub mod registry;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use provis_bootstrap::BootstrapService;
use provis_common::{ExternalKeyCipher, IdProvider};
use provis_persistence::{Channel, Config, ConfigPersistence, MemoryConfigStore};

pub use identity::StaticIdentityGateway;
pub use registry::FlakyRegistry;

/// Default caller
pub const TOKEN: &str = "token-1";
pub const USER: &str = "user-1";
pub const DOMAIN: &str = "domain-1";

/// Process encryption key
pub const KEY: &[u8] = b"v7aT0HGxJxt2gULzr3RHwf4WIf6DusPp";

/// Deterministic ids: thing-1, thing-2, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicUsize,
}

impl IdProvider for SequentialIds {
    fn id(&self) -> anyhow::Result<String> {
        Ok(format!("thing-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

pub struct Harness {
    pub service: Arc<BootstrapService>,
    pub store: Arc<MemoryConfigStore>,
    pub registry: Arc<FlakyRegistry>,
    pub auth: Arc<StaticIdentityGateway>,
    pub cipher: ExternalKeyCipher,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryConfigStore::new());
    let registry = Arc::new(FlakyRegistry::new());
    let auth = Arc::new(StaticIdentityGateway::new());
    auth.add_token(TOKEN, USER, DOMAIN);
    let cipher = ExternalKeyCipher::new(KEY).expect("valid key");

    let service = BootstrapService::new(
        auth.clone(),
        store.clone(),
        registry.clone(),
        cipher.clone(),
        Arc::new(SequentialIds::default()),
    );

    Harness {
        service: Arc::new(service),
        store,
        registry,
        auth,
        cipher,
    }
}

/// A remote channel with a recognisable name
pub fn remote_channel(id: &str) -> provis_things::Channel {
    provis_things::Channel {
        id: id.to_string(),
        name: format!("channel {}", id),
        domain_id: DOMAIN.to_string(),
        ..Default::default()
    }
}

/// A config asking for the given channels
pub fn config(thing_id: &str, external_id: &str, channels: &[&str]) -> Config {
    Config {
        thing_id: thing_id.to_string(),
        external_id: external_id.to_string(),
        external_key: format!("key-{}", external_id),
        name: format!("config {}", external_id),
        content: "{\"interval\":5}".to_string(),
        channels: channels.iter().map(|id| Channel::with_id(*id)).collect(),
        ..Default::default()
    }
}

pub fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

impl Harness {
    /// Register channels with the remote registry
    pub fn seed_channels(&self, ids: &[&str]) {
        for id in ids {
            self.registry.inner.add_channel(remote_channel(id));
        }
    }

    /// Add a config through the service, creating its thing
    pub async fn add_config(&self, external_id: &str, channels: &[&str]) -> Config {
        self.seed_channels(channels);
        self.service
            .add(TOKEN, config("", external_id, channels))
            .await
            .expect("config added")
    }

    /// Stored config as the store sees it
    pub async fn stored(&self, thing_id: &str) -> Config {
        self.store
            .retrieve_by_id(DOMAIN, thing_id)
            .await
            .expect("config stored")
    }
}
