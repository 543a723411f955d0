//! Device-facing config rendering

use serde::{Deserialize, Serialize};

use provis_common::ExternalKeyCipher;
use provis_persistence::{Config, Metadata};

/// Channel as shown to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// Config as shown to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub thing_id: String,
    pub thing_key: String,
    pub channels: Vec<ChannelResponse>,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_cert: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_cert: String,
}

impl From<&Config> for BootstrapResponse {
    fn from(config: &Config) -> Self {
        Self {
            thing_id: config.thing_id.clone(),
            thing_key: config.thing_key.clone(),
            channels: config
                .channels
                .iter()
                .map(|ch| ChannelResponse {
                    id: ch.id.clone(),
                    name: ch.name.clone(),
                    metadata: ch.metadata.clone(),
                })
                .collect(),
            content: config.content.clone(),
            client_cert: config.client_cert.clone(),
            client_key: config.client_key.clone(),
            ca_cert: config.ca_cert.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigResponse {
    Plain(BootstrapResponse),
    /// hex(IV || AES-CFB(json)) under the process key
    Encrypted(String),
}

/// Turns a config into what the device receives
pub trait ConfigReader: Send + Sync {
    fn read_config(&self, config: &Config, secure: bool) -> anyhow::Result<ConfigResponse>;
}

/// JSON rendering, encrypted with the process key for secure requests
#[derive(Debug, Clone)]
pub struct JsonConfigReader {
    cipher: ExternalKeyCipher,
}

impl JsonConfigReader {
    pub fn new(cipher: ExternalKeyCipher) -> Self {
        Self { cipher }
    }
}

impl ConfigReader for JsonConfigReader {
    fn read_config(&self, config: &Config, secure: bool) -> anyhow::Result<ConfigResponse> {
        let response = BootstrapResponse::from(config);
        if !secure {
            return Ok(ConfigResponse::Plain(response));
        }

        let body = serde_json::to_vec(&response)?;
        Ok(ConfigResponse::Encrypted(self.cipher.encrypt(&body)?))
    }
}
