//! Things service models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Things client configuration keys
pub const THINGS_URL: &str = "provis.things.url";
pub const DEFAULT_THINGS_URL: &str = "http://localhost:9000";
pub const THINGS_CONNECT_TIMEOUT_MS: &str = "provis.things.connect.timeout.ms";
pub const DEFAULT_THINGS_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const THINGS_READ_TIMEOUT_MS: &str = "provis.things.read.timeout.ms";
pub const DEFAULT_THINGS_READ_TIMEOUT_MS: u64 = 30000;

pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub secret: String,
}

/// A device registered with the things service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain_id: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Thing {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A channel as owned by the things service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// A thing/channel pair to connect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub channel_id: String,
    pub thing_id: String,
}

impl Connection {
    pub fn new(channel_id: impl Into<String>, thing_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thing_id: thing_id.into(),
        }
    }
}
