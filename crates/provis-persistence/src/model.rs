//! Domain model types for bootstrap configs
//!
//! These types are used as arguments and return values of the persistence
//! traits, decoupled from specific storage backends.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque key/value metadata attached to channels
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Connectivity state of a bootstrap config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Channels hold desired membership only
    #[default]
    Inactive,
    /// The thing is connected to every channel of the config
    Active,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Inactive => "inactive",
            State::Active => "active",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" | "0" => Ok(State::Inactive),
            "active" | "1" => Ok(State::Active),
            _ => Err(format!("Invalid state: {}", s)),
        }
    }
}

/// Cached copy of a remote channel
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// A channel carrying only its id, as used for desired-connection lists
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Bootstrap configuration of a single thing
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub thing_id: String,
    pub domain_id: String,
    pub name: String,
    pub client_cert: String,
    pub client_key: String,
    pub ca_cert: String,
    pub thing_key: String,
    pub external_id: String,
    pub external_key: String,
    pub channels: Vec<Channel>,
    pub content: String,
    pub state: State,
}

impl Config {
    /// Ids of the channels currently on the config
    pub fn channel_ids(&self) -> Vec<String> {
        channel_ids(&self.channels)
    }
}

/// Collect the ids of a channel list
pub fn channel_ids(channels: &[Channel]) -> Vec<String> {
    channels.iter().map(|ch| ch.id.clone()).collect()
}

/// Filter for listing configs
///
/// Supported full-match keys: `state`, `name`, `external_id`, `thing_id`.
/// Supported partial-match keys: `name`, `external_id`. Unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub full_match: HashMap<String, String>,
    #[serde(default)]
    pub partial_match: HashMap<String, String>,
}

impl Filter {
    pub fn full(mut self, key: &str, value: &str) -> Self {
        self.full_match.insert(key.to_string(), value.to_string());
        self
    }

    pub fn partial(mut self, key: &str, value: &str) -> Self {
        self.partial_match.insert(key.to_string(), value.to_string());
        self
    }

    /// Check whether a config satisfies every filter entry
    pub fn matches(&self, config: &Config) -> bool {
        let full = self.full_match.iter().all(|(key, value)| match key.as_str() {
            "state" => value
                .parse::<State>()
                .map(|state| state == config.state)
                .unwrap_or(false),
            "name" => &config.name == value,
            "external_id" => &config.external_id == value,
            "thing_id" => &config.thing_id == value,
            _ => true,
        });

        let partial = self.partial_match.iter().all(|(key, value)| {
            let needle = value.to_lowercase();
            match key.as_str() {
                "name" => config.name.to_lowercase().contains(&needle),
                "external_id" => config.external_id.to_lowercase().contains(&needle),
                _ => true,
            }
        });

        full && partial
    }
}

/// Page of configs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigsPage {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub configs: Vec<Config>,
}

/// Bookkeeping of a connection reported by the things service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub channel_id: String,
    pub thing_id: String,
    pub connected: bool,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(State::default(), State::Inactive);
        assert_eq!(State::Active.to_string(), "active");
        assert_eq!(State::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_state_from_str() {
        assert_eq!("active".parse::<State>().unwrap(), State::Active);
        assert_eq!("1".parse::<State>().unwrap(), State::Active);
        assert_eq!("0".parse::<State>().unwrap(), State::Inactive);
        assert!("enabled".parse::<State>().is_err());
    }

    #[test]
    fn test_state_serde() {
        assert_eq!(serde_json::to_string(&State::Active).unwrap(), "\"active\"");
        let state: State = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(state, State::Inactive);
    }

    #[test]
    fn test_channel_ids() {
        let config = Config {
            channels: vec![Channel::new("a", "A"), Channel::with_id("b")],
            ..Default::default()
        };
        assert_eq!(config.channel_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_filter_matches() {
        let config = Config {
            thing_id: "t1".to_string(),
            name: "Boiler Sensor".to_string(),
            external_id: "ext-42".to_string(),
            state: State::Active,
            ..Default::default()
        };

        assert!(Filter::default().matches(&config));
        assert!(Filter::default().full("state", "active").matches(&config));
        assert!(!Filter::default().full("state", "inactive").matches(&config));
        assert!(!Filter::default().full("state", "bogus").matches(&config));
        assert!(Filter::default().partial("name", "boiler").matches(&config));
        assert!(!Filter::default().partial("name", "pump").matches(&config));
        assert!(
            Filter::default()
                .full("thing_id", "t1")
                .partial("external_id", "EXT")
                .matches(&config)
        );
        assert!(Filter::default().full("unknown", "x").matches(&config));
    }
}
