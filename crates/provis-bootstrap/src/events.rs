//! Things service lifecycle events
//!
//! Events arrive as JSON objects tagged by `operation`, e.g.
//! `{"operation": "channel.remove", "id": "c1"}`. Each one is dispatched to
//! the matching service handler; failures are logged and returned, never
//! retried here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use provis_common::ProvisError;
use provis_persistence::Channel;

use crate::error::BootstrapResult;
use crate::service::BootstrapService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation")]
pub enum ThingsEvent {
    #[serde(rename = "channel.update")]
    ChannelUpdated(Channel),

    #[serde(rename = "channel.remove")]
    ChannelRemoved { id: String },

    #[serde(rename = "thing.remove")]
    ThingRemoved { id: String },

    #[serde(rename = "thing.connect")]
    ThingConnected { channel_id: String, thing_id: String },

    #[serde(rename = "thing.disconnect")]
    ThingDisconnected { channel_id: String, thing_id: String },
}

impl ThingsEvent {
    pub fn operation(&self) -> &'static str {
        match self {
            ThingsEvent::ChannelUpdated(_) => "channel.update",
            ThingsEvent::ChannelRemoved { .. } => "channel.remove",
            ThingsEvent::ThingRemoved { .. } => "thing.remove",
            ThingsEvent::ThingConnected { .. } => "thing.connect",
            ThingsEvent::ThingDisconnected { .. } => "thing.disconnect",
        }
    }
}

pub struct EventConsumer {
    service: Arc<BootstrapService>,
}

impl EventConsumer {
    pub fn new(service: Arc<BootstrapService>) -> Self {
        Self { service }
    }

    pub async fn handle(&self, event: ThingsEvent) -> BootstrapResult<()> {
        let operation = event.operation();
        debug!(operation, "Handling things event");

        let result = match event {
            ThingsEvent::ChannelUpdated(channel) => {
                self.service.update_channel_handler(channel).await
            }
            ThingsEvent::ChannelRemoved { id } => self.service.remove_channel_handler(&id).await,
            ThingsEvent::ThingRemoved { id } => self.service.remove_config_handler(&id).await,
            ThingsEvent::ThingConnected {
                channel_id,
                thing_id,
            } => {
                self.service
                    .connect_thing_handler(&channel_id, &thing_id)
                    .await
            }
            ThingsEvent::ThingDisconnected {
                channel_id,
                thing_id,
            } => {
                self.service
                    .disconnect_thing_handler(&channel_id, &thing_id)
                    .await
            }
        };

        if let Err(e) = &result {
            error!(operation, error = %e, "Failed to handle things event");
        }
        result
    }

    /// Decode a raw JSON event and handle it
    pub async fn handle_json(&self, raw: &str) -> anyhow::Result<()> {
        let event: ThingsEvent = serde_json::from_str(raw)
            .map_err(|e| ProvisError::MalformedEntity(format!("invalid event: {}", e)))?;
        self.handle(event).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_events() {
        let event: ThingsEvent =
            serde_json::from_str(r#"{"operation":"channel.remove","id":"c1"}"#).unwrap();
        assert_eq!(event, ThingsEvent::ChannelRemoved { id: "c1".to_string() });

        let event: ThingsEvent = serde_json::from_str(
            r#"{"operation":"channel.update","id":"c1","name":"renamed","metadata":{"k":"v"}}"#,
        )
        .unwrap();
        let ThingsEvent::ChannelUpdated(channel) = event else {
            panic!("expected channel update");
        };
        assert_eq!(channel.name, "renamed");
        assert_eq!(channel.metadata["k"], "v");

        let event: ThingsEvent = serde_json::from_str(
            r#"{"operation":"thing.disconnect","channel_id":"c1","thing_id":"t1"}"#,
        )
        .unwrap();
        assert_eq!(event.operation(), "thing.disconnect");
    }

    #[test]
    fn test_reject_unknown_operation() {
        assert!(serde_json::from_str::<ThingsEvent>(r#"{"operation":"thing.explode"}"#).is_err());
        assert!(serde_json::from_str::<ThingsEvent>(r#"{"id":"c1"}"#).is_err());
    }

    #[test]
    fn test_encode_event() {
        let event = ThingsEvent::ThingRemoved { id: "t1".to_string() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["operation"], "thing.remove");
        assert_eq!(json["id"], "t1");
    }
}
