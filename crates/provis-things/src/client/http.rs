//! Things registry over HTTP
//!
//! Routes:
//! - `POST /things`, `GET /things/{id}`, `DELETE /things/{id}`
//! - `GET /channels/{id}`
//! - `POST /channels/{channel_id}/things/{thing_id}/connect`
//! - `POST /channels/{channel_id}/things/{thing_id}/disconnect`
//!
//! Ids travel as single percent-encoded path segments.
//!
//! Failures are mapped onto `ProvisError` by status: 404 is `NotFound`, 409 is
//! `Conflict`, 401 is `Authentication`, 403 is `Authorization`, the rest
//! (including transport errors) is `RemoteFailure`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use provis_common::ProvisError;

use crate::client::config::ThingsClientConfig;
use crate::model::{Channel, Connection, Thing};
use crate::traits::ThingsRegistry;

pub struct HttpThingsRegistry {
    client: Client,
    config: ThingsClientConfig,
    base: Url,
}

impl HttpThingsRegistry {
    pub fn new(config: ThingsClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()?;
        let base = Url::parse(&config.url).map_err(|e| {
            ProvisError::IllegalArgument(format!("things url {}: {}", config.url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(
                ProvisError::IllegalArgument(format!("things url {} cannot be a base", config.url))
                    .into(),
            );
        }

        Ok(Self {
            client,
            config,
            base,
        })
    }

    /// Append `segments` to the base path, encoding each one on its own
    fn build_url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ProvisError::MalformedEntity(format!("invalid id {:?}", bad)).into());
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ProvisError::IllegalArgument(format!("things url {}", self.config.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> anyhow::Result<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, what, "Things service unreachable");
            ProvisError::RemoteFailure(format!("{}: {}", what, e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, what, body = %body, "Things service rejected request");
        Err(status_error(status, what).into())
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> anyhow::Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ProvisError::RemoteFailure(format!("{}: invalid response: {}", what, e)).into())
    }
}

fn status_error(status: StatusCode, what: &str) -> ProvisError {
    match status {
        StatusCode::NOT_FOUND => ProvisError::NotFound(what.to_string()),
        StatusCode::CONFLICT => ProvisError::Conflict(what.to_string()),
        StatusCode::UNAUTHORIZED => ProvisError::Authentication,
        StatusCode::FORBIDDEN => ProvisError::Authorization,
        other => ProvisError::RemoteFailure(format!("{} returned {}", what, other)),
    }
}

#[async_trait]
impl ThingsRegistry for HttpThingsRegistry {
    async fn create_thing(&self, thing: Thing, token: &str) -> anyhow::Result<Thing> {
        let what = format!("thing {}", thing.id);
        let request = self
            .client
            .post(self.build_url(&["things"])?)
            .bearer_auth(token)
            .json(&thing);
        let response = self.send(request, &what).await?;
        Self::decode(response, &what).await
    }

    async fn thing(&self, id: &str, token: &str) -> anyhow::Result<Thing> {
        let what = format!("thing {}", id);
        let request = self
            .client
            .get(self.build_url(&["things", id])?)
            .bearer_auth(token);
        let response = self.send(request, &what).await?;
        Self::decode(response, &what).await
    }

    async fn delete_thing(&self, id: &str, token: &str) -> anyhow::Result<()> {
        let request = self
            .client
            .delete(self.build_url(&["things", id])?)
            .bearer_auth(token);
        self.send(request, &format!("thing {}", id)).await?;
        Ok(())
    }

    async fn channel(&self, id: &str, token: &str) -> anyhow::Result<Channel> {
        let what = format!("channel {}", id);
        let request = self
            .client
            .get(self.build_url(&["channels", id])?)
            .bearer_auth(token);
        let response = self.send(request, &what).await?;
        Self::decode(response, &what).await
    }

    async fn connect(&self, connection: &Connection, token: &str) -> anyhow::Result<()> {
        let url = self.build_url(&[
            "channels",
            connection.channel_id.as_str(),
            "things",
            connection.thing_id.as_str(),
            "connect",
        ])?;
        let request = self.client.post(url).bearer_auth(token);
        let what = format!(
            "connection {}/{}",
            connection.channel_id, connection.thing_id
        );
        self.send(request, &what).await?;
        Ok(())
    }

    async fn disconnect_thing(
        &self,
        thing_id: &str,
        channel_id: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        let url = self.build_url(&["channels", channel_id, "things", thing_id, "disconnect"])?;
        let request = self.client.post(url).bearer_auth(token);
        self.send(request, &format!("connection {}/{}", channel_id, thing_id))
            .await?;
        Ok(())
    }
}
