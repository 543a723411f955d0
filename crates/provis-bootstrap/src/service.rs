//! Bootstrap service
//!
//! Every user-facing operation resolves the caller's identity, authorizes
//! it, reads the current config, applies registry side effects and only then
//! commits locally. A registry failure therefore never leaves a stored config
//! claiming a connection that was not established.
//!
//! The device-facing `bootstrap` operation authenticates with the external
//! key instead of a token. Event handlers are trusted internal callbacks and
//! skip identity and ownership checks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, error, info, instrument, warn};

use provis_auth::{
    AuthorizeRequest, DEFAULT_IDENTIFY_TIMEOUT_MS, DELETE_PERMISSION, EDIT_PERMISSION,
    IdentityGateway, Identity, ListObjectsRequest, VIEW_PERMISSION,
};
use provis_common::crypto::secrets_match;
use provis_common::error::{ErrorKind, is_conflict, is_not_found, kind_of};
use provis_common::{ExternalKeyCipher, IdProvider, ProvisError, dedup_ids};
use provis_persistence::{
    Channel, Config, ConfigPersistence, ConfigsPage, Filter, State, channel_ids,
};
use provis_things::{Connection, Thing, ThingsRegistry};

use crate::error::{BootstrapResult, Failure, Operation};
use crate::reconciler;

/// Name given to things created on behalf of a config
const THING_NAME_PREFIX: &str = "Bootstrapped Thing ";

pub struct BootstrapService {
    auth: Arc<dyn IdentityGateway>,
    configs: Arc<dyn ConfigPersistence>,
    things: Arc<dyn ThingsRegistry>,
    cipher: ExternalKeyCipher,
    id_provider: Arc<dyn IdProvider>,
    identify_timeout: Duration,
}

impl std::fmt::Debug for BootstrapService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapService")
            .field("cipher", &self.cipher)
            .field("identify_timeout", &self.identify_timeout)
            .finish_non_exhaustive()
    }
}

impl BootstrapService {
    pub fn new(
        auth: Arc<dyn IdentityGateway>,
        configs: Arc<dyn ConfigPersistence>,
        things: Arc<dyn ThingsRegistry>,
        cipher: ExternalKeyCipher,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            auth,
            configs,
            things,
            cipher,
            id_provider,
            identify_timeout: Duration::from_millis(DEFAULT_IDENTIFY_TIMEOUT_MS),
        }
    }

    /// Bound identity resolution by `timeout`
    pub fn with_identify_timeout(mut self, timeout: Duration) -> Self {
        self.identify_timeout = timeout;
        self
    }

    /// Provision a config for a new or existing thing.
    ///
    /// An empty `thing_id` creates a thing in the registry; if the config then
    /// cannot be saved, that thing is deleted again. The returned config holds
    /// the newly fetched channels followed by the already known ones.
    #[instrument(skip_all, fields(thing_id = %cfg.thing_id, external_id = %cfg.external_id))]
    pub async fn add(&self, token: &str, mut cfg: Config) -> BootstrapResult<Config> {
        let op = Operation::Add;
        let start = Instant::now();

        if cfg.external_id.is_empty() {
            return Err(op.err(anyhow::Error::from(ProvisError::MalformedEntity(
                "external id is empty".to_string(),
            ))));
        }
        if cfg.external_key.is_empty() {
            return Err(op.err(anyhow::Error::from(ProvisError::MalformedEntity(
                "external key is empty".to_string(),
            ))));
        }

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::domain_membership(&identity))
            .await
            .map_err(|e| op.err(e))?;

        let to_connect = dedup_ids(&cfg.channel_ids());
        let existing = self
            .configs
            .list_existing(&identity.domain_id, &to_connect)
            .await
            .context("failed to check if channels exist")
            .map_err(|e| op.err(e))?;

        let fetched = reconciler::connection_channels(
            self.things.as_ref(),
            &to_connect,
            &channel_ids(&existing),
            token,
        )
        .await
        .context("failed to check channels connections")
        .map_err(|e| op.err(e))?;

        let requested_id = cfg.thing_id.clone();
        let thing = self.thing(&requested_id, token).await.map_err(|e| op.err(e))?;

        cfg.thing_id = thing.id;
        cfg.domain_id = identity.domain_id;
        cfg.state = State::Inactive;
        cfg.thing_key = thing.credentials.secret;
        cfg.channels = fetched;

        match self.configs.save(cfg.clone(), &to_connect).await {
            Ok(saved) => {
                cfg.thing_id = saved;
                cfg.channels.extend(existing);
                info!(
                    thing_id = %cfg.thing_id,
                    channels = cfg.channels.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Bootstrap config added"
                );
                Ok(cfg)
            }
            Err(err) => {
                let err = if requested_id.is_empty() {
                    self.delete_orphan(&cfg.thing_id, token, err).await
                } else {
                    err
                };
                Err(op.err(err))
            }
        }
    }

    #[instrument(skip_all, fields(thing_id = %id))]
    pub async fn view(&self, token: &str, id: &str) -> BootstrapResult<Config> {
        let op = Operation::View;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::thing(&identity, VIEW_PERMISSION, id))
            .await
            .map_err(|e| op.err(e))?;

        self.configs
            .retrieve_by_id(&identity.domain_id, id)
            .await
            .map_err(|e| op.err(e))
    }

    /// Update the editable fields of a config
    #[instrument(skip_all, fields(thing_id = %cfg.thing_id))]
    pub async fn update(&self, token: &str, mut cfg: Config) -> BootstrapResult<()> {
        let op = Operation::Update;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::thing(&identity, EDIT_PERMISSION, &cfg.thing_id))
            .await
            .map_err(|e| op.err(e))?;

        cfg.domain_id = identity.domain_id;
        self.configs.update(cfg).await.map_err(|e| op.err(e))?;

        debug!("Bootstrap config updated");
        Ok(())
    }

    /// Rotate the certificate fields of a config
    #[instrument(skip_all, fields(thing_id = %thing_id))]
    pub async fn update_cert(
        &self,
        token: &str,
        thing_id: &str,
        client_cert: &str,
        client_key: &str,
        ca_cert: &str,
    ) -> BootstrapResult<Config> {
        let op = Operation::UpdateCert;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::thing(&identity, EDIT_PERMISSION, thing_id))
            .await
            .map_err(|e| op.err(e))?;

        let cfg = self
            .configs
            .update_cert(&identity.domain_id, thing_id, client_cert, client_key, ca_cert)
            .await
            .map_err(|e| op.err(e))?;

        info!("Bootstrap config certificates updated");
        Ok(cfg)
    }

    /// Replace the channel list of a config.
    ///
    /// Registry links are only touched while the config is active, and every
    /// side effect completes before the new list is stored.
    #[instrument(skip_all, fields(thing_id = %id))]
    pub async fn update_connections(
        &self,
        token: &str,
        id: &str,
        connections: &[String],
    ) -> BootstrapResult<()> {
        let op = Operation::UpdateConnections;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::thing(&identity, EDIT_PERMISSION, id))
            .await
            .map_err(|e| op.err(e))?;

        let connections = dedup_ids(connections);
        let cfg = self
            .configs
            .retrieve_by_id(&identity.domain_id, id)
            .await
            .map_err(|e| op.err(e))?;

        let diff = reconciler::update_list(&cfg.channels, &connections);

        let existing = self
            .configs
            .list_existing(&identity.domain_id, &connections)
            .await
            .context("failed to check if channels exist")
            .map_err(|e| op.err(e))?;

        let mut channels = reconciler::connection_channels(
            self.things.as_ref(),
            &connections,
            &channel_ids(&existing),
            token,
        )
        .await
        .context("failed to check channels connections")
        .map_err(|e| op.err(e))?;
        channels.extend(existing);

        if cfg.state == State::Active {
            for channel_id in &diff.remove {
                self.disconnect(id, channel_id, token)
                    .await
                    .map_err(|e| op.err(e))?;
            }
            for channel_id in &diff.add {
                self.connect(id, channel_id, token)
                    .await
                    .map_err(|e| op.err(e))?;
            }
        }

        self.configs
            .update_connections(&identity.domain_id, id, channels, &connections)
            .await
            .map_err(|e| op.err(e))?;

        info!(
            added = diff.add.len(),
            removed = diff.remove.len(),
            state = %cfg.state,
            "Bootstrap config connections updated"
        );
        Ok(())
    }

    /// List the configs the caller may see.
    ///
    /// Platform and domain administrators see the whole domain, other users
    /// only the things they hold `view` on.
    #[instrument(skip_all, fields(offset = offset, limit = limit))]
    pub async fn list(
        &self,
        token: &str,
        filter: &Filter,
        offset: u64,
        limit: u64,
    ) -> BootstrapResult<ConfigsPage> {
        let op = Operation::List;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;

        let thing_ids = if self
            .is_authorized(&AuthorizeRequest::platform_admin(&identity))
            .await
            || self
                .is_authorized(&AuthorizeRequest::domain_admin(&identity))
                .await
        {
            Vec::new()
        } else {
            let allowed = self
                .auth
                .list_all_objects(&ListObjectsRequest::viewable_things(&identity.id))
                .await
                .context("failed to list allowed things")
                .map_err(|e| op.err(e))?;

            if allowed.is_empty() {
                debug!(user_id = %identity.id, "No viewable things");
                return Ok(ConfigsPage {
                    total: 0,
                    offset,
                    limit,
                    configs: Vec::new(),
                });
            }
            allowed
        };

        self.configs
            .retrieve_all(&identity.domain_id, &thing_ids, filter, offset, limit)
            .await
            .map_err(|e| op.err(e))
    }

    #[instrument(skip_all, fields(thing_id = %id))]
    pub async fn remove(&self, token: &str, id: &str) -> BootstrapResult<()> {
        let op = Operation::Remove;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::thing(&identity, DELETE_PERMISSION, id))
            .await
            .map_err(|e| op.err(e))?;

        self.configs
            .remove(&identity.domain_id, id)
            .await
            .map_err(|e| op.err(e))?;

        info!("Bootstrap config removed");
        Ok(())
    }

    /// Hand a device its config in exchange for its external key.
    ///
    /// With `secure` set, `external_key` is hex(IV || AES-CFB(key)) under the
    /// process key. The comparison runs in constant time.
    #[instrument(skip_all, fields(external_id = %external_id, secure = secure))]
    pub async fn bootstrap(
        &self,
        external_key: &str,
        external_id: &str,
        secure: bool,
    ) -> BootstrapResult<Config> {
        let op = Operation::Bootstrap;

        if external_id.is_empty() {
            return Err(op.err(anyhow::Error::from(ProvisError::not_found(
                "empty external id",
            ))));
        }

        let cfg = self
            .configs
            .retrieve_by_external_id(external_id)
            .await
            .map_err(|e| op.err(e))?;

        let presented = if secure {
            self.cipher
                .decrypt_bytes(external_key)
                .map_err(|e| op.err(Failure::ExternalKeySecure(e)))?
        } else {
            external_key.as_bytes().to_vec()
        };

        if !secrets_match(&presented, cfg.external_key.as_bytes()) {
            warn!("External key mismatch");
            return Err(op.err(Failure::ExternalKey));
        }

        info!(thing_id = %cfg.thing_id, "Device bootstrapped");
        Ok(cfg)
    }

    /// Move a config between `Inactive` and `Active`.
    ///
    /// Links already in the target state are skipped; any other registry
    /// failure aborts and leaves the stored state as it was.
    #[instrument(skip_all, fields(thing_id = %id, state = %state))]
    pub async fn change_state(&self, token: &str, id: &str, state: State) -> BootstrapResult<()> {
        let op = Operation::ChangeState;

        let identity = self.identify(token).await.map_err(|e| op.err(e))?;
        self.authorize(&AuthorizeRequest::thing(&identity, EDIT_PERMISSION, id))
            .await
            .map_err(|e| op.err(e))?;

        let cfg = self
            .configs
            .retrieve_by_id(&identity.domain_id, id)
            .await
            .map_err(|e| op.err(e))?;

        if cfg.state == state {
            debug!("Config already in requested state");
            return Ok(());
        }

        match state {
            State::Active => {
                for channel in &cfg.channels {
                    self.connect(&cfg.thing_id, &channel.id, token)
                        .await
                        .map_err(|e| op.err(e))?;
                }
            }
            State::Inactive => {
                for channel in &cfg.channels {
                    self.disconnect(&cfg.thing_id, &channel.id, token)
                        .await
                        .map_err(|e| op.err(e))?;
                }
            }
        }

        self.configs
            .change_state(&identity.domain_id, id, state)
            .await
            .map_err(|e| op.err(e))?;

        info!(channels = cfg.channels.len(), "Bootstrap config state changed");
        Ok(())
    }

    // Event handlers

    #[instrument(skip_all, fields(channel_id = %channel.id))]
    pub async fn update_channel_handler(&self, channel: Channel) -> BootstrapResult<()> {
        self.configs
            .update_channel(channel)
            .await
            .map_err(|e| Operation::UpdateChannel.err(e))
    }

    #[instrument(skip_all, fields(thing_id = %id))]
    pub async fn remove_config_handler(&self, id: &str) -> BootstrapResult<()> {
        self.configs
            .remove_thing(id)
            .await
            .map_err(|e| Operation::RemoveConfig.err(e))
    }

    #[instrument(skip_all, fields(channel_id = %id))]
    pub async fn remove_channel_handler(&self, id: &str) -> BootstrapResult<()> {
        self.configs
            .remove_channel(id)
            .await
            .map_err(|e| Operation::RemoveChannel.err(e))
    }

    #[instrument(skip_all, fields(channel_id = %channel_id, thing_id = %thing_id))]
    pub async fn connect_thing_handler(
        &self,
        channel_id: &str,
        thing_id: &str,
    ) -> BootstrapResult<()> {
        self.configs
            .connect_thing(channel_id, thing_id)
            .await
            .map_err(|e| Operation::ConnectThing.err(e))
    }

    #[instrument(skip_all, fields(channel_id = %channel_id, thing_id = %thing_id))]
    pub async fn disconnect_thing_handler(
        &self,
        channel_id: &str,
        thing_id: &str,
    ) -> BootstrapResult<()> {
        self.configs
            .disconnect_thing(channel_id, thing_id)
            .await
            .map_err(|e| Operation::DisconnectThing.err(e))
    }

    async fn identify(&self, token: &str) -> Result<Identity, Failure> {
        match tokio::time::timeout(self.identify_timeout, self.auth.identify(token)).await {
            Ok(Ok(identity)) if identity.is_complete() => Ok(identity),
            Ok(Ok(_)) => {
                debug!("Identity lacks user or domain");
                Err(Failure::Authentication)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Identity resolution failed");
                Err(Failure::Authentication)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.identify_timeout.as_millis() as u64,
                    "Identity resolution timed out"
                );
                Err(Failure::Authentication)
            }
        }
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> Result<(), Failure> {
        match self.auth.authorize(request).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(
                    permission = %request.permission,
                    object_type = %request.object_type,
                    object = %request.object,
                    "Permission denied"
                );
                Err(Failure::Authorization)
            }
            Err(e) => {
                warn!(error = %e, "Authorization check failed");
                Err(Failure::Authorization)
            }
        }
    }

    async fn is_authorized(&self, request: &AuthorizeRequest) -> bool {
        matches!(self.auth.authorize(request).await, Ok(true))
    }

    /// Fetch the thing, or create one when `id` is empty
    async fn thing(&self, id: &str, token: &str) -> Result<Thing, Failure> {
        if id.is_empty() {
            let id = self.id_provider.id().context("failed to create thing")?;
            let thing = Thing::new(id.clone(), format!("{}{}", THING_NAME_PREFIX, id));
            let created = self
                .things
                .create_thing(thing, token)
                .await
                .map_err(|e| registry_failure(e, "failed to create thing"))?;
            debug!(thing_id = %created.id, "Thing created");
            return Ok(created);
        }

        self.things
            .thing(id, token)
            .await
            .map_err(|e| registry_failure(e, "failed to find thing"))
    }

    async fn connect(&self, thing_id: &str, channel_id: &str, token: &str) -> Result<(), Failure> {
        match self
            .things
            .connect(&Connection::new(channel_id, thing_id), token)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_conflict(&e) => {
                debug!(channel_id, "Thing already connected");
                Ok(())
            }
            Err(e) => {
                warn!(channel_id, error = %e, "Failed to connect thing");
                Err(Failure::Things)
            }
        }
    }

    async fn disconnect(
        &self,
        thing_id: &str,
        channel_id: &str,
        token: &str,
    ) -> Result<(), Failure> {
        match self.things.disconnect_thing(thing_id, channel_id, token).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(channel_id, "Thing already disconnected");
                Ok(())
            }
            Err(e) => {
                warn!(channel_id, error = %e, "Failed to disconnect thing");
                Err(Failure::Things)
            }
        }
    }

    /// Best-effort deletion of a thing created for a config that was not saved
    async fn delete_orphan(&self, thing_id: &str, token: &str, err: anyhow::Error) -> anyhow::Error {
        match self.things.delete_thing(thing_id, token).await {
            Ok(()) => {
                info!(thing_id, "Deleted thing of unsaved config");
                err
            }
            Err(delete_err) => {
                error!(thing_id, error = %delete_err, "Failed to delete thing of unsaved config");
                err.context(format!(
                    "failed to delete thing {}: {}",
                    thing_id, delete_err
                ))
            }
        }
    }
}

/// Keep classified registry errors, collapse everything else into `Things`
fn registry_failure(err: anyhow::Error, what: &'static str) -> Failure {
    match kind_of(&err) {
        Some(
            ErrorKind::NotFound
            | ErrorKind::Conflict
            | ErrorKind::Authentication
            | ErrorKind::Authorization,
        ) => Failure::Other(err.context(what)),
        _ => {
            warn!(error = %err, "{}", what);
            Failure::Things
        }
    }
}
