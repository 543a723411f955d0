//! Bootstrap service construction

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use provis_auth::JwtIdentityGateway;
use provis_bootstrap::BootstrapService;
use provis_common::UuidProvider;
use provis_persistence::MemoryConfigStore;
use provis_things::HttpThingsRegistry;

use crate::model::Configuration;

/// Wire the engine to its collaborators as configured
pub fn build_service(configuration: &Configuration) -> anyhow::Result<Arc<BootstrapService>> {
    let cipher = configuration
        .external_key_cipher()
        .context("invalid bootstrap encryption key")?;

    let auth = JwtIdentityGateway::new(&configuration.token_secret_key())
        .context("invalid token secret key")?;

    let things_config = configuration.things_client_config();
    let things_url = things_config.url.clone();
    let things = HttpThingsRegistry::new(things_config).context("failed to build things client")?;

    let service = BootstrapService::new(
        Arc::new(auth),
        Arc::new(MemoryConfigStore::new()),
        Arc::new(things),
        cipher,
        Arc::new(UuidProvider),
    )
    .with_identify_timeout(configuration.identify_timeout());

    info!(
        things_url = %things_url,
        identify_timeout_ms = configuration.identify_timeout().as_millis() as u64,
        "Bootstrap service ready"
    );
    Ok(Arc::new(service))
}
