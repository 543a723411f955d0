//! Configuration management for the Provis server
//!
//! Values come from `conf/application.yml` (optional), then `PROVIS_`
//! environment variables, then command line overrides. Environment names map
//! onto keys by lowercasing and turning `_` into `.`, so
//! `PROVIS_THINGS_URL` sets `provis.things.url`.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use config::{Config, Environment, File};

use provis_auth::{
    DEFAULT_IDENTIFY_TIMEOUT_MS, DEFAULT_TOKEN_SECRET_KEY, IDENTIFY_TIMEOUT_MS, TOKEN_SECRET_KEY,
};
use provis_common::{ExternalKeyCipher, ProvisError};
use provis_things::ThingsClientConfig;
use provis_things::model::{
    DEFAULT_THINGS_CONNECT_TIMEOUT_MS, DEFAULT_THINGS_READ_TIMEOUT_MS, DEFAULT_THINGS_URL,
    THINGS_CONNECT_TIMEOUT_MS, THINGS_READ_TIMEOUT_MS, THINGS_URL,
};

use super::constants::{
    BOOTSTRAP_ENCRYPTION_KEY, DEFAULT_CONFIG_PATH, DEFAULT_LOGS_LEVEL, HEX_KEY_PREFIX, LOGS_CONSOLE,
    LOGS_FILE, LOGS_LEVEL, LOGS_PATH,
};
use crate::startup::LoggingConfig;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "provis-server", about = "Provis bootstrap service")]
pub(crate) struct Cli {
    /// Path of the YAML configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long = "things-url")]
    things_url: Option<String>,
    #[arg(long = "encryption-key", env = "PROVIS_BOOTSTRAP_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration using the process arguments
    pub fn new() -> anyhow::Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub(crate) fn from_cli(args: Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&args.config).required(false))
            .add_source(
                Environment::with_prefix("provis")
                    .prefix_separator("_")
                    .separator("_")
                    .keep_prefix(true)
                    .try_parsing(true),
            );

        if let Some(v) = args.things_url {
            builder = builder.set_override(THINGS_URL, v)?;
        }
        if let Some(v) = args.encryption_key {
            builder = builder.set_override(BOOTSTRAP_ENCRYPTION_KEY, v)?;
        }

        let config = builder
            .build()
            .with_context(|| format!("failed to build configuration from {}", args.config))?;

        Ok(Configuration { config })
    }

    // Auth

    pub fn token_secret_key(&self) -> String {
        self.config
            .get_string(TOKEN_SECRET_KEY)
            .unwrap_or(DEFAULT_TOKEN_SECRET_KEY.to_string())
    }

    pub fn identify_timeout(&self) -> Duration {
        let ms = self
            .config
            .get_int(IDENTIFY_TIMEOUT_MS)
            .map(|v| v.max(1) as u64)
            .unwrap_or(DEFAULT_IDENTIFY_TIMEOUT_MS);
        Duration::from_millis(ms)
    }

    // Things service

    pub fn things_url(&self) -> String {
        self.config
            .get_string(THINGS_URL)
            .unwrap_or(DEFAULT_THINGS_URL.to_string())
    }

    pub fn things_client_config(&self) -> ThingsClientConfig {
        let connect_ms = self
            .config
            .get_int(THINGS_CONNECT_TIMEOUT_MS)
            .map(|v| v as u64)
            .unwrap_or(DEFAULT_THINGS_CONNECT_TIMEOUT_MS);
        let read_ms = self
            .config
            .get_int(THINGS_READ_TIMEOUT_MS)
            .map(|v| v as u64)
            .unwrap_or(DEFAULT_THINGS_READ_TIMEOUT_MS);

        ThingsClientConfig::new(&self.things_url()).with_timeouts(connect_ms, read_ms)
    }

    // Bootstrap

    pub fn encryption_key(&self) -> Option<String> {
        self.config
            .get_string(BOOTSTRAP_ENCRYPTION_KEY)
            .ok()
            .filter(|key| !key.is_empty())
    }

    /// Build the process cipher from the configured key.
    ///
    /// The key is taken as raw bytes unless prefixed with `hex:`.
    pub fn external_key_cipher(&self) -> anyhow::Result<ExternalKeyCipher> {
        let key = self.encryption_key().ok_or_else(|| {
            ProvisError::IllegalArgument(format!("{} is not set", BOOTSTRAP_ENCRYPTION_KEY))
        })?;

        let cipher = match key.strip_prefix(HEX_KEY_PREFIX) {
            Some(hex) => ExternalKeyCipher::from_hex(hex)?,
            None => ExternalKeyCipher::new(key.as_bytes())?,
        };
        Ok(cipher)
    }

    // Logging

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOGS_PATH).ok(),
            self.config.get_bool(LOGS_CONSOLE).unwrap_or(true),
            self.config.get_bool(LOGS_FILE).unwrap_or(false),
            self.config
                .get_string(LOGS_LEVEL)
                .unwrap_or(DEFAULT_LOGS_LEVEL.to_string()),
        )
    }
}
