// Things client configuration

use crate::model::{
    DEFAULT_THINGS_CONNECT_TIMEOUT_MS, DEFAULT_THINGS_READ_TIMEOUT_MS, DEFAULT_THINGS_URL,
};

#[derive(Clone, Debug)]
pub struct ThingsClientConfig {
    /// Base URL of the things service
    pub url: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for ThingsClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_THINGS_URL.to_string(),
            connect_timeout_ms: DEFAULT_THINGS_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_THINGS_READ_TIMEOUT_MS,
        }
    }
}

impl ThingsClientConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }
}
