//! HTTP client for the things service

pub mod config;
pub mod http;

pub use config::ThingsClientConfig;
pub use http::HttpThingsRegistry;
