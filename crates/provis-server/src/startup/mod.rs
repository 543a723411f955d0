//! Application startup utilities

mod events;
mod logging;
mod service;
mod shutdown;

pub use events::{EventStats, run_event_loop};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use service::build_service;
pub use shutdown::{ShutdownSignal, spawn_signal_listener};
