//! Provis bootstrap server entry point.
//!
//! Loads configuration, starts logging, wires the bootstrap service and feeds
//! it things events read as JSON lines from standard input.

use provis_bootstrap::EventConsumer;
use provis_server::model::Configuration;
use provis_server::startup::{self, ShutdownSignal};
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let service = startup::build_service(&configuration)?;
    let consumer = EventConsumer::new(service);

    let shutdown = ShutdownSignal::new();
    let shutdown_rx = shutdown.subscribe();
    startup::spawn_signal_listener(shutdown);

    info!("Provis bootstrap server started, reading events from stdin");
    let stats = startup::run_event_loop(
        &consumer,
        BufReader::new(tokio::io::stdin()),
        shutdown_rx,
    )
    .await?;

    info!(
        handled = stats.handled,
        failed = stats.failed,
        "Provis bootstrap server stopped"
    );
    Ok(())
}
