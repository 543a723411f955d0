//! Line-delimited JSON event feed
//!
//! Each non-empty line is one things event. Bad lines are logged and
//! skipped; the loop ends at end of input or on shutdown.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tracing::{info, warn};

use provis_bootstrap::EventConsumer;

/// Counters reported when the feed stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventStats {
    pub handled: u64,
    pub failed: u64,
}

pub async fn run_event_loop<R>(
    consumer: &EventConsumer,
    reader: R,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<EventStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = EventStats::default();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.recv() => {
                info!("Event feed stopped by shutdown");
                break;
            }
        };

        let Some(line) = line else {
            info!("Event feed closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match consumer.handle_json(line).await {
            Ok(()) => stats.handled += 1,
            Err(e) => {
                warn!(error = %e, "Skipping event");
                stats.failed += 1;
            }
        }
    }

    info!(handled = stats.handled, failed = stats.failed, "Event feed summary");
    Ok(stats)
}
