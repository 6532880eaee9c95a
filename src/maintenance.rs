use crate::services::TokenService;
use crate::store::{DurableStore, PaperStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Write-behind flush: periodically snapshot every paper and hand the
/// batch to durable storage. Runs off the request path; a failed flush is
/// logged and retried on the next tick.
pub fn spawn_flush_task(
    papers: Arc<PaperStore>,
    durable: Arc<dyn DurableStore>,
    interval_seconds: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let snapshot = papers.snapshot().await;
            let count = snapshot.len();
            if let Err(e) = durable.persist_papers(&snapshot) {
                tracing::error!(error = %e, "paper flush failed");
            } else {
                tracing::debug!(count, "papers flushed");
            }
        }
    })
}

/// Periodic sweep of expired access tokens.
pub fn spawn_token_sweep(tokens: TokenService, interval_seconds: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tokens.cleanup_expired();
        }
    })
}
