use std::future::Future;

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::SyncResponse;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub runs: usize,
    pub failures: usize,
}

/// Call `run` every `period` until `cancel_token` fires. The first run starts
/// immediately; a run that outlasts the period delays the next tick instead
/// of stacking another one behind it. Cancellation wins over a pending tick.
pub async fn watch_loop<F, Fut>(
    period: Duration,
    cancel_token: CancellationToken,
    mut run: F,
) -> WatchSummary
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResponse>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = WatchSummary::default();

    log_info!("watching listing every {}s", period.as_secs());
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("watch loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let response = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => {
                        log_info!("sync interrupted by shutdown");
                        break;
                    }
                    response = run() => response,
                };
                summary.runs += 1;
                if !response.success {
                    summary.failures += 1;
                    log_warn!(
                        "sync run {} failed: {}",
                        summary.runs,
                        response.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
    }
    summary
}
