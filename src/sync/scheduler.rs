use crate::sync::{CancelToken, SyncOrchestrator};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Run a sync immediately and then every `interval` until `cancel` fires.
///
/// The returned handle yields the number of runs started.
pub fn spawn_scheduler(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    cancel: CancelToken,
) -> JoinHandle<usize> {
    std::thread::spawn(move || {
        tracing::info!(interval_secs = interval.as_secs(), "sync scheduler started");
        let mut runs = 0;

        while !cancel.is_cancelled() {
            runs += 1;
            if let Err(e) = orchestrator.run(&cancel) {
                tracing::error!(error = %e, run = runs, "scheduled sync failed");
            }
            if cancel.wait_timeout(interval) {
                break;
            }
        }

        tracing::info!(runs, "sync scheduler stopped");
        runs
    })
}
