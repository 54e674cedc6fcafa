//! Periodic expiry sweep over parked workflow instances.
//!
//! Runs as an independent background task scanning the store for awaiting
//! instances past their deadline. Deliberately not a per-instance timer:
//! the sweep re-derives its work from the store on every tick, so pending
//! deadlines survive process restarts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::GovernanceEngine;

/// Spawn the expiry sweep background task.
///
/// On each tick every awaiting instance whose deadline has passed is
/// transitioned to `Expired`; instances resolved concurrently by a
/// decision are skipped.
#[must_use]
pub fn spawn_expiry_task(
    engine: Arc<GovernanceEngine>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("expiry sweep shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match engine.expire_overdue().await {
                        Ok(0) => {}
                        Ok(count) => info!(count, "expired overdue authorizations"),
                        Err(err) => error!(?err, "expiry sweep failed"),
                    }
                }
            }
        }
    })
}
