//! Background driver for the proactive sweep.
//!
//! Runs a fixed-interval reconciliation loop; sweep errors are logged and
//! never kill the task.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::constants::{SWEEP_INITIAL_DELAY_SECS, SWEEP_INTERVAL_SECS};
use crate::notifications::NotificationService;

/// Spawns the periodic proactive sweep with the default cadence.
pub fn spawn_sweeper(notifications: Arc<NotificationService>) -> JoinHandle<()> {
    spawn_sweeper_with_interval(notifications, SWEEP_INTERVAL_SECS)
}

/// Spawns the periodic proactive sweep. Stop it by aborting the handle.
pub fn spawn_sweeper_with_interval(
    notifications: Arc<NotificationService>,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Let the embedding process finish wiring before the first pass.
        sleep(Duration::from_secs(SWEEP_INITIAL_DELAY_SECS)).await;

        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match notifications.proactive_sweep().await {
                Ok(report) => {
                    if report.expired > 0 || report.closed_cancelled > 0 {
                        info!(
                            "proactive sweep: {} expired, {} cancelled on close, {} queues",
                            report.expired, report.closed_cancelled, report.queues_swept
                        );
                    } else {
                        debug!("proactive sweep: {report:?}");
                    }
                }
                Err(err) => warn!("proactive sweep failed: {err}"),
            }
        }
    })
}
