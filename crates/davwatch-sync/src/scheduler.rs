//! Fixed-period task driver
//!
//! Runs a cycle function on a fixed period with two guarantees: cycles of
//! the same task never overlap (the next tick fires only after the
//! current cycle returned), and cancellation is honored between cycles.
//! A cycle that runs longer than the period delays the next tick instead
//! of bunching missed ticks together.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawns a periodic task that runs `cycle` every `period` until
/// `shutdown` is cancelled.
///
/// The cycle future is awaited inline in the tick loop, which is what
/// prevents overlapping runs. Cycle functions are expected to handle
/// their own failures; this driver only schedules.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    cycle: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(task = name, period_secs = period.as_secs(), "Periodic task started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(task = name, "Periodic task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    debug!(task = name, "Cycle start");
                    cycle().await;
                }
            }
        }
    })
}
