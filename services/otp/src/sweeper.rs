use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use crate::domain::types::SweepScope;
use crate::manager::OtpManager;

/// Handle to the periodic sweep task started by [`spawn_sweeper`].
pub struct SweeperHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "otp sweeper terminated abnormally");
        }
    }
}

/// Sweep the whole store every `period`, starting one period from now.
pub fn spawn_sweeper(manager: Arc<OtpManager>, period: Duration) -> SweeperHandle {
    let (stop, mut stopped) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "otp sweeper started");
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => {
                    let removed = manager.sweep(SweepScope::All);
                    if removed > 0 {
                        info!(removed, remaining = manager.len(), "expired otps swept");
                    }
                }
            }
        }
        info!("otp sweeper stopped");
    });
    SweeperHandle { stop, task }
}
