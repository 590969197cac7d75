//! Background sweeper purging expired connection codes.

use super::registry::CodeRegistry;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Handle to a running sweeper task.
///
/// Dropping the handle signals the task to stop without waiting for it;
/// [`SweeperHandle::stop`] also waits for the task to finish.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for its task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn a sweeper over `registry`, ticking every `every`.
///
/// Each tick removes every entry whose expiry has passed. A tick never
/// aborts the loop; whatever happens during one, the next tick runs as
/// scheduled.
pub fn spawn(registry: CodeRegistry, every: Duration) -> SweeperHandle {
    let (shutdown, mut rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = registry.sweep().await;
                    if removed > 0 {
                        log::info!("swept {removed} expired connection code(s)");
                    }
                }
                _ = rx.changed() => {
                    log::debug!("connection code sweeper stopping");
                    break;
                }
            }
        }
    });

    SweeperHandle { shutdown, task }
}
