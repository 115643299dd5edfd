//! Periodic silent session refresh.
//!
//! # Responsibilities
//! - Renew the session on a fixed period while the process runs
//! - Never tear down or redirect: a failed renewal is only logged

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;

use crate::http::ApiClient;

/// Background keep-alive loop.
pub struct KeepAlive {
    client: Arc<ApiClient>,
    interval: Duration,
}

impl KeepAlive {
    pub fn new(client: Arc<ApiClient>, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Keep-alive configured by `session.keepalive_*`, or `None` when disabled.
    pub fn from_config(client: Arc<ApiClient>) -> Option<Self> {
        let session = &client.config().session;
        if !session.keepalive_enabled {
            tracing::info!("Session keep-alive disabled");
            return None;
        }
        let interval = Duration::from_secs(session.keepalive_interval_secs);
        Some(Self::new(client, interval))
    }

    /// Start the loop on the current runtime. The first refresh happens one
    /// full interval after spawning.
    pub fn spawn(self) -> KeepAliveHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        KeepAliveHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Session keep-alive starting");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.client.refresh_session().await {
                        tracing::debug!("Keep-alive refresh succeeded");
                    } else {
                        tracing::warn!("Keep-alive refresh denied");
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Keep-alive received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Handle to a running keep-alive loop.
pub struct KeepAliveHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl KeepAliveHandle {
    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Keep-alive task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
