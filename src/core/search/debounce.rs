//! Trailing-edge debounce for query input.
//!
//! Every submitted query restarts a fixed timer; only the last query of a
//! burst is delivered, once the input has been quiet for the whole delay.

use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

pub struct Debouncer {
    tx: mpsc::UnboundedSender<String>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Spawns the debounce task on the current runtime. `on_settled` runs on
    /// that task with the last query of each burst.
    pub fn spawn<F>(delay: Duration, mut on_settled: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut latest = first;
                loop {
                    match tokio::time::timeout(delay, rx.recv()).await {
                        Ok(Some(next)) => latest = next,
                        Ok(None) => {
                            // Input closed mid-burst: deliver what we have and stop.
                            on_settled(latest);
                            return;
                        }
                        Err(_) => break,
                    }
                }
                debug!("Query settled: {:?}", latest);
                on_settled(latest);
            }
        });
        Self { tx, handle }
    }

    pub fn submit(&self, query: impl Into<String>) {
        // Only fails once the task has stopped, and then nobody is listening.
        let _ = self.tx.send(query.into());
    }

    /// Closes the input and waits for the pending query, if any, to be delivered.
    pub async fn finish(self) {
        let Self { tx, handle } = self;
        drop(tx);
        if let Err(e) = handle.await {
            warn!("Debounce task failed: {}", e);
        }
    }
}
