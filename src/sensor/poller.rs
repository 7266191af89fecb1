use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{read_detection, SensorMailbox};
use crate::agent::pipeline::SoilDetection;
use crate::error::AppError;
use crate::store::Store;

/// Somewhere a soil detection may show up.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// `Ok(None)` means nothing yet; keep polling.
    async fn poll(&self) -> Result<Option<SoilDetection>, AppError>;
}

/// Reads the in-process mailbox directly.
pub struct MailboxSource {
    mailbox: Arc<SensorMailbox>,
    store: Arc<dyn Store>,
}

impl MailboxSource {
    pub fn new(mailbox: Arc<SensorMailbox>, store: Arc<dyn Store>) -> Self {
        Self { mailbox, store }
    }
}

#[async_trait]
impl ReadingSource for MailboxSource {
    async fn poll(&self) -> Result<Option<SoilDetection>, AppError> {
        read_detection(&self.mailbox, self.store.as_ref()).await
    }
}

/// Polls `GET /api/sols/sensor` on a running server.
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/api/sols/sensor", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ReadingSource for HttpSource {
    async fn poll(&self) -> Result<Option<SoilDetection>, AppError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::DataAccess(format!("sensor endpoint unreachable: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let detection = response.json().await.map_err(|e| {
                    AppError::DataAccess(format!("invalid sensor response: {}", e))
                })?;
                Ok(Some(detection))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(AppError::DataAccess(format!(
                    "sensor endpoint error ({}): {}",
                    status, text
                )))
            }
        }
    }
}

pub struct SensorPoller;

impl SensorPoller {
    /// Poll `source` every `interval` until it yields a detection or the
    /// handle is stopped or dropped. Poll errors are logged and polling continues.
    pub fn start(source: Arc<dyn ReadingSource>, interval: Duration) -> PollHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        tracing::debug!("sensor polling stopped");
                        return None;
                    }
                    _ = ticker.tick() => {}
                }
                match source.poll().await {
                    Ok(Some(detection)) => {
                        tracing::info!(soil_id = detection.sol.id, "sensor reading detected");
                        return Some(detection);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "sensor poll failed"),
                }
            }
        });
        PollHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Running poll. Dropping it aborts the polling task.
pub struct PollHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Option<SoilDetection>>>,
}

impl PollHandle {
    /// Wait for the first detection. `None` if polling was stopped.
    pub async fn wait(mut self) -> Option<SoilDetection> {
        let task = self.task.as_mut()?;
        let result = task.await.ok().flatten();
        self.task = None;
        result
    }

    /// Ask the task to stop after its current poll. `wait` then yields `None`.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
