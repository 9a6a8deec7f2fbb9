//! Core session struct and CDP command dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cdp::client::{COMMAND_TIMEOUT, Channel};
use crate::cdp::error::CdpError;
use crate::cdp::protocol::{CdpResponse, DeviceMetrics};

use super::network::{NetworkTracker, spawn_event_pump};

/// A session attached to a single page/target.
pub struct PageSession {
    /// Target ID.
    pub(super) target_id: String,
    /// Session ID for this target.
    pub(super) session_id: String,
    /// Connection shared with the client.
    pub(super) channel: Arc<Channel>,
    pub(super) network: Arc<Mutex<NetworkTracker>>,
    event_task: tokio::task::JoinHandle<()>,
    closed: AtomicBool,
}

impl PageSession {
    /// Create a new page session.
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        channel: Arc<Channel>,
        event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        let network = Arc::new(Mutex::new(NetworkTracker::new()));
        let event_task = spawn_event_pump(event_rx, network.clone());
        Self {
            target_id,
            session_id,
            channel,
            network,
            event_task,
            closed: AtomicBool::new(false),
        }
    }

    /// Get target ID.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Get session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.call_with_timeout(method, params, COMMAND_TIMEOUT).await
    }

    /// Send a CDP command with an explicit response timeout.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CdpError::SessionClosed);
        }
        self.channel
            .call(method, params, Some(&self.session_id), timeout)
            .await
    }

    /// Enable required CDP domains.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Network.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Override the layout viewport.
    pub async fn set_viewport(&self, metrics: DeviceMetrics) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(serde_json::to_value(metrics)?),
        )
        .await?;
        Ok(())
    }

    /// Emulate a CSS media type, e.g. `print`.
    pub async fn emulate_media(&self, media: &str) -> Result<(), CdpError> {
        self.call("Emulation.setEmulatedMedia", Some(json!({"media": media})))
            .await?;
        Ok(())
    }

    /// Close the target and stop routing its events. Idempotent.
    pub async fn close(&self) -> Result<(), CdpError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.event_task.abort();
        self.channel.unsubscribe(&self.session_id).await;
        self.channel
            .call(
                "Target.closeTarget",
                Some(json!({"targetId": self.target_id})),
                None,
                COMMAND_TIMEOUT,
            )
            .await?;
        debug!("Closed target {}", self.target_id);
        Ok(())
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}
