//! In-flight request tracking fed by `Network.*` events.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::trace;

use crate::cdp::protocol::CdpResponse;

/// Counts outstanding network requests for one page.
#[derive(Debug)]
pub(crate) struct NetworkTracker {
    inflight: HashSet<String>,
    last_activity: Instant,
}

impl NetworkTracker {
    pub(crate) fn new() -> Self {
        Self {
            inflight: HashSet::new(),
            last_activity: Instant::now(),
        }
    }

    /// Apply one CDP event. Events outside the `Network` domain are ignored.
    pub(crate) fn observe(&mut self, method: &str, request_id: Option<&str>) {
        let Some(request_id) = request_id else { return };
        match method {
            "Network.requestWillBeSent" => {
                self.inflight.insert(request_id.to_string());
            }
            "Network.loadingFinished" | "Network.loadingFailed" => {
                self.inflight.remove(request_id);
            }
            _ => return,
        }
        self.last_activity = Instant::now();
    }

    /// Forget everything; used before loading new content.
    pub(crate) fn reset(&mut self) {
        self.inflight.clear();
        self.last_activity = Instant::now();
    }

    pub(crate) fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// No requests outstanding and nothing started or finished for `quiet`.
    pub(crate) fn is_idle(&self, quiet: Duration) -> bool {
        self.inflight.is_empty() && self.last_activity.elapsed() >= quiet
    }
}

/// Drain session events into the tracker until the channel closes.
pub(crate) fn spawn_event_pump(
    mut event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    tracker: Arc<Mutex<NetworkTracker>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let Some(method) = event.method.as_deref() else { continue };
            let request_id = event
                .params
                .as_ref()
                .and_then(|p| p.get("requestId"))
                .and_then(|v| v.as_str());
            trace!("page event {}", method);
            tracker.lock().observe(method, request_id);
        }
    })
}
