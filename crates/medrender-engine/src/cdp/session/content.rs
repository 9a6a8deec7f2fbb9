//! Document loading for CDP page session.

use serde_json::json;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::FrameTree;

use super::core::PageSession;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl PageSession {
    /// Replace the main frame's document with `html`, then wait until the
    /// document has finished parsing and the network has been idle for
    /// `network_idle`. Both conditions must hold within `timeout`.
    pub async fn set_content(
        &self,
        html: &str,
        timeout: Duration,
        network_idle: Duration,
    ) -> Result<(), CdpError> {
        let tree = self.call("Page.getFrameTree", None).await?;
        let tree: FrameTree = serde_json::from_value(tree["frameTree"].clone())
            .map_err(|e| CdpError::InvalidResponse(format!("frame tree: {}", e)))?;

        self.network.lock().reset();

        self.call(
            "Page.setDocumentContent",
            Some(json!({
                "frameId": tree.frame.id,
                "html": html,
            })),
        )
        .await
        .map_err(|e| CdpError::LoadFailed(e.to_string()))?;

        let deadline = Instant::now() + timeout;
        self.wait_for_parsed(deadline).await?;
        self.wait_for_network_idle(network_idle, deadline).await?;

        debug!("Loaded {} bytes of content into {}", html.len(), self.target_id);
        Ok(())
    }

    /// Wait until `document.readyState` leaves `loading`.
    pub async fn wait_for_parsed(&self, deadline: Instant) -> Result<(), CdpError> {
        loop {
            let result = self.evaluate("document.readyState").await?;

            if let Some(state) = result.as_str() {
                if state == "complete" || state == "interactive" {
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(CdpError::Timeout("Document parse timeout".to_string()));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until no request has been in flight for `quiet`.
    pub async fn wait_for_network_idle(
        &self,
        quiet: Duration,
        deadline: Instant,
    ) -> Result<(), CdpError> {
        loop {
            let (idle, inflight) = {
                let tracker = self.network.lock();
                (tracker.is_idle(quiet), tracker.inflight())
            };
            if idle {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(CdpError::Timeout(format!(
                    "Network idle timeout ({} requests in flight)",
                    inflight
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Serialize the current document, doctype included.
    pub async fn get_content(&self) -> Result<String, CdpError> {
        let result = self
            .evaluate(
                "(() => { \
                    const dt = document.doctype ? new XMLSerializer().serializeToString(document.doctype) : ''; \
                    return dt + document.documentElement.outerHTML; \
                })()",
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("Document markup is not a string".to_string()))
    }
}
