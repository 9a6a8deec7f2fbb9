//! PDF printing for CDP page session.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tracing::{debug, warn};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{IoReadChunk, PrintToPdfParams};

use super::core::PageSession;

/// Large documents can take minutes to print; the normal command timeout
/// does not apply.
const PRINT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(600);

/// Bytes requested per `IO.read`. Base64 framing keeps each reply well under
/// the WebSocket frame limit.
const STREAM_CHUNK: usize = 4 * 1024 * 1024;

impl PageSession {
    /// Print the page to PDF and return the decoded bytes.
    ///
    /// With `transferMode: ReturnAsStream` the document is read back in
    /// chunks; otherwise Chrome inlines it as base64 in `data`.
    pub async fn print_to_pdf(&self, params: &PrintToPdfParams) -> Result<Vec<u8>, CdpError> {
        let result = self
            .call_with_timeout(
                "Page.printToPDF",
                Some(serde_json::to_value(params)?),
                PRINT_TIMEOUT,
            )
            .await?;

        let bytes = if let Some(stream) = result["stream"].as_str() {
            let read = self.read_stream(stream).await;
            if let Err(e) = self.call("IO.close", Some(json!({"handle": stream}))).await {
                warn!("Failed to close PDF stream {}: {}", stream, e);
            }
            read?
        } else {
            let data = result["data"]
                .as_str()
                .ok_or_else(|| CdpError::InvalidResponse("Missing PDF data".to_string()))?;
            STANDARD.decode(data)?
        };

        debug!("Printed {} bytes of PDF from {}", bytes.len(), self.target_id);
        Ok(bytes)
    }

    /// Drain an `IO` stream handle until `eof`.
    pub(crate) async fn read_stream(&self, handle: &str) -> Result<Vec<u8>, CdpError> {
        let mut bytes = Vec::new();
        loop {
            let value = self
                .call(
                    "IO.read",
                    Some(json!({"handle": handle, "size": STREAM_CHUNK})),
                )
                .await?;
            let chunk: IoReadChunk = serde_json::from_value(value)
                .map_err(|e| CdpError::InvalidResponse(format!("IO.read: {}", e)))?;

            if chunk.base64_encoded {
                bytes.extend(STANDARD.decode(&chunk.data)?);
            } else {
                bytes.extend_from_slice(chunk.data.as_bytes());
            }

            if chunk.eof {
                return Ok(bytes);
            }
        }
    }
}
