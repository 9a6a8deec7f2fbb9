//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};
use url::Url;

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type EventHandlers = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>;

/// Default per-command timeout.
pub(crate) const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest single CDP message accepted. Debug markup comes back inline, so
/// the tungstenite defaults (16 MiB frame, 64 MiB message) are too small.
pub(crate) const MAX_MESSAGE_SIZE: usize = 512 * 1024 * 1024;

/// Pending request waiting for response.
struct PendingRequest {
    tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Shared send half of the connection: used by the client for browser-level
/// commands and by every page session for its own commands.
pub(crate) struct Channel {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    event_handlers: EventHandlers,
    connected: AtomicBool,
}

impl Channel {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        if !self.is_connected() {
            return Err(CdpError::SessionClosed);
        }

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Route events for `session_id` into a fresh channel.
    pub(crate) async fn subscribe(&self, session_id: &str) -> mpsc::UnboundedReceiver<CdpResponse> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_handlers
            .write()
            .await
            .insert(session_id.to_string(), event_tx);
        event_rx
    }

    pub(crate) async fn unsubscribe(&self, session_id: &str) {
        self.event_handlers.write().await.remove(session_id);
    }

    fn complete(&self, resp: CdpResponse) {
        let Some(id) = resp.id else { return };
        let pending_req = self.pending.lock().remove(&id);
        if let Some(req) = pending_req {
            let result = if let Some(error) = resp.error {
                Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                })
            } else {
                Ok(resp.result.unwrap_or(Value::Null))
            };
            let _ = req.tx.send(result);
        }
    }

    /// Mark the connection dead and fail every in-flight request.
    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Dropping the senders wakes each waiter with `SessionClosed`.
        self.pending.lock().clear();
    }
}

/// CDP client for browser automation.
///
/// Holds the browser-level WebSocket. Page sessions share its [`Channel`].
pub struct CdpClient {
    /// Browser product string from `/json/version`.
    browser: String,
    channel: Arc<Channel>,
    /// Background task handle.
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given HTTP debugging endpoint.
    ///
    /// ```rust,ignore
    /// let client = CdpClient::connect("http://localhost:9333").await?;
    /// ```
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let version_url = Self::version_url(endpoint)?;
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(version_url.as_str())
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let browser_ws_url = version.web_socket_debugger_url;

        let (ws_stream, _) = tokio_tungstenite::connect_async_with_config(
            browser_ws_url.as_str(),
            Some(Self::ws_config()),
            false,
        )
        .await
        .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let channel = Arc::new(Channel {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            event_handlers: Arc::new(RwLock::new(HashMap::new())),
            connected: AtomicBool::new(true),
        });

        let recv_task = {
            let channel = channel.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, &channel).await;
                channel.disconnect();
            })
        };

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            browser: version.browser,
            channel,
            recv_task,
        })
    }

    pub(crate) fn ws_config() -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(MAX_MESSAGE_SIZE))
            .max_frame_size(Some(MAX_MESSAGE_SIZE))
    }

    /// Discovery URL for the browser WebSocket.
    pub(crate) fn version_url(endpoint: &str) -> Result<Url, CdpError> {
        let base = Url::parse(endpoint.trim_end_matches('/'))?;
        Ok(base.join("/json/version")?)
    }

    /// WebSocket receive loop. Returns when the socket closes or errors.
    async fn receive_loop(mut ws_source: WsSource, channel: &Channel) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) if resp.id.is_some() => channel.complete(resp),
                        Ok(resp) if resp.method.is_some() => {
                            let session_id = resp.session_id.clone().unwrap_or_default();
                            let handlers = channel.event_handlers.read().await;
                            if let Some(tx) = handlers.get(&session_id) {
                                let _ = tx.send(resp);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    /// Send a browser-level CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.channel.call(method, params, None, COMMAND_TIMEOUT).await
    }

    /// Whether the WebSocket is still open.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Browser product string, e.g. `HeadlessChrome/126.0.6478.126`.
    pub fn browser(&self) -> &str {
        &self.browser
    }

    // ========================================================================
    // Target Management
    // ========================================================================

    /// Create a blank page, attach to it and enable the domains the render
    /// pipeline needs.
    pub async fn new_page(&self) -> Result<PageSession, CdpError> {
        let created = self
            .call("Target.createTarget", Some(json!({"url": "about:blank"})))
            .await?;
        let target_id = created["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))?
            .to_string();
        debug!("Created target {}", target_id);

        let attached = match self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.close_target(&target_id).await;
                return Err(e);
            }
        };

        let session_id = match attached["sessionId"].as_str() {
            Some(s) => s.to_string(),
            None => {
                let _ = self.close_target(&target_id).await;
                return Err(CdpError::InvalidResponse("Missing sessionId".to_string()));
            }
        };

        let event_rx = self.channel.subscribe(&session_id).await;
        let session = PageSession::new(target_id, session_id, self.channel.clone(), event_rx);

        if let Err(e) = session.enable_domains().await {
            let _ = session.close().await;
            return Err(e);
        }

        Ok(session)
    }

    /// Close a target by id.
    async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }

    /// Ask the browser to exit.
    pub async fn close_browser(&self) -> Result<(), CdpError> {
        // The browser drops the socket while answering, so a closed session
        // here still means success.
        match self.call("Browser.close", None).await {
            Ok(_) | Err(CdpError::SessionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
