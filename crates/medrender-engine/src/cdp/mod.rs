//! Chrome DevTools Protocol (CDP) transport.
//!
//! A small CDP client: one WebSocket to the browser, flattened sessions per
//! target, request/response correlation by id and per-session event fan-out.
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9333").await?;
//! let page = client.new_page().await?;
//! page.set_content("<html>...</html>", Duration::from_secs(60), Duration::from_millis(500)).await?;
//! let pdf = page.print_to_pdf(&PrintToPdfParams::a4()).await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
