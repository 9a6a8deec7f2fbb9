//! Seams between the pipeline and the automation engine.
//!
//! The pipeline only talks to these traits. The CDP-backed implementations
//! live in [`crate::session::chrome`]; tests substitute scripted mocks.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cdp::PrintToPdfParams;
use crate::error::RenderError;

/// Physical layout applied to every surface before content is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// CSS media type to emulate.
    pub media: String,
}

impl Default for PageLayout {
    /// A4 at 96 dpi with print rules active.
    fn default() -> Self {
        Self {
            viewport_width: 794,
            viewport_height: 1123,
            media: "print".to_string(),
        }
    }
}

/// How long content loading may take and what counts as network-quiet.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSettings {
    pub timeout: Duration,
    pub network_idle: Duration,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            network_idle: Duration::from_millis(500),
        }
    }
}

/// One isolated unit of rendering work (a browser tab).
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Apply viewport and media emulation.
    async fn configure(&self, layout: &PageLayout) -> Result<(), RenderError>;

    /// Load `html` and wait for parse-complete and network idle.
    async fn load_html(&self, html: &str, settings: &LoadSettings) -> Result<(), RenderError>;

    /// Evaluate an expression in the page and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, RenderError>;

    async fn print_pdf(&self, params: &PrintToPdfParams) -> Result<Vec<u8>, RenderError>;

    /// Serialized document markup.
    async fn markup(&self) -> Result<String, RenderError>;

    async fn close(&self) -> Result<(), RenderError>;
}

/// A live connection to the automation engine.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Surface: RenderSurface + 'static;

    fn is_connected(&self) -> bool;

    async fn open_surface(&self) -> Result<Self::Surface, RenderError>;

    /// Close the connection and the engine process behind it.
    async fn close(&self) -> Result<(), RenderError>;
}

/// Starts new engine sessions.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    type Session: BrowserSession + 'static;

    async fn launch(&self) -> Result<Self::Session, RenderError>;
}

/// Surface type produced by a launcher's sessions.
pub type SurfaceOf<L> = <<L as Launcher>::Session as BrowserSession>::Surface;
