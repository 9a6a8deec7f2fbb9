//! Render job input.

use crate::error::RenderError;

/// Per-job switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Wait for the pagination engine's ready flag before going on.
    pub wait_for_ready: bool,
    /// Hand the loaded surface back instead of exporting it.
    pub return_live_surface: bool,
    /// Return markup instead of a PDF.
    pub debug_mode: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wait_for_ready: true,
            return_live_surface: false,
            debug_mode: false,
        }
    }
}

/// Validated, immutable input to one pipeline run.
#[derive(Debug, Clone)]
pub struct RenderJob {
    html: String,
    options: RenderOptions,
}

impl RenderJob {
    /// Rejects empty or whitespace-only HTML.
    pub fn new(html: impl Into<String>, options: RenderOptions) -> Result<Self, RenderError> {
        let html = html.into();
        if html.trim().is_empty() {
            return Err(RenderError::InvalidJob("htmlContent is required".to_string()));
        }
        Ok(Self { html, options })
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }
}
