//! Render pipeline errors.

use std::time::Duration;

use thiserror::Error;

use crate::cdp::CdpError;

/// Errors surfaced by the render pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The job was rejected before any browser work started.
    #[error("Invalid render job: {0}")]
    InvalidJob(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// A rendering surface could not be opened or configured.
    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Content load failed: {0}")]
    Load(String),

    /// Only raised under the fail-on-timeout readiness policy.
    #[error("Pagination not ready after {}ms", .0.as_millis())]
    ReadinessTimeout(Duration),

    /// The in-page TOC scan or injection failed.
    #[error("Page inspection failed: {0}")]
    Inspection(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl RenderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RenderError::InvalidJob(_) => false,
            RenderError::Launch(_) => false,
            RenderError::ReadinessTimeout(_) => false,
            RenderError::Surface(_)
            | RenderError::Load(_)
            | RenderError::Inspection(_)
            | RenderError::Export(_) => true,
        }
    }
}

impl From<CdpError> for RenderError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(msg) | CdpError::ChromeNotAvailable(msg) => {
                RenderError::Launch(msg)
            }
            CdpError::LoadFailed(msg) => RenderError::Load(msg),
            CdpError::JavaScript(msg) => RenderError::Inspection(msg),
            _ => RenderError::Surface(e.to_string()),
        }
    }
}
