//! Request-level entry point.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::RenderError;
use crate::export::RenderArtifact;
use crate::metrics::RenderMetrics;
use crate::pipeline::{PipelineConfig, RenderJob, RenderOptions, RenderOutcome, RenderPipeline};
use crate::session::{SessionManager, SessionState};
use crate::surface::Launcher;

pub const DEFAULT_FILENAME: &str = "medical_record.pdf";

/// One render request as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub html_content: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub debug_mode: bool,
}

impl RenderRequest {
    pub fn new(html_content: impl Into<String>) -> Self {
        Self {
            html_content: html_content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct RenderResponse {
    pub filename: String,
    pub artifact: RenderArtifact,
    pub metrics: RenderMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub browser_connected: bool,
}

/// Validates requests, runs them through the pipeline and owns the
/// shared session for shutdown.
pub struct RenderService<L: Launcher> {
    pipeline: RenderPipeline<L>,
    default_filename: String,
    wait_for_ready: bool,
}

impl<L: Launcher> RenderService<L> {
    pub fn new(sessions: Arc<SessionManager<L>>, config: PipelineConfig) -> Self {
        Self {
            pipeline: RenderPipeline::new(sessions, config),
            default_filename: DEFAULT_FILENAME.to_string(),
            wait_for_ready: true,
        }
    }

    /// Whether requests wait for the pagination ready flag (default true).
    pub fn with_readiness_wait(mut self, wait: bool) -> Self {
        self.wait_for_ready = wait;
        self
    }

    pub fn with_default_filename(mut self, filename: impl Into<String>) -> Self {
        self.default_filename = filename.into();
        self
    }

    pub fn pipeline(&self) -> &RenderPipeline<L> {
        &self.pipeline
    }

    /// Render one request. Invalid input is rejected before the session is
    /// touched.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderResponse, RenderError> {
        let job = RenderJob::new(
            request.html_content,
            RenderOptions {
                wait_for_ready: self.wait_for_ready,
                debug_mode: request.debug_mode,
                ..Default::default()
            },
        )?;
        let filename = output_filename(
            request.filename.as_deref().unwrap_or(&self.default_filename),
            request.debug_mode,
        );

        info!(
            "Rendering {} ({} bytes of HTML, debug={})",
            filename,
            job.html().len(),
            request.debug_mode
        );

        match self.pipeline.render(&job).await {
            Ok(RenderOutcome::Artifact { artifact, metrics }) => {
                metrics.log(&filename);
                Ok(RenderResponse {
                    filename,
                    artifact,
                    metrics,
                })
            }
            Ok(RenderOutcome::Live(live)) => {
                // Jobs built here never ask for a live surface.
                let _ = live.close().await;
                Err(RenderError::Export("pipeline returned a live surface".to_string()))
            }
            Err(e) => {
                error!("Render of {} failed: {}", filename, e);
                Err(e)
            }
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            browser_connected: self.pipeline.sessions().state() == SessionState::Connected,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.pipeline.sessions().state()
    }

    pub async fn shutdown(&self) -> Result<(), RenderError> {
        self.pipeline.sessions().shutdown().await
    }
}

/// Debug output is markup, so a `.pdf` name becomes `.html`.
pub fn output_filename(requested: &str, debug_mode: bool) -> String {
    let requested = match requested.trim() {
        "" => DEFAULT_FILENAME,
        name => name,
    };
    if !debug_mode {
        return requested.to_string();
    }
    match requested.strip_suffix(".pdf") {
        Some(stem) => format!("{}.html", stem),
        None if requested.ends_with(".html") => requested.to_string(),
        None => format!("{}.html", requested),
    }
}
