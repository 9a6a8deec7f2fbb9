//! Render pipeline: one job through surface, readiness, TOC and export.
//!
//! Each attempt acquires the shared session, opens its own surface and
//! closes it on every exit path. Attempts run under [`RetryPolicy`]; a
//! failed attempt's surface is closed before the backoff starts.

mod job;

pub use job::{RenderJob, RenderOptions};

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cdp::PrintToPdfParams;
use crate::error::RenderError;
use crate::export::{Exporter, RenderArtifact};
use crate::metrics::{MetricsRecorder, RenderMetrics};
use crate::readiness::ReadinessGate;
use crate::retry::{RetryPolicy, retry_with_policy};
use crate::session::SessionManager;
use crate::surface::{BrowserSession, Launcher, LoadSettings, PageLayout, RenderSurface, SurfaceOf};
use crate::toc::TocResolver;

/// Everything the pipeline needs besides the session.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub layout: PageLayout,
    pub load: LoadSettings,
    pub retry: RetryPolicy,
    pub readiness: ReadinessGate,
    pub toc: TocResolver,
    pub print: PrintToPdfParams,
}

/// A loaded surface handed to the caller. The caller must close it.
pub struct LiveSurface<S: RenderSurface> {
    surface: S,
    /// Numbers up to the hand-off; export fields are zero.
    pub metrics: RenderMetrics,
}

impl<S: RenderSurface> LiveSurface<S> {
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub async fn close(self) -> Result<(), RenderError> {
        self.surface.close().await
    }
}

/// Result of a successful render.
pub enum RenderOutcome<S: RenderSurface> {
    Artifact {
        artifact: RenderArtifact,
        metrics: RenderMetrics,
    },
    Live(LiveSurface<S>),
}

impl<S: RenderSurface> RenderOutcome<S> {
    pub fn metrics(&self) -> &RenderMetrics {
        match self {
            RenderOutcome::Artifact { metrics, .. } => metrics,
            RenderOutcome::Live(live) => &live.metrics,
        }
    }
}

pub struct RenderPipeline<L: Launcher> {
    sessions: Arc<SessionManager<L>>,
    config: PipelineConfig,
    exporter: Exporter,
}

impl<L: Launcher> RenderPipeline<L> {
    pub fn new(sessions: Arc<SessionManager<L>>, config: PipelineConfig) -> Self {
        let exporter = Exporter::new(config.print.clone());
        Self {
            sessions,
            config,
            exporter,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager<L>> {
        &self.sessions
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `job` under the retry policy. The last attempt's error is
    /// returned unmodified.
    pub async fn render(&self, job: &RenderJob) -> Result<RenderOutcome<SurfaceOf<L>>, RenderError> {
        let started = Instant::now();
        retry_with_policy(&self.config.retry, "Render", move |attempt| {
            self.attempt(job, started, attempt)
        })
        .await
    }

    async fn attempt(
        &self,
        job: &RenderJob,
        started: Instant,
        attempt: u32,
    ) -> Result<RenderOutcome<SurfaceOf<L>>, RenderError> {
        let mut recorder = MetricsRecorder::new(started, attempt);

        let session = self.sessions.acquire().await?;
        let surface = session.open_surface().await?;
        debug!("Surface opened (attempt {})", attempt + 1);

        match self.drive(&surface, job, &mut recorder).await {
            Ok(None) => {
                info!("Returning live surface to caller");
                Ok(RenderOutcome::Live(LiveSurface {
                    surface,
                    metrics: recorder.snapshot(),
                }))
            }
            Ok(Some(artifact)) => {
                let metrics = recorder.finish();
                close_quietly(&surface).await;
                Ok(RenderOutcome::Artifact { artifact, metrics })
            }
            Err(e) => {
                close_quietly(&surface).await;
                Err(e)
            }
        }
    }

    /// Steps after the surface exists. `None` means the caller asked for the
    /// live surface.
    async fn drive(
        &self,
        surface: &SurfaceOf<L>,
        job: &RenderJob,
        recorder: &mut MetricsRecorder,
    ) -> Result<Option<RenderArtifact>, RenderError> {
        let options = job.options();

        surface.configure(&self.config.layout).await?;
        surface.load_html(job.html(), &self.config.load).await?;

        if options.wait_for_ready {
            let outcome = self.config.readiness.await_ready(surface).await?;
            recorder.record_paginate(outcome.waited);
        }

        if options.return_live_surface {
            return Ok(None);
        }

        let resolution = self.config.toc.resolve(surface).await?;
        recorder.record_toc(&resolution);

        let export_started = Instant::now();
        let artifact = self.exporter.export(surface, options.debug_mode).await?;
        recorder.record_export(export_started.elapsed(), artifact.size_bytes());

        Ok(Some(artifact))
    }
}

/// Close a surface; failures are logged and never replace the result.
async fn close_quietly<S: RenderSurface + ?Sized>(surface: &S) {
    if let Err(e) = surface.close().await {
        warn!("Failed to close surface: {}", e);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
