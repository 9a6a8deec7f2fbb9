//! Render orchestration for paginated clinical records.
//!
//! Drives a headless Chrome over the DevTools Protocol: lays out an HTML
//! document at A4 size, waits for the in-page pagination engine (Paged.js)
//! to finish, resolves table-of-contents page numbers from the paginated
//! page tree and prints the result to PDF.
//!
//! ## Architecture
//!
//! ```text
//! RenderService ─► RenderPipeline ─► SessionManager ─► ChromeLauncher
//!                        │                  │
//!                        │           ChromeSession (one per process)
//!                        ▼                  │
//!        ReadinessGate, TocResolver,   PageSession (one per job)
//!        Exporter, MetricsRecorder          │ WebSocket / CDP
//!                                           ▼
//!                                      Chrome (headless)
//! ```
//!
//! ## Lazy Initialization
//!
//! Chrome is not started until the first job needs it. A crashed or
//! disconnected browser is relaunched on the next job; concurrent jobs that
//! arrive during a launch share it.
//!
//! ## Documents
//!
//! Input HTML is expected to carry:
//! - section start markers `<a id="{section}-start">`
//! - TOC entries `[data-toc-target="{section}"]` with a `.toc-pages` slot
//! - a script that sets `window._pdfReady = true` once pagination is done

pub mod cdp;
pub mod error;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod readiness;
pub mod retry;
pub mod service;
pub mod session;
pub mod surface;
pub mod toc;

#[cfg(test)]
mod testing;

pub use error::RenderError;
pub use export::{Exporter, RenderArtifact};
pub use metrics::{MetricsRecorder, RenderMetrics};
pub use pipeline::{
    LiveSurface, PipelineConfig, RenderJob, RenderOptions, RenderOutcome, RenderPipeline,
};
pub use readiness::{READY_EXPRESSION, ReadinessGate, ReadinessOutcome, ReadinessPolicy};
pub use retry::{RetryPolicy, retry_with_policy};
pub use service::{HealthStatus, RenderRequest, RenderResponse, RenderService};
pub use session::{ChromeLauncher, ChromeLauncherConfig, ChromeSession, SessionManager, SessionState};
pub use surface::{BrowserSession, Launcher, LoadSettings, PageLayout, RenderSurface, SurfaceOf};
pub use toc::{SectionRange, TocResolution, TocResolver, TocSelectors};
