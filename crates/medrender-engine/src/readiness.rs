//! Bounded wait for the in-page pagination engine.
//!
//! The document's pagination script sets `window._pdfReady = true` once
//! layout is complete. [`ReadinessGate`] polls that flag until it flips or
//! the timeout elapses. What happens on timeout is a policy decision: the
//! default is to export whatever layout exists.

use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::surface::RenderSurface;

/// Expression polled on the surface.
pub const READY_EXPRESSION: &str = "window._pdfReady === true";

/// What to do when pagination does not report completion in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessPolicy {
    /// Log a warning and continue with the current layout.
    #[default]
    Proceed,
    /// Abort the attempt with [`RenderError::ReadinessTimeout`].
    Fail,
}

/// Result of one readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessOutcome {
    /// Whether the flag was observed as true.
    pub ready: bool,
    pub waited: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessGate {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub policy: ReadinessPolicy,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(120_000),
            poll_interval: Duration::from_millis(100),
            policy: ReadinessPolicy::Proceed,
        }
    }
}

impl ReadinessGate {
    pub fn new(timeout: Duration, poll_interval: Duration, policy: ReadinessPolicy) -> Self {
        Self {
            timeout,
            poll_interval,
            policy,
        }
    }

    /// Poll until the ready flag is true or the timeout elapses.
    ///
    /// Evaluation errors count as "not ready yet"; the page may still be
    /// bootstrapping its scripts. Each probe is cut off at the deadline, so a
    /// main thread busy with layout cannot stretch the wait past `timeout`.
    pub async fn await_ready<S>(&self, surface: &S) -> Result<ReadinessOutcome, RenderError>
    where
        S: RenderSurface + ?Sized,
    {
        let start = Instant::now();
        let deadline = start + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, surface.evaluate(READY_EXPRESSION)).await {
                Ok(Ok(Value::Bool(true))) => {
                    let waited = start.elapsed();
                    debug!("Pagination ready after {:?}", waited);
                    return Ok(ReadinessOutcome { ready: true, waited });
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!("Readiness probe failed: {}", e),
                Err(_) => debug!("Readiness probe still pending at deadline"),
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }

        let waited = start.elapsed();
        match self.policy {
            ReadinessPolicy::Proceed => {
                warn!(
                    "Pagination not ready after {}ms, exporting current layout",
                    waited.as_millis()
                );
                Ok(ReadinessOutcome {
                    ready: false,
                    waited,
                })
            }
            ReadinessPolicy::Fail => Err(RenderError::ReadinessTimeout(waited)),
        }
    }
}
