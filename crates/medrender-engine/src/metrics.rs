//! Per-job timing and TOC counters.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use crate::toc::TocResolution;

/// Numbers attached to every render result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetrics {
    /// Time spent waiting for pagination.
    pub paginate_ms: u64,
    pub export_ms: u64,
    pub total_ms: u64,
    /// Content-bearing pages counted during TOC resolution.
    pub page_count: u32,
    pub artifact_size_bytes: usize,
    pub toc_injected: usize,
    pub toc_missing: usize,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

impl RenderMetrics {
    /// Emit one structured event for the job.
    pub fn log(&self, filename: &str) {
        info!(
            filename,
            paginate_ms = self.paginate_ms,
            export_ms = self.export_ms,
            total_ms = self.total_ms,
            page_count = self.page_count,
            size_bytes = self.artifact_size_bytes,
            toc_injected = self.toc_injected,
            toc_missing = self.toc_missing,
            attempts = self.attempts,
            "Render complete"
        );
    }
}

/// Stamps the phases of one attempt.
#[derive(Debug)]
pub struct MetricsRecorder {
    started: Instant,
    metrics: RenderMetrics,
}

impl MetricsRecorder {
    /// Record attempt `attempt` of a job that began at `started`, so the
    /// total spans earlier attempts and their backoff.
    pub fn new(started: Instant, attempt: u32) -> Self {
        Self {
            started,
            metrics: RenderMetrics {
                attempts: attempt + 1,
                ..Default::default()
            },
        }
    }

    pub fn record_paginate(&mut self, waited: Duration) {
        self.metrics.paginate_ms = millis(waited);
    }

    pub fn record_toc(&mut self, resolution: &TocResolution) {
        self.metrics.page_count = resolution.total_pages;
        self.metrics.toc_injected = resolution.toc_injected;
        self.metrics.toc_missing = resolution.toc_missing;
    }

    pub fn record_export(&mut self, elapsed: Duration, size_bytes: usize) {
        self.metrics.export_ms = millis(elapsed);
        self.metrics.artifact_size_bytes = size_bytes;
    }

    /// Stop the clock and return the totals.
    pub fn finish(mut self) -> RenderMetrics {
        self.metrics.total_ms = millis(self.started.elapsed());
        self.metrics
    }

    /// Current numbers without stopping the clock.
    pub fn snapshot(&self) -> RenderMetrics {
        let mut metrics = self.metrics.clone();
        metrics.total_ms = millis(self.started.elapsed());
        metrics
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_recorder_phases() {
        let mut recorder = MetricsRecorder::new(Instant::now(), 1);
        tokio::time::sleep(Duration::from_millis(300)).await;
        recorder.record_paginate(Duration::from_millis(250));
        recorder.record_toc(&TocResolution {
            total_pages: 9,
            toc_injected: 3,
            toc_missing: 1,
            ..Default::default()
        });
        recorder.record_export(Duration::from_millis(40), 1024);
        tokio::time::sleep(Duration::from_millis(40)).await;

        let metrics = recorder.finish();
        assert_eq!(metrics.paginate_ms, 250);
        assert_eq!(metrics.export_ms, 40);
        assert_eq!(metrics.total_ms, 340);
        assert_eq!(metrics.page_count, 9);
        assert_eq!(metrics.artifact_size_bytes, 1024);
        assert_eq!(metrics.toc_injected, 3);
        assert_eq!(metrics.toc_missing, 1);
        assert_eq!(metrics.attempts, 2);
    }

    #[test]
    fn test_metrics_serialize_camel_case() {
        let json = serde_json::to_value(RenderMetrics {
            paginate_ms: 12,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json["paginateMs"], 12);
        assert!(json.get("artifactSizeBytes").is_some());
        assert!(json.get("tocMissing").is_some());
    }
}
