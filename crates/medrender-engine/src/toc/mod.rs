//! Pagination-aware table-of-contents resolution.
//!
//! After the pagination engine has split the document into page containers,
//! only section *start* markers are observable. The resolver:
//!
//! 1. scans the page tree in one round-trip ([`script::scan_script`]);
//! 2. numbers content-bearing pages from 1, keeps the first page per section
//!    and derives contiguous ranges in plain Rust ([`resolve_scan`]);
//! 3. writes one label per TOC entry back into the document, `"?"` for
//!    entries whose target has no marker.

mod resolve;
mod script;

pub use resolve::{
    PageScan, ScannedPage, SectionAnchor, SectionRange, TocResolution, collect_anchors,
    derive_ranges, resolve_scan,
};
pub use script::{inject_script, scan_script};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::surface::RenderSurface;

/// DOM conventions of the paginated document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TocSelectors {
    /// Page containers produced by the pagination engine.
    pub page: String,
    /// Content region inside a page container.
    pub content: String,
    /// Section start markers.
    pub anchor: String,
    /// Stripped from a marker id to get the section id.
    #[serde(skip)]
    pub anchor_suffix: String,
    /// TOC entries.
    pub entry: String,
    /// Entry attribute naming the target section.
    pub target_attribute: String,
    /// Label slot inside an entry.
    pub label: String,
}

impl Default for TocSelectors {
    fn default() -> Self {
        Self {
            page: ".pagedjs_page".to_string(),
            content: ".pagedjs_page_content".to_string(),
            anchor: "a[id$=\"-start\"]".to_string(),
            anchor_suffix: "-start".to_string(),
            entry: "[data-toc-target]".to_string(),
            target_attribute: "data-toc-target".to_string(),
            label: ".toc-pages".to_string(),
        }
    }
}

/// Resolves and injects TOC page labels on a paginated surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TocResolver {
    selectors: TocSelectors,
    missing_label: String,
}

impl Default for TocResolver {
    fn default() -> Self {
        Self::new(TocSelectors::default(), "?")
    }
}

impl TocResolver {
    pub fn new(selectors: TocSelectors, missing_label: impl Into<String>) -> Self {
        Self {
            selectors,
            missing_label: missing_label.into(),
        }
    }

    pub fn selectors(&self) -> &TocSelectors {
        &self.selectors
    }

    /// Scan the surface, derive section ranges and fill every TOC slot.
    pub async fn resolve<S>(&self, surface: &S) -> Result<TocResolution, RenderError>
    where
        S: RenderSurface + ?Sized,
    {
        let raw = surface.evaluate(&scan_script(&self.selectors)).await?;
        let scan: PageScan = serde_json::from_value(raw)
            .map_err(|e| RenderError::Inspection(format!("malformed page scan: {}", e)))?;

        let resolution = resolve_scan(&scan, &self.selectors.anchor_suffix, &self.missing_label);
        debug!("Section mapping: {:?}", resolution.mapping);

        if !resolution.labels.is_empty() {
            let written = surface
                .evaluate(&inject_script(&self.selectors, &resolution.labels))
                .await?;
            let written = written.as_u64().unwrap_or(0) as usize;
            if written != resolution.labels.len() {
                warn!(
                    "TOC slots changed between scan and inject: wrote {} of {}",
                    written,
                    resolution.labels.len()
                );
            }
        }

        info!(
            "TOC page numbers injected: {} entries, {} missing, across {} pages",
            resolution.toc_injected, resolution.toc_missing, resolution.total_pages
        );
        if resolution.toc_missing > 0 {
            let missing: Vec<&str> = scan
                .entries
                .iter()
                .filter(|target| resolution.range(target).is_none())
                .map(String::as_str)
                .collect();
            warn!("TOC entries without a section marker: {:?}", missing);
        }

        Ok(resolution)
    }
}
