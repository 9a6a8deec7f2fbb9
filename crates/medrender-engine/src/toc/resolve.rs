//! Page/anchor data to section ranges and TOC labels.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Raw result of the in-page scan.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageScan {
    /// Every page container in document order, blank ones included.
    #[serde(default)]
    pub pages: Vec<ScannedPage>,
    /// Target ids of TOC entries that have a label slot, in document order.
    #[serde(default)]
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedPage {
    /// Whether the page's content region has non-whitespace text.
    pub has_content: bool,
    /// Raw ids of start markers on this page, in document order.
    #[serde(default)]
    pub anchors: Vec<String>,
}

/// First page on which a section's start marker appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionAnchor {
    pub id: String,
    /// 1-based index over content-bearing pages.
    pub page_index: u32,
}

/// Inclusive page span of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRange {
    pub id: String,
    pub start: u32,
    pub end: u32,
}

impl SectionRange {
    /// `"start"` for single-page sections, `"start-end"` otherwise.
    pub fn label(&self) -> String {
        if self.start == self.end {
            self.start.to_string()
        } else {
            format!("{}-{}", self.start, self.end)
        }
    }
}

/// Outcome of resolving one paginated document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TocResolution {
    /// Content-bearing pages.
    pub total_pages: u32,
    pub sections_found: usize,
    pub toc_injected: usize,
    pub toc_missing: usize,
    /// Ranges ordered by start page.
    pub mapping: Vec<SectionRange>,
    /// One label per scanned TOC entry, in entry order.
    pub labels: Vec<String>,
}

impl TocResolution {
    pub fn range(&self, id: &str) -> Option<&SectionRange> {
        self.mapping.iter().find(|r| r.id == id)
    }
}

/// Number content-bearing pages from 1 and record the first page of each
/// section. Markers whose id lacks `suffix` are ignored.
pub fn collect_anchors(scan: &PageScan, suffix: &str) -> (u32, Vec<SectionAnchor>) {
    let mut seen = HashSet::new();
    let mut anchors = Vec::new();
    let mut page_index = 0u32;

    for page in scan.pages.iter().filter(|p| p.has_content) {
        page_index += 1;
        for raw in &page.anchors {
            let Some(id) = raw.strip_suffix(suffix) else {
                continue;
            };
            if id.is_empty() || !seen.insert(id.to_string()) {
                continue;
            }
            anchors.push(SectionAnchor {
                id: id.to_string(),
                page_index,
            });
        }
    }

    (page_index, anchors)
}

/// Each section ends the page before the next one starts; the last runs to
/// `total_pages`. Sections sharing a start page collapse to that page.
pub fn derive_ranges(mut anchors: Vec<SectionAnchor>, total_pages: u32) -> Vec<SectionRange> {
    // Stable: equal starts keep document order.
    anchors.sort_by_key(|a| a.page_index);

    let starts: Vec<u32> = anchors.iter().map(|a| a.page_index).collect();
    anchors
        .into_iter()
        .enumerate()
        .map(|(i, anchor)| {
            let end = match starts.get(i + 1) {
                Some(next) => next.saturating_sub(1),
                None => total_pages,
            };
            SectionRange {
                end: end.max(anchor.page_index),
                start: anchor.page_index,
                id: anchor.id,
            }
        })
        .collect()
}

/// Full resolution of a scan: ranges plus one label per TOC entry.
pub fn resolve_scan(scan: &PageScan, suffix: &str, missing_label: &str) -> TocResolution {
    let (total_pages, anchors) = collect_anchors(scan, suffix);
    let mapping = derive_ranges(anchors, total_pages);

    let mut toc_injected = 0;
    let mut toc_missing = 0;
    let labels = scan
        .entries
        .iter()
        .map(|target| match mapping.iter().find(|r| &r.id == target) {
            Some(range) => {
                toc_injected += 1;
                range.label()
            }
            None => {
                toc_missing += 1;
                missing_label.to_string()
            }
        })
        .collect();

    TocResolution {
        total_pages,
        sections_found: mapping.len(),
        toc_injected,
        toc_missing,
        mapping,
        labels,
    }
}
