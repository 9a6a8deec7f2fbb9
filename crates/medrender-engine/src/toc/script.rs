//! In-page scripts for the TOC scan and label injection.

use serde_json::Value;

use super::TocSelectors;

/// Collects page containers, their start markers and the TOC entries.
pub fn scan_script(selectors: &TocSelectors) -> String {
    format!(
        r#"/* toc:scan */ (() => {{
  const sel = {selectors};
  const pages = Array.from(document.querySelectorAll(sel.page)).map((pageEl) => {{
    const content = pageEl.querySelector(sel.content);
    const hasContent = !!content && content.textContent.trim().length > 0;
    const root = content || pageEl;
    const anchors = Array.from(root.querySelectorAll(sel.anchor)).map((a) => a.id);
    return {{ hasContent, anchors }};
  }});
  const entries = Array.from(document.querySelectorAll(sel.entry))
    .filter((entry) => entry.querySelector(sel.label))
    .map((entry) => entry.getAttribute(sel.targetAttribute) || '');
  return {{ pages, entries }};
}})()"#,
        selectors = selectors_json(selectors)
    )
}

/// Writes `labels[i]` into the i-th entry slot and returns the number written.
pub fn inject_script(selectors: &TocSelectors, labels: &[String]) -> String {
    format!(
        r#"/* toc:inject */ (() => {{
  const sel = {selectors};
  const labels = {labels};
  const slots = Array.from(document.querySelectorAll(sel.entry))
    .map((entry) => entry.querySelector(sel.label))
    .filter(Boolean);
  let written = 0;
  slots.forEach((slot, i) => {{
    if (i < labels.length) {{
      slot.textContent = labels[i];
      written += 1;
    }}
  }});
  return written;
}})()"#,
        selectors = selectors_json(selectors),
        labels = Value::from(labels.to_vec())
    )
}

fn selectors_json(selectors: &TocSelectors) -> String {
    // A struct of strings always serializes.
    serde_json::to_string(selectors).unwrap_or_else(|_| "{}".to_string())
}
