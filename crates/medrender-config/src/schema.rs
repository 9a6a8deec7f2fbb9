//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub toc: TocConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Headless browser launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,

    /// Appended after the fixed launch flags.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            debug_port: default_debug_port(),
            headless: default_headless(),
            launch_timeout_secs: default_launch_timeout(),
            extra_args: Vec::new(),
        }
    }
}

fn default_debug_port() -> u16 {
    9333
}

fn default_headless() -> bool {
    true
}

fn default_launch_timeout() -> u64 {
    15
}

/// What to do when the pagination engine never signals readiness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessPolicySetting {
    /// Log, record the wait, and export whatever layout exists.
    #[default]
    Proceed,
    /// Treat the timeout as a render failure.
    Fail,
}

/// Layout and readiness tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout_ms: u64,

    #[serde(default = "default_readiness_poll")]
    pub readiness_poll_ms: u64,

    #[serde(default)]
    pub readiness_policy: ReadinessPolicySetting,

    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,

    #[serde(default = "default_network_idle")]
    pub network_idle_ms: u64,

    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            readiness_timeout_ms: default_readiness_timeout(),
            readiness_poll_ms: default_readiness_poll(),
            readiness_policy: ReadinessPolicySetting::default(),
            load_timeout_secs: default_load_timeout(),
            network_idle_ms: default_network_idle(),
            default_filename: default_filename(),
        }
    }
}

fn default_viewport_width() -> u32 {
    794
}

fn default_viewport_height() -> u32 {
    1123
}

fn default_readiness_timeout() -> u64 {
    120_000
}

fn default_readiness_poll() -> u64 {
    100
}

fn default_load_timeout() -> u64 {
    60
}

fn default_network_idle() -> u64 {
    500
}

fn default_filename() -> String {
    "medical_record.pdf".to_string()
}

/// Retry policy for whole render attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

/// Selectors the TOC resolver uses against the paginated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocConfig {
    #[serde(default = "default_page_selector")]
    pub page_selector: String,

    #[serde(default = "default_content_selector")]
    pub content_selector: String,

    #[serde(default = "default_anchor_selector")]
    pub anchor_selector: String,

    #[serde(default = "default_anchor_suffix")]
    pub anchor_suffix: String,

    #[serde(default = "default_entry_selector")]
    pub entry_selector: String,

    #[serde(default = "default_target_attribute")]
    pub target_attribute: String,

    #[serde(default = "default_label_selector")]
    pub label_selector: String,

    #[serde(default = "default_missing_label")]
    pub missing_label: String,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            page_selector: default_page_selector(),
            content_selector: default_content_selector(),
            anchor_selector: default_anchor_selector(),
            anchor_suffix: default_anchor_suffix(),
            entry_selector: default_entry_selector(),
            target_attribute: default_target_attribute(),
            label_selector: default_label_selector(),
            missing_label: default_missing_label(),
        }
    }
}

fn default_page_selector() -> String {
    ".pagedjs_page".to_string()
}

fn default_content_selector() -> String {
    ".pagedjs_page_content".to_string()
}

fn default_anchor_selector() -> String {
    "a[id$=\"-start\"]".to_string()
}

fn default_anchor_suffix() -> String {
    "-start".to_string()
}

fn default_entry_selector() -> String {
    "[data-toc-target]".to_string()
}

fn default_target_attribute() -> String {
    "data-toc-target".to_string()
}

fn default_label_selector() -> String {
    ".toc-pages".to_string()
}

fn default_missing_label() -> String {
    "?".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Defaults to `~/.medrender/logs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Resolve the log directory, falling back to the home directory.
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".medrender")
                .join("logs")
        })
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
