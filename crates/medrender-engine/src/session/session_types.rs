//! Session state and launcher configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Observable lifecycle of the shared engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Absent,
    Launching,
    Connected,
    Disconnected,
}

/// Chrome launch configuration.
#[derive(Debug, Clone)]
pub struct ChromeLauncherConfig {
    /// Explicit binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    /// Remote debugging port.
    pub debug_port: u16,
    pub headless: bool,
    /// How long to wait for the debugging endpoint after spawning.
    pub launch_timeout: Duration,
    /// Appended after the fixed flags.
    pub extra_args: Vec<String>,
}

impl Default for ChromeLauncherConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            debug_port: 9333,
            headless: true,
            launch_timeout: Duration::from_secs(15),
            extra_args: Vec::new(),
        }
    }
}

impl ChromeLauncherConfig {
    /// Get the CDP endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.debug_port)
    }
}
