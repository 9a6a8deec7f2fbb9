//! Browser session lifecycle.
//!
//! [`SessionManager`] owns the single long-lived engine connection. It is
//! created lazily on first use, relaunched after the connection drops, and
//! torn down only by [`SessionManager::shutdown`]. Concurrent callers that
//! arrive while a launch is in flight share that launch.

pub mod chrome;
mod manager;
mod session_types;

pub use chrome::{ChromeLauncher, ChromeSession};
pub use manager::SessionManager;
pub use session_types::{ChromeLauncherConfig, SessionState};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
