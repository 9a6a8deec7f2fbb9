//! SessionManager: lazy, single-flight ownership of the engine session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::surface::{BrowserSession, Launcher};

use super::SessionState;

type LaunchFuture<S> = Shared<BoxFuture<'static, Result<Arc<S>, String>>>;

enum Slot<S> {
    Absent,
    Launching(LaunchFuture<S>),
    Ready(Arc<S>),
}

/// Owns the process-wide engine session.
pub struct SessionManager<L: Launcher> {
    launcher: Arc<L>,
    slot: Mutex<Slot<L::Session>>,
    launches: AtomicU64,
}

impl<L: Launcher> SessionManager<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher: Arc::new(launcher),
            slot: Mutex::new(Slot::Absent),
            launches: AtomicU64::new(0),
        }
    }

    /// Return the connected session, launching one if there is none or the
    /// current one has disconnected.
    ///
    /// Launch failures are returned as-is; this layer never retries.
    pub async fn acquire(&self) -> Result<Arc<L::Session>, RenderError> {
        let launch = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Ready(session) if session.is_connected() => return Ok(session.clone()),
                Slot::Launching(pending) => {
                    debug!("Joining in-flight browser launch");
                    pending.clone()
                }
                Slot::Ready(_) | Slot::Absent => {
                    let stale = match std::mem::replace(&mut *slot, Slot::Absent) {
                        Slot::Ready(stale) => {
                            warn!("Browser session disconnected, relaunching");
                            Some(stale)
                        }
                        _ => None,
                    };
                    let pending = self.start_launch(stale);
                    *slot = Slot::Launching(pending.clone());
                    pending
                }
            }
        };

        let result = launch.clone().await;

        let mut slot = self.slot.lock();
        let owns_slot = matches!(&*slot, Slot::Launching(current) if current.ptr_eq(&launch));
        match result {
            Ok(session) => {
                if owns_slot {
                    *slot = Slot::Ready(session.clone());
                }
                Ok(session)
            }
            Err(message) => {
                if owns_slot {
                    *slot = Slot::Absent;
                }
                Err(RenderError::Launch(message))
            }
        }
    }

    /// Build the shared launch. A stale session is closed first: its
    /// process may still hold the resources the new one needs.
    fn start_launch(&self, stale: Option<Arc<L::Session>>) -> LaunchFuture<L::Session> {
        let launcher = self.launcher.clone();
        let attempt = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if let Some(stale) = stale {
                if let Err(e) = stale.close().await {
                    debug!("Closing stale browser session failed: {}", e);
                }
            }
            info!(attempt, "Launching browser session");
            match launcher.launch().await {
                Ok(session) => {
                    info!("Browser session connected");
                    Ok(Arc::new(session))
                }
                Err(e) => Err(e.to_string()),
            }
        }
        .boxed()
        .shared()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match &*self.slot.lock() {
            Slot::Absent => SessionState::Absent,
            Slot::Launching(_) => SessionState::Launching,
            Slot::Ready(session) if session.is_connected() => SessionState::Connected,
            Slot::Ready(_) => SessionState::Disconnected,
        }
    }

    /// Number of launches started since creation.
    pub fn launch_count(&self) -> u64 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Close the session and reset to absent. No-op when nothing is running.
    ///
    /// A launch still in flight is awaited and its session closed.
    pub async fn shutdown(&self) -> Result<(), RenderError> {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Absent);
        let session = match previous {
            Slot::Absent => return Ok(()),
            Slot::Ready(session) => session,
            Slot::Launching(pending) => match pending.await {
                Ok(session) => session,
                Err(_) => return Ok(()),
            },
        };

        info!("Closing browser session");
        session.close().await
    }
}
