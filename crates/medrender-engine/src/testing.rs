//! Scripted launcher, session and surface shared by the unit tests.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::cdp::PrintToPdfParams;
use crate::error::RenderError;
use crate::readiness::READY_EXPRESSION;
use crate::surface::{BrowserSession, Launcher, LoadSettings, PageLayout, RenderSurface};

/// What the mock engine does when asked.
pub struct MockBehavior {
    /// Readiness polls answered `false` before the flag flips; `None` never flips.
    pub ready_after_polls: Option<u32>,
    /// Value returned by the TOC scan script.
    pub scan: Value,
    /// Number of leading `load_html` calls that fail.
    pub fail_loads: u32,
    /// Number of leading `print_pdf` calls that fail.
    pub fail_prints: u32,
    /// Number of leading `open_surface` calls that fail.
    pub fail_opens: u32,
    pub fail_surface_close: bool,
    pub fail_launch: bool,
    pub launch_delay: Duration,
    /// How long each `evaluate` blocks before answering.
    pub evaluate_delay: Duration,
    /// How long a session takes to exit once asked to close.
    pub close_delay: Duration,
    /// Refuse to launch while an earlier session's process is still alive,
    /// as a browser holding the debug port does.
    pub exclusive_port: bool,
    pub pdf: Vec<u8>,
    pub markup: String,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            ready_after_polls: Some(0),
            scan: json!({ "pages": [], "entries": [] }),
            fail_loads: 0,
            fail_prints: 0,
            fail_opens: 0,
            fail_surface_close: false,
            fail_launch: false,
            launch_delay: Duration::ZERO,
            evaluate_delay: Duration::ZERO,
            close_delay: Duration::ZERO,
            exclusive_port: false,
            pdf: b"%PDF-1.7 mock".to_vec(),
            markup: "<!DOCTYPE html><html><body>mock</body></html>".to_string(),
        }
    }
}

#[derive(Default)]
pub struct MockStats {
    pub launches: AtomicU32,
    pub sessions_closed: AtomicU32,
    pub surfaces_opened: AtomicU32,
    pub surfaces_closed: AtomicU32,
    pub loads: AtomicU32,
    pub prints: AtomicU32,
    pub ready_polls: AtomicU32,
    pub scans: AtomicU32,
    pub injects: AtomicU32,
}

impl MockStats {
    pub fn get(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

/// State shared by every mock object spawned from one launcher.
#[derive(Default)]
pub struct MockEngine {
    pub behavior: Mutex<MockBehavior>,
    pub stats: MockStats,
    /// Connection flag of the most recently launched session.
    pub connected: AtomicBool,
    /// Sessions whose process has not exited yet.
    pub live_processes: AtomicU32,
    /// Expressions passed to `evaluate`, in call order.
    pub evaluated: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            ..Default::default()
        })
    }

    /// Simulate the browser going away.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn launches(&self) -> u32 {
        MockStats::get(&self.stats.launches)
    }

    pub fn surfaces_opened(&self) -> u32 {
        MockStats::get(&self.stats.surfaces_opened)
    }

    pub fn surfaces_closed(&self) -> u32 {
        MockStats::get(&self.stats.surfaces_closed)
    }
}

pub struct MockLauncher {
    pub engine: Arc<MockEngine>,
}

impl MockLauncher {
    pub fn new(engine: Arc<MockEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    type Session = MockSession;

    async fn launch(&self) -> Result<MockSession, RenderError> {
        self.engine.stats.launches.fetch_add(1, Ordering::SeqCst);
        let (delay, fail) = {
            let behavior = self.engine.behavior.lock();
            (behavior.launch_delay, behavior.fail_launch)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(RenderError::Launch("mock launch refused".to_string()));
        }
        let exclusive = self.engine.behavior.lock().exclusive_port;
        if exclusive && self.engine.live_processes.load(Ordering::SeqCst) > 0 {
            return Err(RenderError::Launch("debug port already in use".to_string()));
        }
        self.engine.live_processes.fetch_add(1, Ordering::SeqCst);
        self.engine.connected.store(true, Ordering::SeqCst);
        Ok(MockSession {
            engine: self.engine.clone(),
            generation: self.engine.launches(),
            exited: AtomicBool::new(false),
        })
    }
}

pub struct MockSession {
    engine: Arc<MockEngine>,
    pub generation: u32,
    exited: AtomicBool,
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSession")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    type Surface = MockSurface;

    fn is_connected(&self) -> bool {
        self.generation == self.engine.launches() && self.engine.connected.load(Ordering::SeqCst)
    }

    async fn open_surface(&self) -> Result<MockSurface, RenderError> {
        {
            let mut behavior = self.engine.behavior.lock();
            if behavior.fail_opens > 0 {
                behavior.fail_opens -= 1;
                return Err(RenderError::Surface("mock target crashed".to_string()));
            }
        }
        self.engine.stats.surfaces_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSurface {
            engine: self.engine.clone(),
            ready_polls: AtomicU32::new(0),
        })
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.engine.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
        if self.generation == self.engine.launches() {
            self.engine.connected.store(false, Ordering::SeqCst);
        }
        let delay = self.engine.behavior.lock().close_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.exited.swap(true, Ordering::SeqCst) {
            self.engine.live_processes.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub struct MockSurface {
    engine: Arc<MockEngine>,
    ready_polls: AtomicU32,
}

impl fmt::Debug for MockSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSurface").finish_non_exhaustive()
    }
}

#[async_trait]
impl RenderSurface for MockSurface {
    async fn configure(&self, _layout: &PageLayout) -> Result<(), RenderError> {
        Ok(())
    }

    async fn load_html(&self, _html: &str, _settings: &LoadSettings) -> Result<(), RenderError> {
        self.engine.stats.loads.fetch_add(1, Ordering::SeqCst);
        let mut behavior = self.engine.behavior.lock();
        if behavior.fail_loads > 0 {
            behavior.fail_loads -= 1;
            return Err(RenderError::Load("mock navigation aborted".to_string()));
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, RenderError> {
        let delay = self.engine.behavior.lock().evaluate_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.engine.evaluated.lock().push(expression.to_string());
        let behavior = self.engine.behavior.lock();

        if expression == READY_EXPRESSION {
            self.engine.stats.ready_polls.fetch_add(1, Ordering::SeqCst);
            let polls = self.ready_polls.fetch_add(1, Ordering::SeqCst);
            let ready = behavior.ready_after_polls.is_some_and(|n| polls >= n);
            return Ok(Value::Bool(ready));
        }
        if expression.contains("/* toc:scan */") {
            self.engine.stats.scans.fetch_add(1, Ordering::SeqCst);
            return Ok(behavior.scan.clone());
        }
        if expression.contains("/* toc:inject */") {
            self.engine.stats.injects.fetch_add(1, Ordering::SeqCst);
            let entries = behavior.scan["entries"].as_array().map_or(0, Vec::len);
            return Ok(json!(entries));
        }
        Err(RenderError::Inspection(format!("unexpected expression: {}", expression)))
    }

    async fn print_pdf(&self, _params: &PrintToPdfParams) -> Result<Vec<u8>, RenderError> {
        self.engine.stats.prints.fetch_add(1, Ordering::SeqCst);
        let mut behavior = self.engine.behavior.lock();
        if behavior.fail_prints > 0 {
            behavior.fail_prints -= 1;
            return Err(RenderError::Export("mock printing failed".to_string()));
        }
        Ok(behavior.pdf.clone())
    }

    async fn markup(&self) -> Result<String, RenderError> {
        Ok(self.engine.behavior.lock().markup.clone())
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.engine.stats.surfaces_closed.fetch_add(1, Ordering::SeqCst);
        if self.engine.behavior.lock().fail_surface_close {
            return Err(RenderError::Surface("mock close failed".to_string()));
        }
        Ok(())
    }
}

/// Scan payload for `pages` content-bearing pages, with `anchors` given as
/// `(page, id)` pairs (1-based) and `entries` as TOC targets.
pub fn scan_payload(pages: usize, anchors: &[(usize, &str)], entries: &[&str]) -> Value {
    let pages: Vec<Value> = (1..=pages)
        .map(|index| {
            let ids: Vec<String> = anchors
                .iter()
                .filter(|(page, _)| *page == index)
                .map(|(_, id)| format!("{}-start", id))
                .collect();
            json!({ "hasContent": true, "anchors": ids })
        })
        .collect();
    json!({ "pages": pages, "entries": entries })
}
