//! Chrome-backed launcher, session and surface.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cdp::{CdpClient, DeviceMetrics, PageSession, PrintToPdfParams};
use crate::error::RenderError;
use crate::surface::{BrowserSession, Launcher, LoadSettings, PageLayout, RenderSurface};

use super::ChromeLauncherConfig;

/// Fixed flags: no sandbox for containerised hosts, no GPU, and medium font
/// hinting so text metrics match between runs.
const LAUNCH_FLAGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--font-render-hinting=medium",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--metrics-recording-only",
];

const ENDPOINT_POLL: Duration = Duration::from_millis(200);

/// Spawns a private headless Chrome and connects to it over CDP.
pub struct ChromeLauncher {
    config: ChromeLauncherConfig,
}

impl ChromeLauncher {
    pub fn new(config: ChromeLauncherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChromeLauncherConfig {
        &self.config
    }

    /// Find Chrome executable path.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Full argument list for a launch using `profile_dir`.
    pub fn launch_args(&self, profile_dir: &std::path::Path) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.config.debug_port),
            format!("--user-data-dir={}", profile_dir.display()),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(LAUNCH_FLAGS.iter().map(|f| f.to_string()));
        args.extend(self.config.extra_args.iter().cloned());
        args.push("about:blank".to_string());
        args
    }

    async fn endpoint_responds(&self) -> bool {
        reqwest::get(format!("{}/json/version", self.config.endpoint()))
            .await
            .is_ok()
    }

    async fn wait_for_endpoint(&self, child: &mut Child) -> Result<(), RenderError> {
        let deadline = Instant::now() + self.config.launch_timeout;
        loop {
            if self.endpoint_responds().await {
                return Ok(());
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(RenderError::Launch(format!(
                    "Chrome exited during startup ({})",
                    status
                )));
            }
            if Instant::now() >= deadline {
                return Err(RenderError::Launch(format!(
                    "Chrome did not expose {} within {:?}",
                    self.config.endpoint(),
                    self.config.launch_timeout
                )));
            }
            tokio::time::sleep(ENDPOINT_POLL).await;
        }
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession, RenderError> {
        let chrome_path = self
            .config
            .chrome_path
            .clone()
            .or_else(Self::find_chrome)
            .ok_or_else(|| {
                RenderError::Launch("Chrome not found; set browser.chrome_path".to_string())
            })?;

        // Attaching to a browser someone else started would break exclusive
        // lifecycle ownership.
        if self.endpoint_responds().await {
            return Err(RenderError::Launch(format!(
                "debug port {} already in use",
                self.config.debug_port
            )));
        }

        let profile = TempDir::with_prefix("medrender-profile-")
            .map_err(|e| RenderError::Launch(format!("profile dir: {}", e)))?;

        info!("Launching {} (port {})", chrome_path.display(), self.config.debug_port);

        let mut child = Command::new(&chrome_path)
            .args(self.launch_args(profile.path()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        debug!("Chrome launched with PID: {:?}", child.id());

        if let Err(e) = self.wait_for_endpoint(&mut child).await {
            let _ = child.kill().await;
            return Err(e);
        }

        let client = match CdpClient::connect(&self.config.endpoint()).await {
            Ok(client) => client,
            Err(e) => {
                let _ = child.kill().await;
                return Err(RenderError::Launch(e.to_string()));
            }
        };

        info!("Connected to {} at {}", client.browser(), self.config.endpoint());

        Ok(ChromeSession {
            client,
            process: Mutex::new(Some(child)),
            _profile: profile,
        })
    }
}

/// A running Chrome process plus its CDP connection.
pub struct ChromeSession {
    client: CdpClient,
    process: Mutex<Option<Child>>,
    /// Removed from disk when the session is dropped.
    _profile: TempDir,
}

impl ChromeSession {
    pub fn client(&self) -> &CdpClient {
        &self.client
    }

    fn process_alive(&self) -> bool {
        match self.process.lock().as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Surface = PageSession;

    fn is_connected(&self) -> bool {
        self.client.is_connected() && self.process_alive()
    }

    async fn open_surface(&self) -> Result<PageSession, RenderError> {
        self.client
            .new_page()
            .await
            .map_err(|e| RenderError::Surface(format!("open page: {}", e)))
    }

    async fn close(&self) -> Result<(), RenderError> {
        if let Err(e) = self.client.close_browser().await {
            warn!("Browser.close failed, killing process: {}", e);
        }
        let child = self.process.lock().take();
        if let Some(mut child) = child {
            // Give Chrome a moment to exit on its own before killing it.
            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    let _ = child.kill().await;
                }
            }
        }
        info!("Browser session closed");
        Ok(())
    }
}

#[async_trait]
impl RenderSurface for PageSession {
    async fn configure(&self, layout: &PageLayout) -> Result<(), RenderError> {
        self.set_viewport(DeviceMetrics::new(layout.viewport_width, layout.viewport_height))
            .await
            .map_err(|e| RenderError::Surface(format!("viewport: {}", e)))?;
        self.emulate_media(&layout.media)
            .await
            .map_err(|e| RenderError::Surface(format!("media emulation: {}", e)))?;
        Ok(())
    }

    async fn load_html(&self, html: &str, settings: &LoadSettings) -> Result<(), RenderError> {
        self.set_content(html, settings.timeout, settings.network_idle)
            .await
            .map_err(|e| RenderError::Load(e.to_string()))
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, RenderError> {
        PageSession::evaluate(self, expression)
            .await
            .map_err(|e| RenderError::Inspection(e.to_string()))
    }

    async fn print_pdf(&self, params: &PrintToPdfParams) -> Result<Vec<u8>, RenderError> {
        self.print_to_pdf(params)
            .await
            .map_err(|e| RenderError::Export(e.to_string()))
    }

    async fn markup(&self) -> Result<String, RenderError> {
        self.get_content()
            .await
            .map_err(|e| RenderError::Export(e.to_string()))
    }

    async fn close(&self) -> Result<(), RenderError> {
        PageSession::close(self).await.map_err(RenderError::from)
    }
}
