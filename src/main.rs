//! medrender - paginated clinical-record rendering
//!
//! Main entry point for the medrender CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use medrender_config::{
    BrowserConfig, Config, ConfigLoader, ConfigValidator, ReadinessPolicySetting, TocConfig,
};
use medrender_engine::{
    ChromeLauncher, ChromeLauncherConfig, LoadSettings, PageLayout, PipelineConfig,
    ReadinessGate, ReadinessPolicy, RenderRequest, RenderService, RetryPolicy, SessionManager,
    TocResolver, TocSelectors,
};

/// medrender CLI.
#[derive(Parser)]
#[command(name = "medrender")]
#[command(about = "Render paginated clinical records to PDF with headless Chrome")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "MEDRENDER_CONFIG",
        default_value = "medrender.toml",
        global = true
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an HTML document
    Render {
        /// Input HTML file, or `-` for stdin
        input: PathBuf,

        /// Output path (defaults to the resolved filename in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Artifact filename
        #[arg(long)]
        filename: Option<String>,

        /// Write the paginated markup instead of a PDF
        #[arg(long)]
        debug: bool,

        /// Do not wait for the pagination ready flag
        #[arg(long)]
        no_wait: bool,
    },

    /// Validate configuration and locate Chrome
    Check {
        /// Also launch Chrome and report session health
        #[arg(long)]
        launch: bool,
    },
}

/// Initialize tracing with console output and a daily rolling log file.
fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = config.logging.resolved_log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("medrender")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The worker flushes on drop, so the guard must live for the whole program.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config)?;

    match cli.command {
        Commands::Render {
            input,
            output,
            filename,
            debug,
            no_wait,
        } => run_render(&config, &input, output, filename, debug, no_wait).await,
        Commands::Check { launch } => run_check(&cli.config, &config, launch).await,
    }
}

/// Render one document and write the artifact.
async fn run_render(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    filename: Option<String>,
    debug_mode: bool,
    no_wait: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting medrender v{}", env!("CARGO_PKG_VERSION"));

    let html_content = read_input(input).await?;
    let service = build_service(config).with_readiness_wait(!no_wait);

    let request = RenderRequest {
        html_content,
        filename,
        debug_mode,
    };

    let result = tokio::select! {
        result = service.render(request) => Some(result),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down browser");
            None
        }
    };

    if let Err(e) = service.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }

    let response = match result {
        Some(Ok(response)) => response,
        Some(Err(e)) => {
            error!("Render failed: {}", e);
            return Err(e.into());
        }
        None => return Err("interrupted".into()),
    };

    let path = output.unwrap_or_else(|| PathBuf::from(&response.filename));
    tokio::fs::write(&path, response.artifact.as_bytes()).await?;
    info!(
        "Wrote {} ({} bytes, {})",
        path.display(),
        response.metrics.artifact_size_bytes,
        response.artifact.content_type()
    );

    Ok(())
}

/// Validate configuration, locate Chrome and optionally launch it.
async fn run_check(
    config_path: &Path,
    config: &Config,
    launch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() {
        println!("Config: {}", config_path.display());
    } else {
        println!("Config: {} (not found, using defaults)", config_path.display());
    }

    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        println!("  warning: {}: {}", warning.path, warning.message);
    }

    let chrome = config
        .browser
        .chrome_path
        .clone()
        .or_else(ChromeLauncher::find_chrome);
    match &chrome {
        Some(path) => println!("Chrome: {}", path.display()),
        None => println!("Chrome: not found (set browser.chrome_path)"),
    }
    println!("Logs: {}", config.logging.resolved_log_dir().display());

    if !launch {
        return Ok(());
    }

    let sessions = Arc::new(SessionManager::new(ChromeLauncher::new(launcher_config(
        &config.browser,
    ))));
    let outcome = sessions.acquire().await.map(|_| ());
    let service = RenderService::new(sessions, pipeline_config(config));
    println!("{}", serde_json::to_string_pretty(&service.health())?);
    service.shutdown().await?;

    outcome.map_err(|e| e.into())
}

async fn read_input(input: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if input == Path::new("-") {
        let mut html = String::new();
        tokio::io::stdin().read_to_string(&mut html).await?;
        Ok(html)
    } else {
        Ok(tokio::fs::read_to_string(input).await?)
    }
}

fn build_service(config: &Config) -> RenderService<ChromeLauncher> {
    let launcher = ChromeLauncher::new(launcher_config(&config.browser));
    let sessions = Arc::new(SessionManager::new(launcher));
    RenderService::new(sessions, pipeline_config(config))
        .with_default_filename(config.render.default_filename.clone())
}

fn launcher_config(browser: &BrowserConfig) -> ChromeLauncherConfig {
    ChromeLauncherConfig {
        chrome_path: browser.chrome_path.clone(),
        debug_port: browser.debug_port,
        headless: browser.headless,
        launch_timeout: Duration::from_secs(browser.launch_timeout_secs),
        extra_args: browser.extra_args.clone(),
    }
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    let render = &config.render;
    let policy = match render.readiness_policy {
        ReadinessPolicySetting::Proceed => ReadinessPolicy::Proceed,
        ReadinessPolicySetting::Fail => ReadinessPolicy::Fail,
    };

    PipelineConfig {
        layout: PageLayout {
            viewport_width: render.viewport_width,
            viewport_height: render.viewport_height,
            ..Default::default()
        },
        load: LoadSettings {
            timeout: Duration::from_secs(render.load_timeout_secs),
            network_idle: Duration::from_millis(render.network_idle_ms),
        },
        retry: RetryPolicy::new(
            config.retry.max_attempts,
            Duration::from_millis(config.retry.base_delay_ms),
        ),
        readiness: ReadinessGate::new(
            Duration::from_millis(render.readiness_timeout_ms),
            Duration::from_millis(render.readiness_poll_ms),
            policy,
        ),
        toc: toc_resolver(&config.toc),
        ..Default::default()
    }
}

fn toc_resolver(toc: &TocConfig) -> TocResolver {
    TocResolver::new(
        TocSelectors {
            page: toc.page_selector.clone(),
            content: toc.content_selector.clone(),
            anchor: toc.anchor_selector.clone(),
            anchor_suffix: toc.anchor_suffix.clone(),
            entry: toc.entry_selector.clone(),
            target_attribute: toc.target_attribute.clone(),
            label: toc.label_selector.clone(),
        },
        toc.missing_label.clone(),
    )
}
