//! Integration tests against a real Chrome.
//!
//! These tests require Chrome to be installed on the system.
//! Run with: cargo test -p medrender-engine --test integration_test -- --ignored --nocapture

use std::sync::Arc;
use std::time::Duration;

use medrender_engine::{
    ChromeLauncher, ChromeLauncherConfig, PipelineConfig, ReadinessGate, ReadinessPolicy,
    RenderArtifact, RenderRequest, RenderService, SessionManager, SessionState,
};

/// Paginated by hand: three page containers, the second one blank.
const DOCUMENT: &str = r#"<!DOCTYPE html>
<html>
<head><style>@page { size: A4; margin: 0 }</style></head>
<body>
  <nav>
    <div data-toc-target="history">History <span class="toc-pages"></span></div>
    <div data-toc-target="labs">Labs <span class="toc-pages"></span></div>
    <div data-toc-target="imaging">Imaging <span class="toc-pages"></span></div>
  </nav>
  <div class="pagedjs_page"><div class="pagedjs_page_content">
    <a id="history-start"></a><h1>History</h1><p>Presenting complaint.</p>
  </div></div>
  <div class="pagedjs_page"><div class="pagedjs_page_content">   </div></div>
  <div class="pagedjs_page"><div class="pagedjs_page_content">
    <a id="labs-start"></a><h1>Labs</h1><p>CBC within range.</p>
  </div></div>
  <script>setTimeout(() => { window._pdfReady = true }, 200)</script>
</body>
</html>"#;

fn test_service() -> RenderService<ChromeLauncher> {
    let launcher = ChromeLauncher::new(ChromeLauncherConfig {
        debug_port: 9335,
        launch_timeout: Duration::from_secs(20),
        ..Default::default()
    });
    let config = PipelineConfig {
        readiness: ReadinessGate::new(
            Duration::from_secs(10),
            Duration::from_millis(100),
            ReadinessPolicy::Proceed,
        ),
        ..Default::default()
    };
    RenderService::new(Arc::new(SessionManager::new(launcher)), config)
}

#[test]
#[ignore = "requires a local Chrome"]
fn test_chrome_detection() {
    let chrome_path = ChromeLauncher::find_chrome();
    assert!(chrome_path.is_some(), "Chrome should be installed on the system");
    println!("Found Chrome at: {}", chrome_path.unwrap().display());
}

#[tokio::test]
#[ignore = "requires a local Chrome"]
async fn test_render_pdf_and_debug_markup() {
    let service = test_service();

    let response = service.render(RenderRequest::new(DOCUMENT)).await;
    assert!(response.is_ok(), "Render should succeed: {:?}", response.err());
    let response = response.unwrap();

    assert!(response.artifact.as_bytes().starts_with(b"%PDF"));
    assert_eq!(response.metrics.page_count, 2);
    assert_eq!(response.metrics.toc_injected, 2);
    assert_eq!(response.metrics.toc_missing, 1);
    assert_eq!(service.session_state(), SessionState::Connected);

    let debug = service
        .render(RenderRequest {
            html_content: DOCUMENT.to_string(),
            filename: None,
            debug_mode: true,
        })
        .await
        .unwrap();
    assert_eq!(debug.filename, "medical_record.html");
    match debug.artifact {
        RenderArtifact::Markup(markup) => {
            assert!(markup.starts_with("<!DOCTYPE html>"));
            assert!(markup.contains(r#"<span class="toc-pages">1</span>"#));
            assert!(markup.contains(r#"<span class="toc-pages">2</span>"#));
            assert!(markup.contains(r#"<span class="toc-pages">?</span>"#));
        }
        RenderArtifact::Pdf(_) => panic!("debug mode should return markup"),
    }

    service.shutdown().await.unwrap();
    assert_eq!(service.session_state(), SessionState::Absent);
}
