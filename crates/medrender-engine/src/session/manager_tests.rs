use super::*;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::RenderError;
use crate::surface::BrowserSession;
use crate::testing::{MockBehavior, MockEngine, MockLauncher};

fn manager(behavior: MockBehavior) -> (Arc<SessionManager<MockLauncher>>, Arc<MockEngine>) {
    let engine = MockEngine::new(behavior);
    let manager = Arc::new(SessionManager::new(MockLauncher::new(engine.clone())));
    (manager, engine)
}

#[tokio::test]
async fn test_initial_state_is_absent() {
    let (manager, engine) = manager(MockBehavior::default());
    assert_eq!(manager.state(), SessionState::Absent);
    assert_eq!(manager.launch_count(), 0);
    assert_eq!(engine.launches(), 0);
}

#[tokio::test]
async fn test_acquire_launches_once_and_reuses() {
    let (manager, engine) = manager(MockBehavior::default());

    let first = manager.acquire().await.unwrap();
    let second = manager.acquire().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.launches(), 1);
    assert_eq!(manager.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_acquire_is_single_flight() {
    let (manager, engine) = manager(MockBehavior {
        launch_delay: Duration::from_millis(500),
        ..Default::default()
    });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire().await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(manager.state(), SessionState::Launching);

    let mut sessions = Vec::new();
    for handle in handles {
        sessions.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(engine.launches(), 1);
    assert_eq!(manager.launch_count(), 1);
    assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    assert_eq!(manager.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_relaunch_after_disconnect() {
    let (manager, engine) = manager(MockBehavior::default());

    let first = manager.acquire().await.unwrap();
    engine.disconnect();
    assert_eq!(manager.state(), SessionState::Disconnected);
    assert!(!first.is_connected());

    let second = manager.acquire().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.is_connected());
    assert_eq!(engine.launches(), 2);
    assert_eq!(manager.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_relaunch_waits_for_stale_process_to_exit() {
    // The disconnected browser keeps its debug port until it has exited.
    let (manager, engine) = manager(MockBehavior {
        exclusive_port: true,
        close_delay: Duration::from_secs(5),
        ..Default::default()
    });

    manager.acquire().await.unwrap();
    engine.disconnect();
    assert_eq!(engine.live_processes.load(Ordering::SeqCst), 1);

    let started = tokio::time::Instant::now();
    let second = manager.acquire().await.unwrap();

    assert!(second.is_connected());
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(engine.launches(), 2);
    assert_eq!(engine.live_processes.load(Ordering::SeqCst), 1);
    assert_eq!(engine.stats.sessions_closed.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_relaunch_closes_stale_once() {
    let (manager, engine) = manager(MockBehavior {
        exclusive_port: true,
        close_delay: Duration::from_secs(5),
        ..Default::default()
    });

    manager.acquire().await.unwrap();
    engine.disconnect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(engine.launches(), 2);
    assert_eq!(engine.stats.sessions_closed.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_failed_launch_propagates_and_resets() {
    let (manager, engine) = manager(MockBehavior {
        fail_launch: true,
        ..Default::default()
    });

    let err = manager.acquire().await.unwrap_err();
    assert!(matches!(err, RenderError::Launch(_)));
    assert!(err.to_string().contains("mock launch refused"));
    assert_eq!(manager.state(), SessionState::Absent);

    // No retry inside the manager; the next acquire starts a fresh launch.
    engine.behavior.lock().fail_launch = false;
    manager.acquire().await.unwrap();
    assert_eq!(engine.launches(), 2);
}

#[tokio::test]
async fn test_shutdown_closes_and_resets() {
    let (manager, engine) = manager(MockBehavior::default());

    manager.acquire().await.unwrap();
    manager.shutdown().await.unwrap();

    assert_eq!(manager.state(), SessionState::Absent);
    assert_eq!(
        engine.stats.sessions_closed.load(Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_shutdown_when_absent_is_noop() {
    let (manager, engine) = manager(MockBehavior::default());

    manager.shutdown().await.unwrap();
    manager.shutdown().await.unwrap();

    assert_eq!(manager.state(), SessionState::Absent);
    assert_eq!(engine.launches(), 0);
    assert_eq!(
        engine.stats.sessions_closed.load(Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_acquire_after_shutdown_relaunches() {
    let (manager, engine) = manager(MockBehavior::default());

    manager.acquire().await.unwrap();
    manager.shutdown().await.unwrap();
    manager.acquire().await.unwrap();

    assert_eq!(engine.launches(), 2);
    assert_eq!(manager.state(), SessionState::Connected);
}

#[test]
fn test_session_state_serializes_lowercase() {
    let json = serde_json::to_string(&SessionState::Disconnected).unwrap();
    assert_eq!(json, "\"disconnected\"");
}

#[test]
fn test_launcher_config_endpoint() {
    let config = ChromeLauncherConfig {
        debug_port: 9444,
        ..Default::default()
    };
    assert_eq!(config.endpoint(), "http://127.0.0.1:9444");
}

#[test]
fn test_launch_args() {
    let launcher = ChromeLauncher::new(ChromeLauncherConfig {
        extra_args: vec!["--lang=fr-FR".to_string()],
        ..Default::default()
    });
    let args = launcher.launch_args(std::path::Path::new("/tmp/profile"));

    assert_eq!(args[0], "--remote-debugging-port=9333");
    assert_eq!(args[1], "--user-data-dir=/tmp/profile");
    assert!(args.contains(&"--headless=new".to_string()));
    assert!(args.contains(&"--no-sandbox".to_string()));
    assert!(args.contains(&"--font-render-hinting=medium".to_string()));
    assert_eq!(args[args.len() - 2], "--lang=fr-FR");
    assert_eq!(args.last().map(String::as_str), Some("about:blank"));
}

#[test]
fn test_launch_args_headful() {
    let launcher = ChromeLauncher::new(ChromeLauncherConfig {
        headless: false,
        ..Default::default()
    });
    let args = launcher.launch_args(std::path::Path::new("/tmp/profile"));
    assert!(!args.iter().any(|a| a.starts_with("--headless")));
}
