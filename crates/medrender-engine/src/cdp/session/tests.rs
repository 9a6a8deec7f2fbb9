use tokio::time::{Duration, advance};

use super::network::NetworkTracker;

#[tokio::test(start_paused = true)]
async fn test_tracker_idle_after_quiet_period() {
    let mut tracker = NetworkTracker::new();
    assert!(!tracker.is_idle(Duration::from_millis(500)));

    advance(Duration::from_millis(500)).await;
    assert!(tracker.is_idle(Duration::from_millis(500)));

    tracker.observe("Network.requestWillBeSent", Some("r1"));
    advance(Duration::from_secs(2)).await;
    assert!(!tracker.is_idle(Duration::from_millis(500)));
    assert_eq!(tracker.inflight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tracker_finished_and_failed_requests() {
    let mut tracker = NetworkTracker::new();
    tracker.observe("Network.requestWillBeSent", Some("r1"));
    tracker.observe("Network.requestWillBeSent", Some("r2"));
    tracker.observe("Network.loadingFinished", Some("r1"));
    tracker.observe("Network.loadingFailed", Some("r2"));
    assert_eq!(tracker.inflight(), 0);

    advance(Duration::from_millis(499)).await;
    assert!(!tracker.is_idle(Duration::from_millis(500)));
    advance(Duration::from_millis(1)).await;
    assert!(tracker.is_idle(Duration::from_millis(500)));
}

#[tokio::test(start_paused = true)]
async fn test_tracker_ignores_other_events() {
    let mut tracker = NetworkTracker::new();
    advance(Duration::from_secs(1)).await;
    tracker.observe("Page.loadEventFired", None);
    tracker.observe("Network.dataReceived", Some("r9"));
    assert!(tracker.is_idle(Duration::from_millis(500)));
}

#[tokio::test(start_paused = true)]
async fn test_tracker_reset() {
    let mut tracker = NetworkTracker::new();
    tracker.observe("Network.requestWillBeSent", Some("stale"));
    tracker.reset();
    assert_eq!(tracker.inflight(), 0);
}
