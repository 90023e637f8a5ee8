use crate::core::errors::TrackerError;
use crate::core::session::{ActivityKind, SessionMonitor};
use crate::tests::{IDLE_TIMEOUT, create_test_auth};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn test_activity_rearms_the_deadline() {
    let _ = env_logger::try_init();
    let auth = create_test_auth();
    let monitor = SessionMonitor::start(Arc::clone(&auth), IDLE_TIMEOUT);
    let reporter = monitor.reporter();

    reporter.report(ActivityKind::PointerMove);
    sleep(5 * MINUTE).await;
    reporter.report(ActivityKind::KeyPress);
    sleep(5 * MINUTE).await;
    reporter.report(ActivityKind::Scroll);
    let last_activity = Instant::now();

    sleep(5 * MINUTE).await;
    assert_eq!(auth.sign_out_calls(), 0, "no sign-out at t=15min");
    assert_eq!(monitor.deadline(), Some(last_activity + IDLE_TIMEOUT));

    sleep(10 * MINUTE - Duration::from_secs(1)).await;
    assert_eq!(auth.sign_out_calls(), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(auth.sign_out_calls(), 1, "sign-out at t=25min");
    assert_eq!(monitor.deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn test_idle_session_expires_once() {
    let _ = env_logger::try_init();
    let auth = create_test_auth();
    let monitor = SessionMonitor::start(Arc::clone(&auth), IDLE_TIMEOUT);

    sleep(IDLE_TIMEOUT + Duration::from_secs(1)).await;
    assert_eq!(auth.sign_out_calls(), 1);

    sleep(3 * IDLE_TIMEOUT).await;
    assert_eq!(auth.sign_out_calls(), 1);
    assert!(monitor.is_running());

    // Activity after expiry arms a fresh deadline.
    monitor.reporter().report(ActivityKind::TouchStart);
    sleep(IDLE_TIMEOUT + Duration::from_secs(1)).await;
    assert_eq!(auth.sign_out_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bursts_of_events_leave_a_single_deadline() {
    let _ = env_logger::try_init();
    let auth = create_test_auth();
    let monitor = SessionMonitor::start(Arc::clone(&auth), IDLE_TIMEOUT);
    let reporter = monitor.reporter();

    for i in 0..200 {
        reporter.report(ActivityKind::ALL[i % ActivityKind::ALL.len()]);
        if i % 20 == 0 {
            sleep(Duration::from_millis(250)).await;
        }
    }
    sleep(Duration::from_millis(1)).await;
    let armed_at = Instant::now() - Duration::from_millis(1);
    assert_eq!(monitor.deadline(), Some(armed_at + IDLE_TIMEOUT));

    sleep(2 * IDLE_TIMEOUT).await;
    assert_eq!(auth.sign_out_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_page_teardown_signs_out_and_stops() {
    let _ = env_logger::try_init();
    let auth = create_test_auth();
    auth.fail_next_sign_out(TrackerError::Unavailable("offline".to_string())).await;
    let monitor = SessionMonitor::start(Arc::clone(&auth), IDLE_TIMEOUT);
    let reporter = monitor.reporter();

    assert!(reporter.page_teardown());
    sleep(Duration::from_millis(10)).await;

    // The failure is swallowed and never retried.
    assert_eq!(auth.sign_out_calls(), 1);
    assert!(!monitor.is_running());
    assert_eq!(monitor.deadline(), None);
    assert!(!reporter.report(ActivityKind::KeyPress));

    sleep(2 * IDLE_TIMEOUT).await;
    assert_eq!(auth.sign_out_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_cancels_the_pending_deadline() {
    let _ = env_logger::try_init();
    let auth = create_test_auth();
    let monitor = SessionMonitor::start(Arc::clone(&auth), IDLE_TIMEOUT);
    let reporter = monitor.reporter();
    sleep(MINUTE).await;
    assert!(monitor.deadline().is_some());

    monitor.dispose();
    sleep(2 * IDLE_TIMEOUT).await;

    assert_eq!(auth.sign_out_calls(), 0);
    assert!(!reporter.report(ActivityKind::PointerMove));
}

#[test]
fn test_dom_event_names_map_to_activity_kinds() {
    let _ = env_logger::try_init();
    assert_eq!(ActivityKind::from_event_name("mousemove"), Some(ActivityKind::PointerMove));
    assert_eq!(ActivityKind::from_event_name("keydown"), Some(ActivityKind::KeyPress));
    assert_eq!(ActivityKind::from_event_name("scroll"), Some(ActivityKind::Scroll));
    assert_eq!(ActivityKind::from_event_name("touchstart"), Some(ActivityKind::TouchStart));
    assert_eq!(ActivityKind::from_event_name("click"), None);
}
