mod support;

use engine::poller::Poller;
use engine::view::{NoticeLevel, ViewEvent};
use std::sync::Arc;
use std::time::Duration;
use support::{engine, position, FakeTransport};
use tokio::sync::{mpsc, Mutex};

const INTERVAL: Duration = Duration::from_millis(500);

#[tokio::test(start_paused = true)]
async fn test_poller_emits_refresh_then_rebuild() {
    let fake = FakeTransport::with_wallets(&["w1"]);
    fake.set_positions(vec![position("w1", "T", 1_000_000, 0.0, 0)]);
    let (mut dash, _) = engine(&fake);
    dash.bootstrap().await.unwrap();
    let shared = Arc::new(Mutex::new(dash));

    let (tx, mut rx) = mpsc::channel(8);
    let mut poller = Poller::new();
    assert!(!poller.is_polling());
    poller.start(Arc::clone(&shared), INTERVAL, tx);
    assert!(poller.is_polling());

    let started = tokio::time::Instant::now();
    match rx.recv().await.unwrap() {
        ViewEvent::Refresh(snap) => assert_eq!(snap.aggregates.len(), 1),
        other => panic!("expected refresh, got {other:?}"),
    }
    assert!(started.elapsed() >= INTERVAL);

    fake.set_positions(vec![position("w1", "T", 0, 0.0, 0)]);
    loop {
        match rx.recv().await.unwrap() {
            ViewEvent::Rebuild(snap) => {
                assert_eq!(snap.aggregates[0].total_balance, 0.0);
                break;
            }
            ViewEvent::Refresh(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert!(poller.stop());
    assert!(!poller.stop());
    assert!(!poller.is_polling());
    // The task drops its sender on exit.
    while rx.recv().await.is_some() {}
}

#[tokio::test(start_paused = true)]
async fn test_poller_survives_failed_ticks() {
    let fake = FakeTransport::with_wallets(&["w1"]);
    fake.set_positions(vec![position("w1", "T", 1_000_000, 0.0, 0)]);
    let (mut dash, _) = engine(&fake);
    dash.bootstrap().await.unwrap();
    let shared = Arc::new(Mutex::new(dash));

    fake.update(|s| s.fail_positions = true);
    let (tx, mut rx) = mpsc::channel(8);
    let mut poller = Poller::new();
    poller.start(Arc::clone(&shared), INTERVAL, tx);

    for _ in 0..3 {
        match rx.recv().await.unwrap() {
            ViewEvent::Notice(notice) => {
                assert_eq!(notice.level, NoticeLevel::Error);
                assert!(notice.message.starts_with("Refresh failed"));
            }
            other => panic!("expected failure notice, got {other:?}"),
        }
    }
    assert_eq!(shared.lock().await.aggregates().len(), 1);

    fake.update(|s| s.fail_positions = false);
    loop {
        if let ViewEvent::Refresh(snap) = rx.recv().await.unwrap() {
            assert_eq!(snap.aggregates.len(), 1);
            break;
        }
    }
    poller.shutdown().await;
    assert!(!poller.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_ticks_never_overlap_user_actions() {
    let fake = FakeTransport::with_wallets(&["w1"]);
    fake.set_positions(vec![position("w1", "T", 1_000_000, 0.0, 0)]);
    let (mut dash, _) = engine(&fake);
    dash.bootstrap().await.unwrap();
    let calls_after_bootstrap = fake.state.lock().unwrap().position_calls;
    let shared = Arc::new(Mutex::new(dash));

    let (tx, mut rx) = mpsc::channel(8);
    let mut poller = Poller::new();
    poller.start(Arc::clone(&shared), INTERVAL, tx);

    {
        // Holding the engine blocks the poller; no tick runs meanwhile.
        let mut guard = shared.lock().await;
        tokio::time::sleep(INTERVAL * 4).await;
        assert_eq!(fake.state.lock().unwrap().position_calls, calls_after_bootstrap);
        guard.select_token("T").unwrap();
    }

    rx.recv().await.unwrap();
    assert_eq!(
        fake.state.lock().unwrap().position_calls,
        calls_after_bootstrap + 1
    );

    // Restarting replaces the running task rather than adding one.
    let (tx2, mut rx2) = mpsc::channel(8);
    poller.start(Arc::clone(&shared), INTERVAL, tx2);
    while rx.recv().await.is_some() {}
    assert!(matches!(rx2.recv().await.unwrap(), ViewEvent::Refresh(_)));
    poller.shutdown().await;
}
