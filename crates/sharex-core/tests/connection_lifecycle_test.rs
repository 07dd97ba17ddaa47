//! Integration tests for connection lifecycle: handshake, reconnects and
//! transport rebinding.

mod common;

use common::{WAIT, harness, harness_uninitialized, next_frame};
use serde_json::json;
use sharex_core::{ConnectionState, LifecycleEvent, SdkOptions, SdkError, callback};
use std::time::Duration;
use tokio::time::{Instant, timeout};

fn options_with_public_data() -> SdkOptions {
    SdkOptions::from_value(&json!({
        "debug": {"host": "localhost", "port": 8080},
        "public_data": {"nick": "ada"}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_open_sends_handshake_and_reports_open() {
    let mut h = harness(options_with_public_data());
    let (peer, handshake) = h.accept_open().await;

    assert_eq!(peer.url(), "ws://localhost:8081");
    assert_eq!(
        handshake,
        json!({
            "action": "init_user",
            "package_name": "debug",
            "data": {"uuid": h.client.my_uuid(), "public_data": {"nick": "ada"}}
        })
    );
    assert_eq!(h.next_event().await, LifecycleEvent::Open);
    assert!(h.client.connection_status());
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_init_twice_fails() {
    let h = harness(SdkOptions::default());
    assert!(matches!(h.client.init(None), Err(SdkError::AlreadyInitialized)));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_waits_full_interval() {
    let mut h = harness(SdkOptions { reconnect_interval: 3000, ..SdkOptions::default() });
    let (peer, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Open);

    peer.close();
    assert_eq!(h.next_event().await, LifecycleEvent::Close);
    let closed_at = Instant::now();
    assert!(!h.client.connection_status());

    let early = timeout(Duration::from_millis(2999), h.listener.accept()).await;
    assert!(early.is_err(), "reconnected before the interval elapsed");
    assert_eq!(h.client.connection_state(), ConnectionState::ReconnectWaiting);

    let (_peer, handshake) = h.accept_open().await;
    assert!(closed_at.elapsed() >= Duration::from_millis(3000));
    assert_eq!(handshake["action"], json!("init_user"));
    assert_eq!(h.next_event().await, LifecycleEvent::Reconnect);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_now_cancels_timer_without_duplicates() {
    let mut h = harness(SdkOptions { reconnect_interval: 60_000, ..SdkOptions::default() });
    let (peer, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Open);

    peer.close();
    assert_eq!(h.next_event().await, LifecycleEvent::Close);
    let mut state = h.client.subscribe_state();
    state.wait_for(|s| *s == ConnectionState::ReconnectWaiting).await.unwrap();

    let cancelled_at = Instant::now();
    h.client.reconnect_now();
    let (_peer, _) = h.accept_open().await;
    assert!(cancelled_at.elapsed() < Duration::from_millis(60_000));
    assert_eq!(h.next_event().await, LifecycleEvent::Reconnect);

    // Ignored while connected, and the cancelled timer never fires.
    h.client.reconnect_now();
    let duplicate = timeout(Duration::from_secs(120), h.listener.accept()).await;
    assert!(duplicate.is_err(), "unexpected extra connection attempt");
    assert!(h.client.connection_status());
}

#[tokio::test(start_paused = true)]
async fn test_failed_attempt_reports_close_then_reconnect() {
    let mut h = harness(SdkOptions { reconnect_interval: 100, ..SdkOptions::default() });
    let first = timeout(WAIT, h.listener.accept()).await.unwrap().unwrap();
    first.error("connection refused");
    drop(first);

    assert_eq!(h.next_event().await, LifecycleEvent::Error("connection refused".to_string()));
    assert_eq!(h.next_event().await, LifecycleEvent::Close);

    let (_peer, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Reconnect);
}

#[tokio::test]
async fn test_transport_error_keeps_state() {
    let mut h = harness(SdkOptions::default());
    let (peer, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Open);

    peer.error("boom");
    assert_eq!(h.next_event().await, LifecycleEvent::Error("boom".to_string()));
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_store_follows_connection_across_reconnect() {
    let mut h = harness_uninitialized(SdkOptions { reconnect_interval: 500, ..SdkOptions::default() });
    let store = h.client.create_db_instance("game", None).unwrap();
    h.init();

    let (mut first, _) = h.accept_open().await;
    assert_eq!(
        next_frame(&mut first).await,
        json!({"action": "db_action_init_db", "data": {"db_name": "game"}})
    );
    assert_eq!(h.next_event().await, LifecycleEvent::Open);

    first.close();
    assert_eq!(h.next_event().await, LifecycleEvent::Close);
    let (mut second, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Reconnect);

    store.find("players", None, callback(|_| {})).unwrap();
    assert_eq!(
        next_frame(&mut second).await,
        json!({"action": "db_action_get_all_data", "data": {"db_name": "game", "collection": "players"}})
    );
    assert!(first.try_next_frame().is_none());
}

#[tokio::test]
async fn test_store_created_while_connected_is_bound_immediately() {
    let mut h = harness(SdkOptions::default());
    let (mut peer, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Open);

    let store = h.client.create_db_instance("scores", None).unwrap();
    assert_eq!(
        next_frame(&mut peer).await,
        json!({"action": "db_action_init_db", "data": {"db_name": "scores"}})
    );
    store.delete_by_id("rounds", "r-1", callback(|_| {})).unwrap();
    assert_eq!(next_frame(&mut peer).await["action"], json!("db_action_delete_data"));
}

#[tokio::test]
async fn test_update_public_data_is_announced_and_used_on_reconnect() {
    let mut h = harness(SdkOptions { reconnect_interval: 10, ..SdkOptions::default() });
    let (mut peer, _) = h.accept_open().await;

    h.client.update_my_public_data(json!({"nick": "grace"})).unwrap();
    assert_eq!(
        next_frame(&mut peer).await,
        json!({"action": "update_user_data", "data": {"public_data": {"nick": "grace"}}})
    );

    peer.close();
    let (_peer, handshake) = h.accept_open().await;
    assert_eq!(handshake["data"]["public_data"], json!({"nick": "grace"}));
}

#[tokio::test]
async fn test_shutdown_stops_connection() {
    let mut h = harness(SdkOptions { reconnect_interval: 10, ..SdkOptions::default() });
    let (mut peer, _) = h.accept_open().await;
    assert_eq!(h.next_event().await, LifecycleEvent::Open);

    h.client.shutdown();
    let mut state = h.client.subscribe_state();
    timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Disconnected))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(timeout(WAIT, peer.next_frame()).await.unwrap(), None);
    assert!(timeout(Duration::from_millis(100), h.listener.accept()).await.is_err());
}
