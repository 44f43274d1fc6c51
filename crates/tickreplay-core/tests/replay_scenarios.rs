//! End-to-end replay scenarios against the in-memory store.
//!
//! Every test runs on a paused tokio clock, so one emission quantum of
//! real time costs nothing and timer interleavings are deterministic.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tickreplay_core::engine::{EngineSettings, ReplayEngine, ReplayError};
use tickreplay_core::storage::MemoryStore;
use tickreplay_core::transport::{ChannelTransport, TransportSession};
use tickreplay_types::{Instrument, ReplayState, TickRecord};
use tokio::sync::mpsc::UnboundedReceiver;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 6, 21, 9, 0, 0).unwrap()
}

fn instrument() -> Instrument {
    Instrument::new("7974").unwrap()
}

fn rec(seq: i64, secs: i64, payload: &str) -> TickRecord {
    TickRecord::new(seq, t0() + TimeDelta::seconds(secs), payload.to_owned())
}

fn engine_over(store: MemoryStore) -> ReplayEngine<MemoryStore> {
    ReplayEngine::new(Arc::new(store), EngineSettings::default())
}

fn transport() -> (Arc<dyn TransportSession>, UnboundedReceiver<String>) {
    let (transport, rx) = ChannelTransport::new();
    (Arc::new(transport), rx)
}

fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn prefetch_carries_replay_past_the_initial_window() {
    let engine = engine_over(MemoryStore::new(
        instrument(),
        vec![rec(1, 0, "A"), rec(2, 25, "B"), rec(3, 40, "C")],
    ));
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();

    advance_ms(40_500).await;
    assert_eq!(drain(&mut rx), vec!["A", "B", "C"]);
    assert!(engine.storage().window_queries() >= 5);
}

#[tokio::test(start_paused = true)]
async fn every_second_is_emitted_once_in_order() {
    let records: Vec<TickRecord> = (0..=40)
        .map(|s| rec(s, s, &s.to_string()))
        .collect();
    let engine = engine_over(MemoryStore::new(instrument(), records));
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();

    advance_ms(40_500).await;
    let expected: Vec<String> = (0..=40).map(|s: i64| s.to_string()).collect();
    assert_eq!(drain(&mut rx), expected);

    let status = engine.status().await;
    assert_eq!(status.virtual_offset, 41);
    assert!(status.buffered_buckets <= 13);
}

#[tokio::test(start_paused = true)]
async fn double_start_does_not_double_the_emission_rate() {
    let engine = engine_over(MemoryStore::new(instrument(), vec![rec(1, 0, "A")]));
    let (tx, _rx) = transport();
    engine.start(instrument(), t0(), Arc::clone(&tx)).await.unwrap();
    assert_eq!(
        engine.start(instrument(), t0(), tx).await,
        Err(ReplayError::SessionAlreadyRunning)
    );

    advance_ms(3_500).await;
    assert_eq!(engine.status().await.virtual_offset, 4);
}

#[tokio::test(start_paused = true)]
async fn latency_within_grace_still_covers_every_bucket() {
    let store = MemoryStore::new(
        instrument(),
        vec![rec(1, 0, "A"), rec(2, 26, "B"), rec(3, 37, "C")],
    )
    .with_latency(Duration::from_secs(2));
    let engine = engine_over(store);
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();

    advance_ms(40_500).await;
    assert_eq!(drain(&mut rx), vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn prefetch_slower_than_range_leaves_gaps_without_duplicates() {
    let store = MemoryStore::new(
        instrument(),
        vec![rec(1, 0, "A"), rec(2, 30, "B"), rec(3, 45, "C")],
    )
    .with_latency(Duration::from_secs(12));
    let engine = engine_over(store);
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();

    // Each result lands after the next window was scheduled and is dropped.
    advance_ms(60_000).await;
    assert_eq!(drain(&mut rx), vec!["A"]);
    assert_eq!(engine.state().await, ReplayState::Running);
}

#[tokio::test(start_paused = true)]
async fn failed_prefetch_degrades_to_gaps_and_recovers() {
    let engine = engine_over(MemoryStore::new(
        instrument(),
        vec![rec(1, 0, "A"), rec(2, 24, "B"), rec(3, 45, "C")],
    ));
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();

    advance_ms(500).await;
    engine.storage().set_unavailable(true);
    advance_ms(19_500).await;
    engine.storage().set_unavailable(false);
    advance_ms(30_000).await;

    assert_eq!(drain(&mut rx), vec!["A", "C"]);
    assert_eq!(engine.state().await, ReplayState::Running);
}

#[tokio::test(start_paused = true)]
async fn start_fails_when_storage_is_unavailable() {
    let store = MemoryStore::new(instrument(), vec![rec(1, 0, "A")]);
    store.set_unavailable(true);
    let engine = engine_over(store);
    let (tx, _rx) = transport();

    let result = engine.start(instrument(), t0(), tx).await;
    assert!(matches!(result, Err(ReplayError::StorageUnavailable(_))));
    assert_eq!(engine.state().await, ReplayState::Idle);
}

#[tokio::test(start_paused = true)]
async fn stop_halts_emission_and_resume_replays_from_the_anchor() {
    let engine = engine_over(MemoryStore::new(
        instrument(),
        vec![rec(1, 0, "A"), rec(2, 1, "B"), rec(3, 4, "C")],
    ));
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();
    advance_ms(1_500).await;
    assert_eq!(drain(&mut rx), vec!["A", "B"]);

    engine.stop().await.unwrap();
    advance_ms(5_000).await;
    assert!(drain(&mut rx).is_empty());
    assert_eq!(engine.status().await.virtual_offset, 2);

    let (tx, mut rx) = transport();
    engine.resume(tx).await.unwrap();
    advance_ms(4_500).await;
    assert_eq!(drain(&mut rx), vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn resume_failure_keeps_the_session_resumable() {
    let engine = engine_over(MemoryStore::new(instrument(), vec![rec(1, 0, "A")]));
    let (tx, _rx) = transport();
    engine.start(instrument(), t0(), Arc::clone(&tx)).await.unwrap();
    engine.stop().await.unwrap();

    engine.storage().set_unavailable(true);
    assert!(matches!(
        engine.resume(Arc::clone(&tx)).await,
        Err(ReplayError::StorageUnavailable(_))
    ));
    let status = engine.status().await;
    assert_eq!(status.state, ReplayState::Stopped);
    assert!(status.needs_resume);

    engine.storage().set_unavailable(false);
    engine.resume(tx).await.unwrap();
    assert_eq!(engine.state().await, ReplayState::Running);
}

#[tokio::test(start_paused = true)]
async fn resume_after_long_gap_refetches_from_the_original_anchor() {
    let engine = engine_over(MemoryStore::new(
        instrument(),
        vec![rec(1, 2, "A"), rec(2, 6, "B")],
    ));
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();
    advance_ms(500).await;
    assert_eq!(drain(&mut rx), vec!["A"]);
    engine.stop().await.unwrap();

    // Longer than the initial window; a wall-clock anchor would find nothing.
    advance_ms(30_000).await;
    let queries_before = engine.storage().window_queries();

    let (tx, mut rx) = transport();
    engine.resume(tx).await.unwrap();
    assert_eq!(engine.storage().window_queries(), queries_before + 1);
    assert_eq!(engine.status().await.anchor_time, Some(t0() + TimeDelta::seconds(2)));

    advance_ms(4_500).await;
    assert_eq!(drain(&mut rx), vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn prefetch_landing_after_stop_does_not_leak_into_the_resumed_session() {
    let records: Vec<TickRecord> = (0..=15)
        .map(|s| rec(s, s, &s.to_string()))
        .collect();
    let store = MemoryStore::new(instrument(), records).with_latency(Duration::from_secs(2));
    let engine = engine_over(store);
    let (tx, mut rx) = transport();
    engine.start(instrument(), t0(), tx).await.unwrap();

    // The first prefetch is scheduled at 5s and answers at 7s.
    advance_ms(6_500).await;
    let before_stop: Vec<String> = (0..=6).map(|s: i64| s.to_string()).collect();
    assert_eq!(drain(&mut rx), before_stop);
    engine.stop().await.unwrap();

    advance_ms(3_000).await;
    assert!(drain(&mut rx).is_empty());
    assert_eq!(engine.status().await.virtual_offset, 7);

    let (tx, mut rx) = transport();
    engine.resume(tx).await.unwrap();
    advance_ms(15_500).await;

    let expected: Vec<String> = (0..=15).map(|s: i64| s.to_string()).collect();
    assert_eq!(drain(&mut rx), expected);
    assert_eq!(engine.status().await.virtual_offset, 16);
}
