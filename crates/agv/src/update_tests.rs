// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::test_support::CollectingSink;

fn setup(period: Duration) -> (StateUpdateTimer, Arc<CollectingSink>) {
    let store = Arc::new(StateStore::new("acme", "agv-042"));
    let sink = Arc::new(CollectingSink::default());
    let timer = StateUpdateTimer::new(period, store, Arc::clone(&sink) as Arc<dyn MessageSink>);
    (timer, sink)
}

#[tokio::test(flavor = "multi_thread")]
async fn heartbeat_emits_periodically() {
    let (timer, sink) = setup(Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(180)).await;
    timer.shutdown().await;

    let states = sink.states();
    assert!(states.len() >= 3, "expected at least 3 heartbeats, got {}", states.len());
    // Emissions are totally ordered by header id.
    for pair in states.windows(2) {
        assert!(pair[0].header.header_id < pair[1].header.header_id);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn high_urgency_preempts_a_long_period() {
    let (timer, sink) = setup(Duration::from_secs(60));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sink.states().len(), 0);

    timer.request_update(UpdateUrgency::High);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.states().len(), 1);
    timer.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn requests_coalesce_into_one_emission() {
    let (timer, sink) = setup(Duration::from_secs(60));

    timer.request_update(UpdateUrgency::High);
    timer.request_update(UpdateUrgency::Medium);
    timer.request_update(UpdateUrgency::High);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(sink.states().len(), 1);
    timer.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn immediate_emits_synchronously() {
    let (timer, sink) = setup(Duration::from_secs(60));

    timer.request_update(UpdateUrgency::Immediate);
    // No sleep: the state was handed over before request_update returned.
    assert_eq!(sink.states().len(), 1);

    timer.request_update(UpdateUrgency::Immediate);
    assert_eq!(sink.states().len(), 2);
    timer.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn none_urgency_is_a_no_op() {
    let (timer, sink) = setup(Duration::from_secs(60));

    timer.request_update(UpdateUrgency::None);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.states().len(), 0);
    timer.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn immediate_resets_pending_requests() {
    let (timer, sink) = setup(Duration::from_secs(60));

    timer.request_update(UpdateUrgency::Medium);
    timer.request_update(UpdateUrgency::Immediate);
    assert_eq!(sink.states().len(), 1);

    // The pending medium deadline was cleared by the immediate emission.
    tokio::time::sleep(Duration::from_millis(1700)).await;
    assert_eq!(sink.states().len(), 1);
    timer.shutdown().await;
}

#[test]
fn urgency_deadlines() {
    assert_eq!(UpdateUrgency::None.deadline(), None);
    assert_eq!(UpdateUrgency::Low.deadline(), Some(Duration::from_secs(10)));
    assert_eq!(UpdateUrgency::Medium.deadline(), Some(Duration::from_millis(1500)));
    assert_eq!(UpdateUrgency::High.deadline(), Some(Duration::from_millis(10)));
    assert_eq!(UpdateUrgency::Immediate.deadline(), Some(Duration::ZERO));
}
