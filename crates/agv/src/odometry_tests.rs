// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::test_support::{agv_position, CollectingSink};

fn setup() -> (Odometry, Arc<CollectingSink>, Arc<StateStore>) {
    let store = Arc::new(StateStore::new("acme", "agv-042"));
    let sink = Arc::new(CollectingSink::default());
    let odometry = Odometry::new(Arc::clone(&store), Arc::clone(&sink) as Arc<dyn MessageSink>);
    (odometry, sink, store)
}

#[tokio::test(flavor = "multi_thread")]
async fn visualization_loop_publishes_periodically() {
    let (odometry, sink, store) = setup();
    store.set_agv_position(agv_position(1.0, 2.0));

    odometry.enable_visualization(Duration::from_millis(40)).await;
    tokio::time::sleep(Duration::from_millis(180)).await;
    odometry.disable_visualization().await;

    let visualizations = sink.visualizations();
    assert!(visualizations.len() >= 3, "expected at least 3 messages, got {}", visualizations.len());
    assert!(visualizations[0].agv_position.as_ref().is_some_and(|p| p.x == 1.0));
    // Headers count up per message.
    for pair in visualizations.windows(2) {
        assert!(pair[0].header.header_id < pair[1].header.header_id);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn disable_stops_the_loop() {
    let (odometry, sink, _store) = setup();

    odometry.enable_visualization(Duration::from_millis(20)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    odometry.disable_visualization().await;

    let count = sink.visualizations().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.visualizations().len(), count);

    // Disabling twice is a no-op.
    odometry.disable_visualization().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn enable_after_disable_restarts_the_loop() {
    let (odometry, sink, _store) = setup();

    odometry.enable_visualization(Duration::from_millis(20)).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    odometry.disable_visualization().await;
    let first_run = sink.visualizations().len();
    assert!(first_run >= 1);

    odometry.enable_visualization(Duration::from_millis(20)).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    odometry.disable_visualization().await;
    assert!(sink.visualizations().len() > first_run);
}
