// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end runs of the vehicle runtime: wire-shaped orders in, state and
//! visualization messages out, drivers in between.

use std::sync::Arc;
use std::time::Duration;

use vda5050_agv::test_support::{
    agv_position, description, eventually, CollectingSink, ImmediatePauseResumeHandler,
    ManualActionHandler, ManualNavigationHandler, ScriptedActionHandler,
};
use vda5050_agv::test_support::orders;
use vda5050_agv::{ActionHandler, AgvHandle, AgvHandleBuilder, MessageSink, NavigationHandler};
use vda5050_wire::{ActionStatus, BlockingType, InstantActions, Order, State};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[allow(clippy::panic)]
fn parse_order(json: &str) -> Order {
    match serde_json::from_str(json) {
        Ok(order) => order,
        Err(e) => panic!("order JSON does not parse: {e}"),
    }
}

fn action_status(state: &State, action_id: &str) -> Option<ActionStatus> {
    state.action_states.iter().find(|a| a.action_id == action_id).map(|a| a.action_status)
}

fn status_rank(status: ActionStatus) -> u8 {
    match status {
        ActionStatus::Waiting => 0,
        ActionStatus::Initializing => 1,
        ActionStatus::Running | ActionStatus::Paused => 2,
        ActionStatus::Finished | ActionStatus::Failed => 3,
    }
}

const ORDER_JSON: &str = r#"{
    "headerId": 1,
    "timestamp": "2026-03-02T10:15:30.00Z",
    "version": "2.0.0",
    "manufacturer": "acme",
    "serialNumber": "agv-042",
    "orderId": "wire-1",
    "orderUpdateId": 0,
    "nodes": [
        {
            "nodeId": "N1", "sequenceId": 0, "released": true,
            "nodePosition": {"x": 0.0, "y": 0.0, "mapId": "hall", "allowedDeviationXy": 0.5},
            "actions": [
                {"actionType": "beep", "actionId": "a-1", "blockingType": "NONE"}
            ]
        },
        {
            "nodeId": "N2", "sequenceId": 2, "released": true,
            "nodePosition": {"x": 2.0, "y": 0.0, "mapId": "hall", "allowedDeviationXy": 0.5},
            "actions": [
                {"actionType": "lift", "actionId": "a-2", "blockingType": "HARD",
                 "actionParameters": [{"key": "height", "value": 0.2}]}
            ]
        }
    ],
    "edges": [
        {"edgeId": "E1", "sequenceId": 1, "released": true,
         "startNodeId": "N1", "endNodeId": "N2"}
    ]
}"#;

#[tokio::test(flavor = "multi_thread")]
async fn wire_order_executes_and_reports_monotonic_statuses() {
    init_tracing();
    let sink = Arc::new(CollectingSink::default());
    let actions = Arc::new(ScriptedActionHandler::default());
    let navigation = Arc::new(vda5050_agv::test_support::AutoNavigationHandler::default());
    let handle = AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
        .with_state_update_period(Duration::from_millis(200))
        .with_fallback_action_handler(Arc::clone(&actions) as Arc<dyn ActionHandler>)
        .with_navigation_handler(Arc::clone(&navigation) as Arc<dyn NavigationHandler>)
        .build();
    handle.set_position(agv_position(0.0, 0.0));

    let order = parse_order(ORDER_JSON);
    assert!(handle.receive_order(order).is_ok());

    assert!(
        eventually(Duration::from_secs(2), || {
            sink.last_state().is_some_and(|s| {
                s.last_node_id == "N2"
                    && action_status(&s, "a-1") == Some(ActionStatus::Finished)
                    && action_status(&s, "a-2") == Some(ActionStatus::Finished)
            })
        })
        .await
    );

    // Across all published states, each action's status only ever moved
    // forward.
    for action_id in ["a-1", "a-2"] {
        let mut last_rank = 0;
        for state in sink.states() {
            if let Some(status) = action_status(&state, action_id) {
                let rank = status_rank(status);
                assert!(rank >= last_rank, "{action_id} went backwards to {status}");
                last_rank = rank;
            }
        }
    }

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_holds_a_running_action_and_resume_releases_it() {
    init_tracing();
    let sink = Arc::new(CollectingSink::default());
    let actions = Arc::new(ManualActionHandler::default());
    let navigation = Arc::new(ManualNavigationHandler::default());
    let handle = AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
        .with_state_update_period(Duration::from_secs(60))
        .with_fallback_action_handler(Arc::clone(&actions) as Arc<dyn ActionHandler>)
        .with_navigation_handler(Arc::clone(&navigation) as Arc<dyn NavigationHandler>)
        .with_pause_resume_handler(Arc::new(ImmediatePauseResumeHandler))
        .build();
    handle.set_position(agv_position(0.0, 0.0));

    assert!(handle.receive_order(orders::two_nodes_with_actions()).is_ok());
    assert!(
        eventually(Duration::from_secs(1), || actions.started_ids().contains(&"a-n1".to_owned()))
            .await
    );

    handle.receive_instant_actions(InstantActions {
        header: orders::header(),
        instant_actions: vec![orders::instant_action("startPause", "p-1", BlockingType::Hard)],
    });
    assert!(
        eventually(Duration::from_secs(1), || {
            sink.last_state().is_some_and(|s| {
                s.paused == Some(true) && action_status(&s, "a-n1") == Some(ActionStatus::Paused)
            })
        })
        .await
    );

    handle.receive_instant_actions(InstantActions {
        header: orders::header(),
        instant_actions: vec![orders::instant_action("stopPause", "p-2", BlockingType::Hard)],
    });
    assert!(
        eventually(Duration::from_secs(1), || {
            sink.last_state().is_some_and(|s| {
                s.paused == Some(false) && action_status(&s, "a-n1") == Some(ActionStatus::Running)
            })
        })
        .await
    );

    // The released action can now run to completion.
    if let Some(action_sink) = actions.sink("a-n1") {
        action_sink.finished();
    }
    assert!(
        eventually(Duration::from_secs(1), || {
            sink.last_state()
                .is_some_and(|s| action_status(&s, "a-n1") == Some(ActionStatus::Finished))
        })
        .await
    );

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn visualization_runs_alongside_state_publishing() {
    let sink = Arc::new(CollectingSink::default());
    let handle: AgvHandle =
        AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
            .with_state_update_period(Duration::from_millis(50))
            .build();

    handle.set_position(agv_position(3.0, 4.0));
    handle.enable_visualization(Duration::from_millis(30)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown().await;

    assert!(sink.states().len() >= 2);
    let visualizations = sink.visualizations();
    assert!(visualizations.len() >= 3);
    assert!(visualizations
        .last()
        .and_then(|v| v.agv_position.as_ref())
        .is_some_and(|p| p.x == 3.0 && p.y == 4.0));
}
