// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use vda5050_wire::{ActionStatus, BlockingType, ConnectionState, InstantActions, State};

use super::*;
use crate::test_support::orders::{self, action, edge, node, order};
use crate::test_support::{
    agv_position, description, eventually, AutoNavigationHandler, CollectingSink,
    ManualActionHandler, ManualNavigationHandler, ScriptedActionHandler,
};

struct Fixture {
    handle: AgvHandle,
    sink: Arc<CollectingSink>,
    actions: Arc<ScriptedActionHandler>,
    navigation: Arc<AutoNavigationHandler>,
}

fn fixture() -> Fixture {
    let sink = Arc::new(CollectingSink::default());
    let actions = Arc::new(ScriptedActionHandler::default());
    let navigation = Arc::new(AutoNavigationHandler::default());
    let handle = AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
        .with_state_update_period(Duration::from_secs(60))
        .with_fallback_action_handler(Arc::clone(&actions) as Arc<dyn ActionHandler>)
        .with_navigation_handler(Arc::clone(&navigation) as Arc<dyn NavigationHandler>)
        .build();
    handle.set_position(agv_position(0.0, 0.0));
    Fixture { handle, sink, actions, navigation }
}

fn action_status(state: &State, action_id: &str) -> Option<ActionStatus> {
    state.action_states.iter().find(|a| a.action_id == action_id).map(|a| a.action_status)
}

#[allow(clippy::panic)]
fn must_state(sink: &CollectingSink) -> State {
    match sink.last_state() {
        Some(state) => state,
        None => panic!("no state emitted"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn accepted_order_runs_to_completion() {
    let f = fixture();

    assert!(f.handle.receive_order(orders::two_nodes_with_actions()).is_ok());

    assert!(
        eventually(Duration::from_secs(2), || {
            f.sink.last_state().is_some_and(|s| {
                s.last_node_id == "N2"
                    && !s.driving
                    && s.action_states
                        .iter()
                        .all(|a| a.action_status == ActionStatus::Finished)
            })
        })
        .await
    );

    // Both node actions ran, the single edge was traversed.
    assert_eq!(f.actions.started(), vec!["a-n1", "a-n2"]);
    assert_eq!(f.navigation.visited(), vec!["N2"]);

    let state = must_state(&f.sink);
    assert!(state.node_states.is_empty());
    assert!(state.edge_states.is_empty());
    assert!(state.errors.is_empty());

    f.handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
#[allow(clippy::panic)]
async fn unreachable_order_is_rejected() {
    let f = fixture();

    // The AGV stands at the origin; the first node sits far away.
    let mut far = order("o-9", 0, vec![node("N1", 0, true, vec![])], vec![]);
    if let Some(p) = far.nodes[0].node_position.as_mut() {
        p.x = 50.0;
    }

    let rejection = match f.handle.receive_order(far) {
        Err(rejection) => rejection,
        Ok(()) => panic!("expected a rejection"),
    };
    assert_eq!(rejection.errors.len(), 1);
    assert_eq!(rejection.errors[0].error_type, "OrderError");

    // The rejection is visible to master control with the next state.
    assert!(
        eventually(Duration::from_millis(500), || {
            f.sink.last_state().is_some_and(|s| !s.errors.is_empty())
        })
        .await
    );
    // The engine stayed untouched.
    assert!(f.navigation.visited().is_empty());

    f.handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_order_messages_are_ignored() {
    let f = fixture();
    let o = orders::two_nodes_with_actions();

    assert!(f.handle.receive_order(o.clone()).is_ok());
    assert!(
        eventually(Duration::from_secs(2), || {
            f.sink.last_state().is_some_and(|s| s.last_node_id == "N2")
        })
        .await
    );

    // The same message again: accepted, but nothing runs twice.
    assert!(f.handle.receive_order(o).is_ok());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.actions.started(), vec!["a-n1", "a-n2"]);

    f.handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn order_update_extends_the_running_order() {
    let f = fixture();
    let (base, update) = orders::base_and_update();

    assert!(f.handle.receive_order(base).is_ok());
    assert!(
        eventually(Duration::from_secs(2), || {
            f.sink.last_state().is_some_and(|s| s.last_node_id == "N2")
        })
        .await
    );

    assert!(f.handle.receive_order(update).is_ok());
    assert!(
        eventually(Duration::from_secs(2), || {
            f.sink.last_state().is_some_and(|s| s.last_node_id == "N3" && !s.driving)
        })
        .await
    );
    assert_eq!(f.navigation.visited(), vec!["N2", "N3"]);

    f.handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_action_aborts_the_order() {
    let sink = Arc::new(CollectingSink::default());
    let actions = Arc::new(ScriptedActionHandler::failing(["beep"]));
    let navigation = Arc::new(AutoNavigationHandler::default());
    let handle = AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
        .with_state_update_period(Duration::from_secs(60))
        .with_fallback_action_handler(Arc::clone(&actions) as Arc<dyn ActionHandler>)
        .with_navigation_handler(Arc::clone(&navigation) as Arc<dyn NavigationHandler>)
        .build();
    handle.set_position(agv_position(0.0, 0.0));

    assert!(handle.receive_order(orders::two_nodes_with_actions()).is_ok());

    assert!(
        eventually(Duration::from_secs(2), || {
            sink.last_state().is_some_and(|s| {
                action_status(&s, "a-n1") == Some(ActionStatus::Failed)
                    && action_status(&s, "a-n2") == Some(ActionStatus::Failed)
            })
        })
        .await
    );
    let state = must_state(&sink);
    assert!(state.errors.iter().any(|e| e.error_type == "ActionError"));
    // The order never got past the first node.
    assert!(navigation.visited().is_empty());

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_order_drains_a_running_order() {
    let sink = Arc::new(CollectingSink::default());
    let actions = Arc::new(ManualActionHandler::default());
    let navigation = Arc::new(ManualNavigationHandler::default());
    let handle = AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
        .with_state_update_period(Duration::from_secs(60))
        .with_fallback_action_handler(Arc::clone(&actions) as Arc<dyn ActionHandler>)
        .with_navigation_handler(Arc::clone(&navigation) as Arc<dyn NavigationHandler>)
        .build();
    handle.set_position(agv_position(0.0, 0.0));

    assert!(handle.receive_order(orders::two_nodes_with_actions()).is_ok());
    assert!(
        eventually(Duration::from_secs(1), || actions.started_ids().contains(&"a-n1".to_owned()))
            .await
    );

    handle.receive_instant_actions(InstantActions {
        header: orders::header(),
        instant_actions: vec![orders::instant_action("cancelOrder", "c-1", BlockingType::Hard)],
    });

    assert!(
        eventually(Duration::from_secs(2), || {
            sink.last_state().is_some_and(|s| {
                action_status(&s, "c-1") == Some(ActionStatus::Finished)
                    && action_status(&s, "a-n1") == Some(ActionStatus::Failed)
                    && action_status(&s, "a-n2") == Some(ActionStatus::Failed)
                    && s.node_states.is_empty()
                    && s.edge_states.is_empty()
            })
        })
        .await
    );
    assert_eq!(actions.cancelled.lock().clone(), vec!["a-n1".to_owned()]);

    // A follow-up order is accepted once the cancellation drained.
    let next = order("o-2", 0, vec![node("N1", 0, true, vec![])], vec![]);
    assert!(handle.receive_order(next).is_ok());

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_messages_count_their_headers() {
    let f = fixture();
    let online = f.handle.connection_message(ConnectionState::Online);
    let offline = f.handle.connection_message(ConnectionState::Offline);

    assert_eq!(online.header.header_id, 1);
    assert_eq!(online.connection_state, ConnectionState::Online);
    assert_eq!(offline.header.header_id, 2);
    assert_eq!(online.header.manufacturer, "acme");

    f.handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn edge_actions_run_during_traversal() {
    let sink = Arc::new(CollectingSink::default());
    let actions = Arc::new(ScriptedActionHandler::default());
    let navigation = Arc::new(ManualNavigationHandler::default());
    let handle = AgvHandleBuilder::new(description(None), Arc::clone(&sink) as Arc<dyn MessageSink>)
        .with_state_update_period(Duration::from_secs(60))
        .with_fallback_action_handler(Arc::clone(&actions) as Arc<dyn ActionHandler>)
        .with_navigation_handler(Arc::clone(&navigation) as Arc<dyn NavigationHandler>)
        .build();
    handle.set_position(agv_position(0.0, 0.0));

    let o = order(
        "o-1",
        0,
        vec![node("N1", 0, true, vec![]), node("N2", 2, true, vec![])],
        vec![edge("E1", 1, "N1", "N2", true, vec![action("log", "a-e1", BlockingType::None)])],
    );
    assert!(handle.receive_order(o).is_ok());

    // The NONE edge action starts while the traversal is still pending.
    assert!(
        eventually(Duration::from_secs(1), || actions.started().contains(&"a-e1".to_owned()))
            .await
    );
    assert_eq!(navigation.pending_node().as_deref(), Some("N2"));

    assert!(navigation.arrive());
    assert!(
        eventually(Duration::from_secs(2), || {
            sink.last_state().is_some_and(|s| s.last_node_id == "N2" && !s.driving)
        })
        .await
    );

    handle.shutdown().await;
}
