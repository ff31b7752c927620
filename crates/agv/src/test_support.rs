// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit and integration tests: scripted drivers, a
//! collecting message sink and small order builders.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use vda5050_wire::{Action, AgvPosition, Node, State, Visualization};

use crate::description::{
    Acceleration, ActionDeclaration, AgvDescription, Battery, DrivingMode, Kinematic,
    NavigationProfile, VelocityLimit,
};
use crate::handler::{
    ActionHandler, ActionSink, InitializePositionError, NavigationHandler, NavigationSink,
    OdometryHandler, PauseResumeHandler, PauseResumeSink,
};
use crate::update::MessageSink;

/// A plausible AGV description with the given action declarations.
pub fn description(supported_actions: Option<Vec<ActionDeclaration>>) -> AgvDescription {
    AgvDescription {
        agv_id: "agv-042".to_owned(),
        manufacturer: "acme".to_owned(),
        serial_number: "042".to_owned(),
        description: String::new(),
        battery: Battery {
            max_reach: None,
            max_charge: 1.2,
            max_voltage: 24.0,
            charge_type: "inductive".to_owned(),
        },
        navigation: NavigationProfile {
            driving_mode: DrivingMode::Free,
            kinematic: Kinematic::Differential,
            max_velocity: VelocityLimit { linear: 1.5, angular: None },
            max_acceleration: Acceleration::default(),
            max_deceleration: Acceleration::default(),
            min_turning_radius: 0.0,
        },
        weight: 120.0,
        supported_actions,
    }
}

/// An initialized AGV position with a small deviation range.
pub fn agv_position(x: f64, y: f64) -> AgvPosition {
    AgvPosition {
        x,
        y,
        theta: 0.0,
        map_id: "hall".to_owned(),
        map_description: None,
        position_initialized: true,
        localization_score: None,
        deviation_range: Some(0.1),
    }
}

/// Message sink that records everything it is handed.
#[derive(Default)]
pub struct CollectingSink {
    states: Mutex<Vec<State>>,
    visualizations: Mutex<Vec<Visualization>>,
}

impl CollectingSink {
    pub fn states(&self) -> Vec<State> {
        self.states.lock().clone()
    }

    pub fn visualizations(&self) -> Vec<Visualization> {
        self.visualizations.lock().clone()
    }

    pub fn last_state(&self) -> Option<State> {
        self.states.lock().last().cloned()
    }
}

impl MessageSink for CollectingSink {
    fn send_state(&self, state: State) {
        self.states.lock().push(state);
    }

    fn send_visualization(&self, visualization: Visualization) {
        self.visualizations.lock().push(visualization);
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// -- Scripted drivers ----------------------------------------------------------

/// Action driver that acknowledges and finishes every action immediately.
#[derive(Default)]
pub struct ScriptedActionHandler {
    /// Action types that fail instead of finishing.
    pub fail_types: Vec<String>,
    started: Mutex<Vec<String>>,
}

impl ScriptedActionHandler {
    pub fn failing(types: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            fail_types: types.into_iter().map(str::to_owned).collect(),
            started: Mutex::new(vec![]),
        }
    }

    /// Ids of all actions this driver was asked to start, in order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }
}

impl ActionHandler for ScriptedActionHandler {
    fn start(&self, action: Action, sink: ActionSink) -> anyhow::Result<()> {
        self.started.lock().push(action.action_id.clone());
        sink.started();
        if self.fail_types.contains(&action.action_type) {
            sink.failed("scripted failure");
        } else {
            sink.finished();
        }
        Ok(())
    }

    fn pause(&self, _action_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn resume(&self, _action_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn cancel(&self, _action_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Action driver the test drives by hand through the retained sinks.
#[derive(Default)]
pub struct ManualActionHandler {
    sinks: Mutex<HashMap<String, ActionSink>>,
    pub paused: Mutex<Vec<String>>,
    pub resumed: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
}

impl ManualActionHandler {
    pub fn sink(&self, action_id: &str) -> Option<ActionSink> {
        self.sinks.lock().get(action_id).cloned()
    }

    pub fn started_ids(&self) -> Vec<String> {
        self.sinks.lock().keys().cloned().collect()
    }
}

impl ActionHandler for ManualActionHandler {
    fn start(&self, action: Action, sink: ActionSink) -> anyhow::Result<()> {
        sink.started();
        self.sinks.lock().insert(action.action_id, sink);
        Ok(())
    }

    fn pause(&self, action_id: &str) -> anyhow::Result<()> {
        self.paused.lock().push(action_id.to_owned());
        if let Some(sink) = self.sink(action_id) {
            sink.paused();
        }
        Ok(())
    }

    fn resume(&self, action_id: &str) -> anyhow::Result<()> {
        self.resumed.lock().push(action_id.to_owned());
        if let Some(sink) = self.sink(action_id) {
            sink.resumed();
        }
        Ok(())
    }

    fn cancel(&self, action_id: &str) -> anyhow::Result<()> {
        self.cancelled.lock().push(action_id.to_owned());
        if let Some(sink) = self.sink(action_id) {
            sink.failed("cancelled");
        }
        Ok(())
    }
}

/// Navigation driver that reports every requested node as reached at once.
#[derive(Default)]
pub struct AutoNavigationHandler {
    visited: Mutex<Vec<String>>,
}

impl AutoNavigationHandler {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

impl NavigationHandler for AutoNavigationHandler {
    fn navigate_to_node(&self, node: Node, sink: NavigationSink) -> anyhow::Result<()> {
        self.visited.lock().push(node.node_id.clone());
        sink.reached(node.node_id);
        Ok(())
    }

    fn cancel(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Navigation driver the test steps manually.
#[derive(Default)]
pub struct ManualNavigationHandler {
    pending: Mutex<Option<(Node, NavigationSink)>>,
    pub cancelled: Mutex<usize>,
}

impl ManualNavigationHandler {
    /// Target of the pending traversal, if any.
    pub fn pending_node(&self) -> Option<String> {
        self.pending.lock().as_ref().map(|(node, _)| node.node_id.clone())
    }

    /// Complete the pending traversal.
    pub fn arrive(&self) -> bool {
        let Some((node, sink)) = self.pending.lock().take() else {
            return false;
        };
        sink.reached(node.node_id);
        true
    }
}

impl NavigationHandler for ManualNavigationHandler {
    fn navigate_to_node(&self, node: Node, sink: NavigationSink) -> anyhow::Result<()> {
        *self.pending.lock() = Some((node, sink));
        Ok(())
    }

    fn cancel(&self) -> anyhow::Result<()> {
        *self.cancelled.lock() += 1;
        self.pending.lock().take();
        Ok(())
    }
}

/// Pause/resume driver that acknowledges, pauses running activity and
/// finishes in one go.
#[derive(Default)]
pub struct ImmediatePauseResumeHandler;

impl PauseResumeHandler for ImmediatePauseResumeHandler {
    fn do_pause(&self, sink: PauseResumeSink) -> anyhow::Result<()> {
        sink.started();
        sink.notify_running_actions();
        sink.notify_running_navigation();
        sink.finished();
        Ok(())
    }

    fn do_resume(&self, sink: PauseResumeSink) -> anyhow::Result<()> {
        sink.started();
        sink.notify_running_actions();
        sink.notify_running_navigation();
        sink.finished();
        Ok(())
    }
}

/// Odometry driver that records initializations; optionally failing.
#[derive(Default)]
pub struct FixedOdometryHandler {
    pub fail_with: Option<String>,
    initialized: Mutex<Vec<AgvPosition>>,
}

impl FixedOdometryHandler {
    pub fn failing(message: impl Into<String>) -> Self {
        Self { fail_with: Some(message.into()), initialized: Mutex::new(vec![]) }
    }

    pub fn initialized(&self) -> Vec<AgvPosition> {
        self.initialized.lock().clone()
    }
}

impl OdometryHandler for FixedOdometryHandler {
    fn initialize_position(&self, position: &AgvPosition) -> Result<(), InitializePositionError> {
        if let Some(message) = &self.fail_with {
            return Err(InitializePositionError(message.clone()));
        }
        self.initialized.lock().push(position.clone());
        Ok(())
    }
}

// -- Order builders ------------------------------------------------------------

pub mod orders {
    use vda5050_wire::{
        Action, ActionParameter, ActionParameterValue, BlockingType, Edge, Header, Node,
        NodePosition, Order,
    };

    pub fn header() -> Header {
        Header::now(1, "acme", "agv-042")
    }

    pub fn action(action_type: &str, action_id: &str, blocking_type: BlockingType) -> Action {
        Action {
            action_type: action_type.to_owned(),
            action_id: action_id.to_owned(),
            action_description: None,
            blocking_type,
            action_parameters: vec![],
        }
    }

    pub fn action_with_params(
        action_type: &str,
        action_id: &str,
        blocking_type: BlockingType,
        params: Vec<(&str, ActionParameterValue)>,
    ) -> Action {
        let mut action = action(action_type, action_id, blocking_type);
        action.action_parameters = params
            .into_iter()
            .map(|(key, value)| ActionParameter { key: key.to_owned(), value })
            .collect();
        action
    }

    /// Alias making call sites explicit about the instant context.
    pub fn instant_action(action_type: &str, action_id: &str, blocking: BlockingType) -> Action {
        action(action_type, action_id, blocking)
    }

    pub fn node_position(x: f64, y: f64) -> NodePosition {
        NodePosition {
            x,
            y,
            theta: None,
            allowed_deviation_xy: Some(0.5),
            allowed_deviation_theta: None,
            map_id: "hall".to_owned(),
            map_description: None,
        }
    }

    pub fn node(node_id: &str, sequence_id: u64, released: bool, actions: Vec<Action>) -> Node {
        Node {
            node_id: node_id.to_owned(),
            sequence_id,
            node_description: None,
            released,
            node_position: Some(node_position(sequence_id as f64, 0.0)),
            actions,
        }
    }

    pub fn edge(
        edge_id: &str,
        sequence_id: u64,
        start: &str,
        end: &str,
        released: bool,
        actions: Vec<Action>,
    ) -> Edge {
        Edge {
            edge_id: edge_id.to_owned(),
            sequence_id,
            edge_description: None,
            released,
            start_node_id: start.to_owned(),
            end_node_id: end.to_owned(),
            max_speed: None,
            max_height: None,
            min_height: None,
            orientation: None,
            direction: None,
            rotation_allowed: None,
            max_rotation_speed: None,
            length: None,
            trajectory: None,
            actions,
        }
    }

    pub fn order(order_id: &str, order_update_id: u64, nodes: Vec<Node>, edges: Vec<Edge>) -> Order {
        Order {
            header: header(),
            order_id: order_id.to_owned(),
            order_update_id,
            zone_set_id: None,
            nodes,
            edges,
        }
    }

    /// `N1 --E1--> N2`, one NONE action on each node, fully released.
    pub fn two_nodes_with_actions() -> Order {
        order(
            "o-1",
            0,
            vec![
                node("N1", 0, true, vec![action("beep", "a-n1", BlockingType::None)]),
                node("N2", 2, true, vec![action("beep", "a-n2", BlockingType::None)]),
            ],
            vec![edge("E1", 1, "N1", "N2", true, vec![])],
        )
    }

    /// A released base `N1-E1-N2` with horizon `E2-N3`, and the update that
    /// releases the horizon.
    pub fn base_and_update() -> (Order, Order) {
        let base = order(
            "o-1",
            0,
            vec![
                node("N1", 0, true, vec![]),
                node("N2", 2, true, vec![]),
                node("N3", 4, false, vec![]),
            ],
            vec![
                edge("E1", 1, "N1", "N2", true, vec![]),
                edge("E2", 3, "N2", "N3", false, vec![]),
            ],
        );
        let update = order(
            "o-1",
            1,
            vec![node("N2", 2, true, vec![]), node("N3", 4, true, vec![])],
            vec![edge("E2", 3, "N2", "N3", true, vec![])],
        );
        (base, update)
    }
}
