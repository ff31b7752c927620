// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The vehicle state store.
//!
//! Single writer / many readers behind one mutex; every subsystem goes
//! through the coarse-grained accessors here. The store accumulates the wire
//! [`State`] plus the bookkeeping that does not travel: the accepted order,
//! per-topic header counters and the driven-distance tracker.

use parking_lot::Mutex;

use vda5050_wire::{
    Action, ActionState, ActionStatus, AgvPosition, BatteryState, Error, Header, NodeState,
    EdgeState, OperatingMode, Order, SafetyState, State, Velocity, Visualization,
};

use crate::geometry::{PathLength, Vec2};

/// Mutex-protected vehicle state.
pub struct StateStore {
    inner: Mutex<StateData>,
}

struct StateData {
    state: State,
    /// The accepted order with all updates merged in; `None` when no order
    /// was ever accepted or the last one was cleared.
    order: Option<Order>,
    /// Action ids that arrived as instant actions rather than with an order.
    instant_ids: std::collections::BTreeSet<String>,
    state_header_id: u64,
    visualization_header_id: u64,
    distance: PathLength,
}

impl StateStore {
    pub fn new(manufacturer: impl Into<String>, serial_number: impl Into<String>) -> Self {
        let state = State {
            header: Header::now(0, manufacturer, serial_number),
            order_id: String::new(),
            order_update_id: 0,
            zone_set_id: None,
            last_node_id: String::new(),
            last_node_sequence_id: 0,
            driving: false,
            paused: None,
            new_base_request: None,
            distance_since_last_node: None,
            operating_mode: OperatingMode::Automatic,
            node_states: vec![],
            edge_states: vec![],
            agv_position: None,
            velocity: None,
            loads: vec![],
            action_states: vec![],
            battery_state: BatteryState::default(),
            errors: vec![],
            information: vec![],
            safety_state: SafetyState::default(),
        };
        Self {
            inner: Mutex::new(StateData {
                state,
                order: None,
                instant_ids: Default::default(),
                state_header_id: 0,
                visualization_header_id: 0,
                distance: PathLength::new(),
            }),
        }
    }

    // -- Order bookkeeping ----------------------------------------------------

    /// Install a freshly accepted order.
    ///
    /// Replaces node/edge states with the new graph and resets the action
    /// states to the order's released actions; action states of still-running
    /// instant actions survive, finished ones are dropped with the old order.
    pub fn set_order(&self, order: &Order) {
        let mut data = self.inner.lock();
        data.state.order_id = order.order_id.clone();
        data.state.order_update_id = order.order_update_id;
        data.state.zone_set_id = order.zone_set_id.clone();
        data.state.errors.clear();

        data.state.node_states = order.nodes.iter().map(node_state_of).collect();
        data.state.edge_states = order.edges.iter().map(edge_state_of).collect();

        let mut action_states: Vec<ActionState> = data
            .state
            .action_states
            .iter()
            .filter(|a| data.instant_ids.contains(&a.action_id) && !a.action_status.is_terminal())
            .cloned()
            .collect();
        data.instant_ids.retain(|id| action_states.iter().any(|a| &a.action_id == id));
        for action in order_actions(order) {
            action_states.push(waiting_state_of(action));
        }
        data.state.action_states = action_states;
        data.order = Some(order.clone());
    }

    /// Merge an order update: the released tail is appended, the horizon
    /// replaced wholesale.
    pub fn extend_order(&self, update: &Order) {
        let mut data = self.inner.lock();

        let last_released = data
            .order
            .as_ref()
            .map(|o| last_released_sequence(o))
            .unwrap_or(0);

        if let Some(order) = data.order.as_mut() {
            order.order_update_id = update.order_update_id;
            order.nodes.retain(|n| n.released);
            order.edges.retain(|e| e.released);
            order
                .nodes
                .extend(update.nodes.iter().filter(|n| n.sequence_id > last_released).cloned());
            order
                .edges
                .extend(update.edges.iter().filter(|e| e.sequence_id > last_released).cloned());
        }

        data.state.order_update_id = update.order_update_id;
        data.state.node_states.retain(|n| n.released);
        data.state.edge_states.retain(|e| e.released);
        for node in update.nodes.iter().filter(|n| n.sequence_id > last_released) {
            data.state.node_states.push(node_state_of(node));
        }
        for edge in update.edges.iter().filter(|e| e.sequence_id > last_released) {
            data.state.edge_states.push(edge_state_of(edge));
        }
        for action in order_actions(update) {
            if !data.state.action_states.iter().any(|a| a.action_id == action.action_id) {
                data.state.action_states.push(waiting_state_of(action));
            }
        }
    }

    /// Drop the order graph after cancellation. Action states stay
    /// reportable until the next order arrives.
    pub fn clear_order(&self) {
        let mut data = self.inner.lock();
        data.order = None;
        data.state.node_states.clear();
        data.state.edge_states.clear();
        data.state.driving = false;
        data.state.new_base_request = None;
    }

    /// Run a closure against the currently accepted order.
    pub fn with_order<R>(&self, f: impl FnOnce(Option<&Order>) -> R) -> R {
        let data = self.inner.lock();
        f(data.order.as_ref())
    }

    /// Remove the node state at `sequence_id` once the node was reached.
    pub fn take_node_state(&self, sequence_id: u64) {
        let mut data = self.inner.lock();
        data.state.node_states.retain(|n| n.sequence_id != sequence_id);
    }

    /// Remove the edge state at `sequence_id` once the edge was traversed.
    pub fn take_edge_state(&self, sequence_id: u64) {
        let mut data = self.inner.lock();
        data.state.edge_states.retain(|e| e.sequence_id != sequence_id);
    }

    // -- Action states --------------------------------------------------------

    /// Track a freshly received instant action, starting at WAITING.
    pub fn add_instant_action_state(&self, action: &Action) {
        let mut data = self.inner.lock();
        data.instant_ids.insert(action.action_id.clone());
        data.state.action_states.push(waiting_state_of(action));
    }

    /// Move an action to a new status.
    ///
    /// Terminal statuses are absorbing: an attempt to leave FINISHED or
    /// FAILED is ignored and logged.
    pub fn set_action_status(&self, action_id: &str, status: ActionStatus) {
        let mut data = self.inner.lock();
        match data.state.action_states.iter_mut().find(|a| a.action_id == action_id) {
            Some(entry) if entry.action_status.is_terminal() => {
                tracing::warn!(
                    action_id,
                    from = %entry.action_status,
                    to = %status,
                    "ignoring status transition out of a terminal state"
                );
            }
            Some(entry) => entry.action_status = status,
            None => tracing::warn!(action_id, "status update for unknown action"),
        }
    }

    /// Attach a result description, e.g. the payload of an RFID read.
    pub fn set_action_result(&self, action_id: &str, result: impl Into<String>) {
        let mut data = self.inner.lock();
        if let Some(entry) = data.state.action_states.iter_mut().find(|a| a.action_id == action_id)
        {
            entry.result_description = Some(result.into());
        }
    }

    pub fn action_status(&self, action_id: &str) -> Option<ActionStatus> {
        let data = self.inner.lock();
        data.state
            .action_states
            .iter()
            .find(|a| a.action_id == action_id)
            .map(|a| a.action_status)
    }

    // -- Errors ---------------------------------------------------------------

    pub fn add_error(&self, error: Error) {
        let mut data = self.inner.lock();
        data.state.errors.push(error);
    }

    pub fn append_errors(&self, errors: impl IntoIterator<Item = Error>) {
        let mut data = self.inner.lock();
        data.state.errors.extend(errors);
    }

    // -- Position, motion & mode ----------------------------------------------

    /// Record the node the AGV most recently reached and restart the
    /// driven-distance tracking from it.
    pub fn set_last_node(&self, node_id: impl Into<String>, sequence_id: u64) {
        let mut data = self.inner.lock();
        data.state.last_node_id = node_id.into();
        data.state.last_node_sequence_id = sequence_id;
        data.distance.reset();
        let vertex = data.state.agv_position.as_ref().map(|p| Vec2::new(p.x, p.y));
        if let Some(vertex) = vertex {
            data.distance.push(vertex);
        }
        data.state.distance_since_last_node = Some(0.0);
    }

    /// Record the last node by id only; the sequence id is recovered from the
    /// accepted order when the node is part of it.
    pub fn set_last_node_id(&self, node_id: impl Into<String>) {
        let node_id = node_id.into();
        let sequence_id = self.with_order(|order| {
            order.and_then(|o| {
                o.nodes.iter().find(|n| n.node_id == node_id).map(|n| n.sequence_id)
            })
        });
        self.set_last_node(node_id, sequence_id.unwrap_or(0));
    }

    pub fn set_agv_position(&self, position: AgvPosition) {
        let mut data = self.inner.lock();
        let vertex = Vec2::new(position.x, position.y);
        data.distance.push(vertex);
        data.state.distance_since_last_node = Some(data.distance.length());
        data.state.agv_position = Some(position);
    }

    pub fn set_velocity(&self, velocity: Velocity) {
        self.inner.lock().state.velocity = Some(velocity);
    }

    pub fn set_driving(&self, driving: bool) {
        self.inner.lock().state.driving = driving;
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner.lock().state.paused = Some(paused);
    }

    pub fn set_new_base_request(&self, requested: bool) {
        self.inner.lock().state.new_base_request = Some(requested);
    }

    pub fn set_operating_mode(&self, mode: OperatingMode) {
        self.inner.lock().state.operating_mode = mode;
    }

    pub fn set_safety_state(&self, safety: SafetyState) {
        self.inner.lock().state.safety_state = safety;
    }

    pub fn set_battery_state(&self, battery: BatteryState) {
        self.inner.lock().state.battery_state = battery;
    }

    pub fn set_loads(&self, loads: Vec<vda5050_wire::Load>) {
        self.inner.lock().state.loads = loads;
    }

    // -- Readers --------------------------------------------------------------

    /// Whether the vehicle has nothing released left to execute: no released
    /// node/edge ahead and every order action in a terminal state.
    pub fn is_idle(&self) -> bool {
        let data = self.inner.lock();
        let graph_done = data.state.node_states.iter().all(|n| !n.released)
            && data.state.edge_states.iter().all(|e| !e.released);
        let actions_done = data
            .state
            .action_states
            .iter()
            .filter(|a| !data.instant_ids.contains(&a.action_id))
            .all(|a| a.action_status.is_terminal());
        graph_done && actions_done
    }

    /// Node id of the last reached node; empty when none.
    pub fn last_node_id(&self) -> String {
        self.inner.lock().state.last_node_id.clone()
    }

    pub fn agv_position(&self) -> Option<AgvPosition> {
        self.inner.lock().state.agv_position.clone()
    }

    pub fn paused(&self) -> Option<bool> {
        self.inner.lock().state.paused
    }

    pub fn driving(&self) -> bool {
        self.inner.lock().state.driving
    }

    // -- Snapshots ------------------------------------------------------------

    /// Produce the next state message: the current state with a fresh header.
    pub fn next_state(&self) -> State {
        let mut data = self.inner.lock();
        data.state_header_id += 1;
        let mut state = data.state.clone();
        state.header = Header::now(
            data.state_header_id,
            data.state.header.manufacturer.clone(),
            data.state.header.serial_number.clone(),
        );
        state
    }

    /// Produce the next visualization message.
    pub fn next_visualization(&self) -> Visualization {
        let mut data = self.inner.lock();
        data.visualization_header_id += 1;
        Visualization {
            header: Header::now(
                data.visualization_header_id,
                data.state.header.manufacturer.clone(),
                data.state.header.serial_number.clone(),
            ),
            agv_position: data.state.agv_position.clone(),
            velocity: data.state.velocity,
        }
    }
}

fn node_state_of(node: &vda5050_wire::Node) -> NodeState {
    NodeState {
        node_id: node.node_id.clone(),
        sequence_id: node.sequence_id,
        node_description: node.node_description.clone(),
        node_position: node.node_position.clone(),
        released: node.released,
    }
}

fn edge_state_of(edge: &vda5050_wire::Edge) -> EdgeState {
    EdgeState {
        edge_id: edge.edge_id.clone(),
        sequence_id: edge.sequence_id,
        edge_description: edge.edge_description.clone(),
        released: edge.released,
        trajectory: edge.trajectory.clone(),
    }
}

fn waiting_state_of(action: &Action) -> ActionState {
    ActionState {
        action_id: action.action_id.clone(),
        action_type: Some(action.action_type.clone()),
        action_description: action.action_description.clone(),
        action_status: ActionStatus::Waiting,
        result_description: None,
    }
}

/// All actions of the released nodes and edges of an order, in graph order.
fn order_actions(order: &Order) -> impl Iterator<Item = &Action> {
    let nodes = order.nodes.iter().filter(|n| n.released).flat_map(|n| n.actions.iter());
    let edges = order.edges.iter().filter(|e| e.released).flat_map(|e| e.actions.iter());
    nodes.chain(edges)
}

/// Highest `sequence_id` among the released elements of an order.
fn last_released_sequence(order: &Order) -> u64 {
    let node_max =
        order.nodes.iter().filter(|n| n.released).map(|n| n.sequence_id).max().unwrap_or(0);
    let edge_max =
        order.edges.iter().filter(|e| e.released).map(|e| e.sequence_id).max().unwrap_or(0);
    node_max.max(edge_max)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
