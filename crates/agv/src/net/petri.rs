// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pure order net: places, token movement and the tick loop.
//!
//! The net knows nothing about drivers, state stores or timers. Every
//! operation mutates the marking and returns the [`Firing`]s it produced;
//! the net manager translates those into handler calls and state updates.
//!
//! Places are kept as small per-element/per-action flags rather than a
//! generic token multiset: the net of a single order is finite and tiny, and
//! each transition kind touches a fixed set of places.

use std::collections::HashMap;

use vda5050_wire::{Action, BlockingType, Edge, Node, Order};

/// Terminal outcome of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Finished,
    Failed,
}

/// Where an action lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionScope {
    /// Attached to the element at this index.
    Element(usize),
    /// Injected instant action, parallel to the order.
    Instant,
}

/// Marking of a single action's places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionPhase {
    /// No token yet; the triggering element was not reached/entered.
    Waiting,
    /// May start as soon as the blocking budget allows it.
    Allowed,
    /// Start fired; the driver has not reported `started` yet.
    Initializing,
    Running,
    Paused,
    /// Token consumed for good.
    Done,
}

impl ActionPhase {
    /// Whether the action holds blocking budget.
    fn is_active(&self) -> bool {
        matches!(self, Self::Initializing | Self::Running | Self::Paused)
    }
}

#[derive(Debug, Clone)]
struct ActionEntry {
    action: Action,
    scope: ActionScope,
    phase: ActionPhase,
    /// Set by the driver's finished/failed report; consumed by the
    /// FinishAction transition.
    pending: Option<PendingFinish>,
}

#[derive(Debug, Clone)]
struct PendingFinish {
    outcome: Outcome,
    result: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone)]
enum Element {
    Node { node: Node, reached: bool, announced: bool },
    Edge { edge: Edge, traversed: bool, arrive_pending: bool },
}

impl Element {
    fn sequence_id(&self) -> u64 {
        match self {
            Element::Node { node, .. } => node.sequence_id,
            Element::Edge { edge, .. } => edge.sequence_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavState {
    Idle,
    Traversing(usize),
}

/// A transition that fired; the net manager turns these into effects.
#[derive(Debug, Clone)]
pub(crate) enum Firing {
    /// Invoke the action handler; the action is INITIALIZING now.
    StartAction { action: Action },
    /// The action reached its terminal state.
    FinishAction {
        action_id: String,
        action_type: String,
        instant: bool,
        outcome: Outcome,
        result: Option<String>,
        description: Option<String>,
    },
    /// Ask the driver to cancel a running action.
    CancelAction { action_id: String, action_type: String },
    /// Ask the driver to pause a running action.
    PauseAction { action_id: String, action_type: String },
    /// Ask the driver to resume a paused action.
    ResumeAction { action_id: String, action_type: String },
    /// Begin traversing the edge towards its end node.
    StartTraversal { edge: Edge, target: Option<Node> },
    /// The edge was fully traversed.
    EndTraversal { sequence_id: u64 },
    /// The AGV stands on this node now.
    NodeReached { node: Node },
    CancelNavigation,
    PauseNavigation,
    ResumeNavigation,
    /// Every released element and action is done.
    OrderCompleted,
}

/// The marking of one order plus any injected instant actions.
#[derive(Debug)]
pub(crate) struct Net {
    elements: Vec<Element>,
    actions: Vec<ActionEntry>,
    by_id: HashMap<String, usize>,
    /// First element that is not yet complete.
    cursor: usize,
    nav: NavState,
    /// Global pause guard; ungates every Start* transition.
    pause_clear: bool,
    /// Navigation pause guard; gates StartTraversal only.
    nav_clear: bool,
    cancelling: bool,
    completed_announced: bool,
    horizon_nodes: Vec<Node>,
    horizon_edges: Vec<Edge>,
}

impl Default for Net {
    /// An empty, enabled net: no order, both clear tokens present.
    fn default() -> Self {
        Self {
            elements: vec![],
            actions: vec![],
            by_id: HashMap::new(),
            cursor: 0,
            nav: NavState::Idle,
            pause_clear: true,
            nav_clear: true,
            cancelling: false,
            completed_announced: false,
            horizon_nodes: vec![],
            horizon_edges: vec![],
        }
    }
}

impl Net {
    /// Build the net of a freshly accepted order. The first released node is
    /// marked reached; admission control already established reachability.
    pub fn from_order(order: &Order) -> Self {
        let mut net = Net::default();
        net.append_released(order);
        net.replace_horizon(order);
        if let Some(Element::Node { reached, .. }) = net.elements.first_mut() {
            *reached = true;
        }
        net
    }

    /// Extend the net with an update's released tail; the horizon is
    /// replaced wholesale.
    pub fn extend(&mut self, update: &Order) {
        let last = self.elements.last().map(|e| e.sequence_id()).unwrap_or(0);
        self.append_released_after(update, last);
        self.replace_horizon(update);
        self.completed_announced = false;
    }

    fn append_released(&mut self, order: &Order) {
        self.append_released_after(order, u64::MAX);
    }

    fn append_released_after(&mut self, order: &Order, last_sequence: u64) {
        let threshold = if last_sequence == u64::MAX { 0 } else { last_sequence + 1 };
        let mut elements: Vec<Element> = order
            .nodes
            .iter()
            .filter(|n| n.released && n.sequence_id >= threshold)
            .map(|n| Element::Node { node: n.clone(), reached: false, announced: false })
            .chain(
                order
                    .edges
                    .iter()
                    .filter(|e| e.released && e.sequence_id >= threshold)
                    .map(|e| Element::Edge { edge: e.clone(), traversed: false, arrive_pending: false }),
            )
            .collect();
        elements.sort_by_key(Element::sequence_id);

        let base = self.elements.len();
        for (offset, element) in elements.iter().enumerate() {
            let actions = match element {
                Element::Node { node, .. } => &node.actions,
                Element::Edge { edge, .. } => &edge.actions,
            };
            for action in actions {
                self.by_id.insert(action.action_id.clone(), self.actions.len());
                self.actions.push(ActionEntry {
                    action: action.clone(),
                    scope: ActionScope::Element(base + offset),
                    phase: ActionPhase::Waiting,
                    pending: None,
                });
            }
        }
        self.elements.extend(elements);
    }

    fn replace_horizon(&mut self, order: &Order) {
        self.horizon_nodes = order.nodes.iter().filter(|n| !n.released).cloned().collect();
        self.horizon_edges = order.edges.iter().filter(|e| !e.released).cloned().collect();
    }

    /// Inject an instant action as a small parallel sub-net.
    ///
    /// While a cancellation drains the net, new instant work is refused and
    /// immediately failed.
    pub fn intercept(&mut self, action: &Action) -> Vec<Firing> {
        if self.cancelling {
            return vec![Firing::FinishAction {
                action_id: action.action_id.clone(),
                action_type: action.action_type.clone(),
                instant: true,
                outcome: Outcome::Failed,
                result: None,
                description: Some("order cancellation in progress".to_owned()),
            }];
        }
        self.by_id.insert(action.action_id.clone(), self.actions.len());
        self.actions.push(ActionEntry {
            action: action.clone(),
            scope: ActionScope::Instant,
            phase: ActionPhase::Allowed,
            pending: None,
        });
        self.tick()
    }

    /// Predicted tail of the order.
    pub fn horizon(&self) -> (Vec<Node>, Vec<Edge>) {
        (self.horizon_nodes.clone(), self.horizon_edges.clone())
    }

    /// The drivable run for a continuous navigation driver, starting at the
    /// element with `from_sequence`: everything up to and including the next
    /// node that carries a SOFT or HARD action (the driver has to stop
    /// there), or the end of the base.
    ///
    /// Returns the nodes, the edges and the last sequence id of the run.
    pub fn continuous_segment(&self, from_sequence: u64) -> (Vec<Node>, Vec<Edge>, u64) {
        let mut nodes = vec![];
        let mut edges = vec![];
        let mut last = from_sequence;
        for (index, element) in self.elements.iter().enumerate() {
            if element.sequence_id() < from_sequence {
                continue;
            }
            last = element.sequence_id();
            match element {
                Element::Node { node, .. } => {
                    nodes.push(node.clone());
                    let blocking = self.actions.iter().any(|a| {
                        a.scope == ActionScope::Element(index)
                            && a.action.blocking_type != BlockingType::None
                            && a.phase != ActionPhase::Done
                    });
                    if blocking && element.sequence_id() > from_sequence {
                        break;
                    }
                }
                Element::Edge { edge, .. } => edges.push(edge.clone()),
            }
        }
        (nodes, edges, last)
    }

    // -- Guards ---------------------------------------------------------------

    fn hard_active(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.phase.is_active() && a.action.blocking_type == BlockingType::Hard)
    }

    fn soft_or_hard_active(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.phase.is_active() && a.action.blocking_type != BlockingType::None)
    }

    fn any_action_active(&self) -> bool {
        self.actions.iter().any(|a| a.phase.is_active())
    }

    fn nav_busy(&self) -> bool {
        self.nav != NavState::Idle
    }

    /// The blocking-budget place: one token iff no HARD action is running,
    /// a HARD candidate additionally requires exclusive use of the vehicle,
    /// and SOFT/HARD candidates exclude navigation.
    fn budget_allows(&self, blocking_type: BlockingType) -> bool {
        if self.hard_active() {
            return false;
        }
        match blocking_type {
            BlockingType::Hard => !self.any_action_active() && !self.nav_busy(),
            BlockingType::Soft => !self.nav_busy(),
            BlockingType::None => true,
        }
    }

    fn traversal_allowed(&self) -> bool {
        self.pause_clear
            && self.nav_clear
            && !self.cancelling
            && !self.nav_busy()
            && !self.soft_or_hard_active()
    }

    /// Whether any activity (action or navigation) is still holding tokens.
    pub fn is_anything_active(&self) -> bool {
        self.any_action_active() || self.nav_busy()
    }

    /// Whether the net still has released work ahead (or running).
    pub fn has_pending_work(&self) -> bool {
        self.cursor < self.elements.len() || self.is_anything_active()
    }

    // -- Tick -----------------------------------------------------------------

    /// Fire enabled transitions until quiescence.
    ///
    /// Priority: FinishAction, EndTraversal, StartAction (NONE before SOFT
    /// before HARD), StartTraversal. Within one kind, actions fire in graph
    /// and declaration order (the order of `actions`).
    pub fn tick(&mut self) -> Vec<Firing> {
        let mut firings = vec![];
        loop {
            self.advance(&mut firings);

            if self.fire_finish_action(&mut firings) {
                continue;
            }
            if self.fire_end_traversal(&mut firings) {
                continue;
            }
            if self.fire_start_action(&mut firings) {
                continue;
            }
            if self.fire_start_traversal(&mut firings) {
                continue;
            }
            break;
        }
        firings
    }

    /// Move the cursor over completed elements, allow the actions of the
    /// current element and announce node arrivals and order completion.
    fn advance(&mut self, firings: &mut Vec<Firing>) {
        loop {
            let index = self.cursor;
            if index >= self.elements.len() {
                break;
            }
            if let Element::Node { reached, .. } = &self.elements[index] {
                if !*reached {
                    break;
                }
                if let Element::Node { node, announced, .. } = &mut self.elements[index] {
                    if !*announced {
                        *announced = true;
                        let node = node.clone();
                        firings.push(Firing::NodeReached { node });
                    }
                }
                self.allow_actions_of(index);
            }
            if !self.element_complete(index) {
                break;
            }
            self.cursor += 1;
        }

        if self.cursor == self.elements.len()
            && !self.elements.is_empty()
            && !self.is_anything_active()
            && !self.completed_announced
        {
            self.completed_announced = true;
            firings.push(Firing::OrderCompleted);
        }
    }

    fn allow_actions_of(&mut self, index: usize) {
        for entry in &mut self.actions {
            if entry.scope == ActionScope::Element(index) && entry.phase == ActionPhase::Waiting {
                entry.phase = ActionPhase::Allowed;
            }
        }
    }

    fn element_complete(&self, index: usize) -> bool {
        let done = self
            .actions
            .iter()
            .filter(|a| a.scope == ActionScope::Element(index))
            .all(|a| a.phase == ActionPhase::Done);
        match &self.elements[index] {
            Element::Node { reached, .. } => *reached && done,
            Element::Edge { traversed, .. } => *traversed && done,
        }
    }

    fn fire_finish_action(&mut self, firings: &mut Vec<Firing>) -> bool {
        let Some(entry) = self
            .actions
            .iter_mut()
            .find(|a| a.pending.is_some() && a.phase != ActionPhase::Done)
        else {
            return false;
        };
        let Some(pending) = entry.pending.take() else {
            return false;
        };
        entry.phase = ActionPhase::Done;
        firings.push(Firing::FinishAction {
            action_id: entry.action.action_id.clone(),
            action_type: entry.action.action_type.clone(),
            instant: entry.scope == ActionScope::Instant,
            outcome: pending.outcome,
            result: pending.result,
            description: pending.description,
        });
        true
    }

    fn fire_end_traversal(&mut self, firings: &mut Vec<Firing>) -> bool {
        let NavState::Traversing(index) = self.nav else {
            return false;
        };
        {
            let Element::Edge { traversed, arrive_pending, .. } = &mut self.elements[index]
            else {
                return false;
            };
            if !*arrive_pending {
                return false;
            }
            *arrive_pending = false;
            *traversed = true;
        }
        self.nav = NavState::Idle;
        firings.push(Firing::EndTraversal { sequence_id: self.elements[index].sequence_id() });

        // Physical arrival: the following node is reached now, even if edge
        // actions are still draining.
        if let Some(Element::Node { node, reached, announced }) = self.elements.get_mut(index + 1)
        {
            *reached = true;
            if !*announced {
                *announced = true;
                firings.push(Firing::NodeReached { node: node.clone() });
            }
        }
        true
    }

    fn fire_start_action(&mut self, firings: &mut Vec<Firing>) -> bool {
        if !self.pause_clear || self.cancelling {
            return false;
        }
        for blocking in [BlockingType::None, BlockingType::Soft, BlockingType::Hard] {
            if !self.budget_allows(blocking) {
                continue;
            }
            let entry = self
                .actions
                .iter_mut()
                .find(|a| a.phase == ActionPhase::Allowed && a.action.blocking_type == blocking);
            if let Some(entry) = entry {
                entry.phase = ActionPhase::Initializing;
                firings.push(Firing::StartAction { action: entry.action.clone() });
                return true;
            }
        }
        false
    }

    fn fire_start_traversal(&mut self, firings: &mut Vec<Firing>) -> bool {
        if !self.traversal_allowed() {
            return false;
        }
        let index = self.cursor;
        let Some(Element::Edge { edge, traversed, .. }) = self.elements.get(index) else {
            return false;
        };
        if *traversed {
            return false;
        }
        let edge = edge.clone();
        let target = match self.elements.get(index + 1) {
            Some(Element::Node { node, .. }) => Some(node.clone()),
            _ => None,
        };
        self.nav = NavState::Traversing(index);
        // Edge actions become startable when the traversal begins.
        self.allow_actions_of(index);
        firings.push(Firing::StartTraversal { edge, target });
        true
    }

    // -- Driver events --------------------------------------------------------

    pub fn action_started(&mut self, action_id: &str) -> bool {
        self.set_phase(action_id, ActionPhase::Initializing, ActionPhase::Running)
    }

    pub fn action_paused(&mut self, action_id: &str) -> bool {
        self.set_phase(action_id, ActionPhase::Running, ActionPhase::Paused)
            || self.set_phase(action_id, ActionPhase::Initializing, ActionPhase::Paused)
    }

    pub fn action_resumed(&mut self, action_id: &str) -> bool {
        self.set_phase(action_id, ActionPhase::Paused, ActionPhase::Running)
    }

    pub fn action_finished(&mut self, action_id: &str, result: Option<String>) -> bool {
        self.set_pending(action_id, Outcome::Finished, result, None)
    }

    pub fn action_failed(&mut self, action_id: &str, description: String) -> bool {
        self.set_pending(action_id, Outcome::Failed, None, Some(description))
    }

    fn set_phase(&mut self, action_id: &str, from: ActionPhase, to: ActionPhase) -> bool {
        let Some(entry) = self.entry_mut(action_id) else {
            return false;
        };
        if entry.phase != from {
            return false;
        }
        entry.phase = to;
        true
    }

    fn set_pending(
        &mut self,
        action_id: &str,
        outcome: Outcome,
        result: Option<String>,
        description: Option<String>,
    ) -> bool {
        let Some(entry) = self.entry_mut(action_id) else {
            return false;
        };
        if !entry.phase.is_active() || entry.pending.is_some() {
            return false;
        }
        entry.pending = Some(PendingFinish { outcome, result, description });
        true
    }

    fn entry_mut(&mut self, action_id: &str) -> Option<&mut ActionEntry> {
        let index = *self.by_id.get(action_id)?;
        self.actions.get_mut(index)
    }

    /// The navigation driver arrived at a node.
    pub fn navigation_reached(&mut self, node_id: &str) -> bool {
        let NavState::Traversing(index) = self.nav else {
            return false;
        };
        let Element::Edge { edge, arrive_pending, .. } = &mut self.elements[index] else {
            return false;
        };
        if edge.end_node_id != node_id {
            return false;
        }
        *arrive_pending = true;
        true
    }

    /// The navigation driver gave up; the traversal token is withdrawn.
    pub fn navigation_failed(&mut self) -> bool {
        if !self.nav_busy() {
            return false;
        }
        self.nav = NavState::Idle;
        true
    }

    // -- Pause / resume / cancellation ----------------------------------------

    /// Withdraw the pause-clear token and ask every active action to pause.
    pub fn pause_actions(&mut self) -> Vec<Firing> {
        self.pause_clear = false;
        self.actions
            .iter()
            .filter(|a| matches!(a.phase, ActionPhase::Running | ActionPhase::Initializing))
            .map(|a| Firing::PauseAction {
                action_id: a.action.action_id.clone(),
                action_type: a.action.action_type.clone(),
            })
            .collect()
    }

    /// Restore the pause-clear token and ask every paused action to resume.
    pub fn resume_actions(&mut self) -> Vec<Firing> {
        self.pause_clear = true;
        self.actions
            .iter()
            .filter(|a| a.phase == ActionPhase::Paused)
            .map(|a| Firing::ResumeAction {
                action_id: a.action.action_id.clone(),
                action_type: a.action.action_type.clone(),
            })
            .collect()
    }

    /// Withdraw the navigation-clear token and pause an ongoing traversal.
    pub fn pause_driving(&mut self) -> Vec<Firing> {
        self.nav_clear = false;
        if self.nav_busy() {
            vec![Firing::PauseNavigation]
        } else {
            vec![]
        }
    }

    /// Restore the navigation-clear token.
    pub fn resume_driving(&mut self) -> Vec<Firing> {
        self.nav_clear = true;
        if self.nav_busy() {
            vec![Firing::ResumeNavigation]
        } else {
            vec![]
        }
    }

    /// Mark the net cancelling: nothing new starts, pending work fails,
    /// running work is asked to cancel and drains at its own pace.
    pub fn cancel_all(&mut self) -> Vec<Firing> {
        if self.cancelling {
            return vec![];
        }
        self.cancelling = true;

        let mut firings = vec![];
        for entry in &mut self.actions {
            match entry.phase {
                ActionPhase::Waiting | ActionPhase::Allowed => {
                    entry.phase = ActionPhase::Done;
                    firings.push(Firing::FinishAction {
                        action_id: entry.action.action_id.clone(),
                        action_type: entry.action.action_type.clone(),
                        instant: entry.scope == ActionScope::Instant,
                        outcome: Outcome::Failed,
                        result: None,
                        description: Some("order cancelled before the action started".to_owned()),
                    });
                }
                ActionPhase::Initializing | ActionPhase::Running | ActionPhase::Paused => {
                    firings.push(Firing::CancelAction {
                        action_id: entry.action.action_id.clone(),
                        action_type: entry.action.action_type.clone(),
                    });
                }
                ActionPhase::Done => {}
            }
        }
        if self.nav_busy() {
            firings.push(Firing::CancelNavigation);
        }
        firings
    }

    pub fn is_cancelling(&self) -> bool {
        self.cancelling
    }
}

#[cfg(test)]
#[path = "petri_tests.rs"]
mod petri_tests;
