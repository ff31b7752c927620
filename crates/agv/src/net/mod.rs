// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The order engine.
//!
//! [`NetManager`] wraps the pure marking in [`petri`] behind one mutex and
//! turns fired transitions into effects: driver invocations on the task
//! queue, action-state and position updates in the state store, and state
//! update requests. The mutex is held only while tokens move; every effect
//! is applied after it was released, so driver code never runs under an
//! engine lock.

mod petri;

use std::sync::Arc;

use parking_lot::Mutex;

use vda5050_wire::{Action, ActionStatus, Error, Node, Order};

use crate::handle::Services;
use crate::handler::{ActionEvent, ActionSink, Navigation, NavigationEvent, NavigationSink, RouteSegment};
use crate::update::UpdateUrgency;
use crate::validation::kind;

use petri::{Firing, Net, Outcome};

type ExitCallback = Box<dyn FnOnce() + Send + 'static>;

/// Drives the Petri net of the active order.
pub struct NetManager {
    inner: Mutex<Inner>,
}

struct Inner {
    net: Net,
    /// Invoked exactly once when the running-activity count drops to zero
    /// during a cancellation, then cleared.
    on_all_exited: Option<ExitCallback>,
    /// Continuous navigation: highest sequence id already handed over.
    dispatched_until: u64,
}

impl Default for NetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NetManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                net: Net::default(),
                on_all_exited: None,
                dispatched_until: 0,
            }),
        }
    }

    /// Translate a freshly accepted order into a net and start executing.
    pub(crate) fn interpret(&self, services: &Arc<Services>, order: &Order) {
        let firings = {
            let mut inner = self.inner.lock();
            inner.net = Net::from_order(order);
            inner.dispatched_until = 0;
            inner.net.tick()
        };
        self.apply(services, firings);
    }

    /// Append an order update's released tail and re-evaluate.
    pub(crate) fn extend(&self, services: &Arc<Services>, update: &Order) {
        let firings = {
            let mut inner = self.inner.lock();
            inner.net.extend(update);
            inner.net.tick()
        };
        services.state.set_new_base_request(false);
        self.apply(services, firings);
        self.notify_horizon_changed(services);
    }

    /// Re-evaluate all transitions, e.g. after a resume.
    pub(crate) fn restart(&self, services: &Arc<Services>) {
        let firings = self.inner.lock().net.tick();
        self.apply(services, firings);
    }

    /// Drop the net entirely.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.net = Net::default();
        inner.dispatched_until = 0;
        inner.on_all_exited = None;
    }

    /// Whether the net still has work (pending or running).
    pub fn is_anything_active(&self) -> bool {
        self.inner.lock().net.has_pending_work()
    }

    /// Register the callback fired once when all running activity exited
    /// after a cancellation.
    pub(crate) fn on_all_exited(&self, callback: Option<ExitCallback>) {
        self.inner.lock().on_all_exited = callback;
    }

    /// Run an instant action through the net, parallel to the order but
    /// under the same blocking guards.
    pub(crate) fn intercept_with_action(&self, services: &Arc<Services>, action: &Action) {
        let firings = self.inner.lock().net.intercept(action);
        self.apply(services, firings);
    }

    // -- Pause / resume / cancellation ----------------------------------------

    pub(crate) fn pause_all_running_actions(&self, services: &Arc<Services>) {
        let firings = self.inner.lock().net.pause_actions();
        self.apply(services, firings);
    }

    pub(crate) fn resume_all_paused_actions(&self, services: &Arc<Services>) {
        let firings = self.inner.lock().net.resume_actions();
        self.apply(services, firings);
    }

    pub(crate) fn pause_driving(&self, services: &Arc<Services>) {
        let firings = self.inner.lock().net.pause_driving();
        self.apply(services, firings);
    }

    pub(crate) fn resume_driving(&self, services: &Arc<Services>) {
        let firings = self.inner.lock().net.resume_driving();
        self.apply(services, firings);
    }

    /// Cancel the order: nothing new starts, running activity is asked to
    /// cancel, and the `on_all_exited` callback fires when drained.
    pub(crate) fn cancel_all(&self, services: &Arc<Services>) {
        let firings = self.inner.lock().net.cancel_all();
        self.apply(services, firings);
    }

    /// The predicted tail changed; a continuous driver gets the news.
    pub(crate) fn notify_horizon_changed(&self, services: &Arc<Services>) {
        let Some(Navigation::Continuous(handler)) = services.handlers.navigation() else {
            return;
        };
        let (nodes, edges) = self.inner.lock().net.horizon();
        let horizon = RouteSegment { nodes, edges };
        let sink = NavigationSink::new(Arc::downgrade(services));
        let weak = Arc::downgrade(services);
        services.tasks.push(move || {
            if let Err(error) = handler.horizon_updated(RouteSegment::default(), horizon, sink) {
                if let Some(services) = weak.upgrade() {
                    navigation_driver_failure(&services, error);
                }
            }
        });
    }

    // -- Driver events --------------------------------------------------------

    pub(crate) fn action_event(&self, services: &Arc<Services>, action_id: &str, event: ActionEvent) {
        let (accepted, status) = {
            let mut inner = self.inner.lock();
            match &event {
                ActionEvent::Started => {
                    (inner.net.action_started(action_id), Some(ActionStatus::Running))
                }
                ActionEvent::Paused => {
                    (inner.net.action_paused(action_id), Some(ActionStatus::Paused))
                }
                ActionEvent::Resumed => {
                    (inner.net.action_resumed(action_id), Some(ActionStatus::Running))
                }
                ActionEvent::Finished { result } => {
                    (inner.net.action_finished(action_id, result.clone()), None)
                }
                ActionEvent::Failed { description } => {
                    (inner.net.action_failed(action_id, description.clone()), None)
                }
            }
        };

        if !accepted {
            tracing::warn!(action_id, ?event, "ignoring action event with no matching token");
            return;
        }
        if let Some(status) = status {
            services.state.set_action_status(action_id, status);
            services.updates.request_update(UpdateUrgency::Medium);
        }

        let firings = self.inner.lock().net.tick();
        self.apply(services, firings);
    }

    pub(crate) fn navigation_event(&self, services: &Arc<Services>, event: NavigationEvent) {
        match event {
            NavigationEvent::Reached { node_id } => {
                let firings = {
                    let mut inner = self.inner.lock();
                    if !inner.net.navigation_reached(&node_id) {
                        tracing::warn!(%node_id, "ignoring unexpected navigation arrival");
                        return;
                    }
                    inner.net.tick()
                };
                self.apply(services, firings);
            }
            NavigationEvent::Failed { description } => {
                tracing::warn!(%description, "navigation failed");
                services.state.set_driving(false);
                services.state.add_error(
                    Error::warning(kind::ORDER_ERROR)
                        .with_description(description)
                        .with_reference("navigation", "failed"),
                );
                let withdrawn = self.inner.lock().net.navigation_failed();
                if withdrawn {
                    self.cancel_all(services);
                } else {
                    self.check_drained();
                }
            }
        }
    }

    // -- Firing application ---------------------------------------------------

    fn apply(&self, services: &Arc<Services>, firings: Vec<Firing>) {
        for firing in firings {
            match firing {
                Firing::StartAction { action } => self.start_action(services, action),
                Firing::FinishAction { action_id, action_type, instant, outcome, result, description } => {
                    self.finish_action(
                        services,
                        &action_id,
                        &action_type,
                        instant,
                        outcome,
                        result,
                        description,
                    );
                }
                Firing::CancelAction { action_id, action_type } => {
                    self.invoke_action_control(services, action_id, action_type, Control::Cancel);
                }
                Firing::PauseAction { action_id, action_type } => {
                    self.invoke_action_control(services, action_id, action_type, Control::Pause);
                }
                Firing::ResumeAction { action_id, action_type } => {
                    self.invoke_action_control(services, action_id, action_type, Control::Resume);
                }
                Firing::StartTraversal { edge, target } => {
                    self.start_traversal(services, edge, target);
                }
                Firing::EndTraversal { sequence_id } => {
                    services.state.set_driving(false);
                    services.state.take_edge_state(sequence_id);
                    services.updates.request_update(UpdateUrgency::Medium);
                }
                Firing::NodeReached { node } => {
                    services.state.set_last_node(&node.node_id, node.sequence_id);
                    services.state.take_node_state(node.sequence_id);
                    services.updates.request_update(UpdateUrgency::Medium);
                }
                Firing::CancelNavigation => self.invoke_navigation_cancel(services),
                Firing::PauseNavigation => self.invoke_navigation_pause(services, true),
                Firing::ResumeNavigation => self.invoke_navigation_pause(services, false),
                Firing::OrderCompleted => {
                    tracing::info!("order completed");
                    // A horizon left over after the base drained means the
                    // controller owes us an update that releases it.
                    let horizon_left = {
                        let inner = self.inner.lock();
                        let (nodes, edges) = inner.net.horizon();
                        !nodes.is_empty() || !edges.is_empty()
                    };
                    if horizon_left {
                        services.state.set_new_base_request(true);
                    }
                    services.updates.request_update(UpdateUrgency::Medium);
                }
            }
        }
        self.check_drained();
    }

    fn start_action(&self, services: &Arc<Services>, action: Action) {
        services.state.set_action_status(&action.action_id, ActionStatus::Initializing);
        services.updates.request_update(UpdateUrgency::Medium);

        let Some(handler) = services.handlers.action_handler(&action.action_type) else {
            tracing::error!(action_type = %action.action_type, "no action handler registered");
            services.state.add_error(
                Error::fatal(kind::ACTION_ERROR)
                    .with_description("No handler registered for this action type")
                    .with_reference("actionId", &action.action_id)
                    .with_reference("actionType", &action.action_type),
            );
            self.action_event(
                services,
                &action.action_id,
                ActionEvent::Failed { description: "no handler registered".to_owned() },
            );
            return;
        };

        let sink = ActionSink::new(Arc::downgrade(services), &action.action_id);
        let weak = Arc::downgrade(services);
        let action_id = action.action_id.clone();
        let action_type = action.action_type.clone();
        services.tasks.push(move || {
            if let Err(error) = handler.start(action, sink) {
                if let Some(services) = weak.upgrade() {
                    action_driver_failure(&services, &action_id, &action_type, error);
                }
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_action(
        &self,
        services: &Arc<Services>,
        action_id: &str,
        action_type: &str,
        instant: bool,
        outcome: Outcome,
        result: Option<String>,
        description: Option<String>,
    ) {
        if let Some(result) = result {
            services.state.set_action_result(action_id, result);
        }
        let status = match outcome {
            Outcome::Finished => ActionStatus::Finished,
            Outcome::Failed => ActionStatus::Failed,
        };
        services.state.set_action_status(action_id, status);
        services.updates.request_update(UpdateUrgency::High);

        let cancelling = self.inner.lock().net.is_cancelling();
        if outcome == Outcome::Failed && !cancelling {
            services.state.add_error(
                Error::warning(kind::ACTION_ERROR)
                    .with_description(description.unwrap_or_else(|| "Action failed".to_owned()))
                    .with_reference("actionId", action_id)
                    .with_reference("actionType", action_type),
            );
            // A failed order action drains the whole net.
            if !instant {
                self.cancel_all(services);
            }
        }
    }

    fn invoke_action_control(
        &self,
        services: &Arc<Services>,
        action_id: String,
        action_type: String,
        control: Control,
    ) {
        let Some(handler) = services.handlers.action_handler(&action_type) else {
            tracing::error!(%action_type, "no action handler for control call");
            return;
        };
        let weak = Arc::downgrade(services);
        services.tasks.push(move || {
            let outcome = match control {
                Control::Pause => handler.pause(&action_id),
                Control::Resume => handler.resume(&action_id),
                Control::Cancel => handler.cancel(&action_id),
            };
            if let Err(error) = outcome {
                if let Some(services) = weak.upgrade() {
                    action_driver_failure(&services, &action_id, &action_type, error);
                }
            }
        });
    }

    fn start_traversal(&self, services: &Arc<Services>, edge: vda5050_wire::Edge, target: Option<Node>) {
        services.state.set_driving(true);
        services.updates.request_update(UpdateUrgency::Medium);

        let Some(navigation) = services.handlers.navigation() else {
            tracing::error!("no navigation handler registered");
            services.state.add_error(
                Error::fatal(kind::ORDER_ERROR)
                    .with_description("No navigation handler registered")
                    .with_reference("edge.edgeId", &edge.edge_id),
            );
            self.navigation_event(
                services,
                NavigationEvent::Failed { description: "no navigation handler".to_owned() },
            );
            return;
        };

        match navigation {
            Navigation::Step(handler) => {
                let Some(target) = target else {
                    // The graph validator guarantees an end node; a missing
                    // one is an internal inconsistency.
                    self.navigation_event(
                        services,
                        NavigationEvent::Failed {
                            description: format!("edge {} has no end node in the net", edge.edge_id),
                        },
                    );
                    return;
                };
                let sink = NavigationSink::new(Arc::downgrade(services));
                let weak = Arc::downgrade(services);
                services.tasks.push(move || {
                    if let Err(error) = handler.navigate_to_node(target, sink) {
                        if let Some(services) = weak.upgrade() {
                            navigation_driver_failure(&services, error);
                        }
                    }
                });
            }
            Navigation::Continuous(handler) => {
                let segment = {
                    let mut inner = self.inner.lock();
                    if edge.sequence_id > inner.dispatched_until {
                        let from = edge.sequence_id.saturating_sub(1);
                        let (nodes, edges, last) = inner.net.continuous_segment(from);
                        inner.dispatched_until = last;
                        let (horizon_nodes, horizon_edges) = inner.net.horizon();
                        Some((
                            RouteSegment { nodes, edges },
                            RouteSegment { nodes: horizon_nodes, edges: horizon_edges },
                        ))
                    } else {
                        None
                    }
                };
                if let Some((base, horizon)) = segment {
                    let sink = NavigationSink::new(Arc::downgrade(services));
                    let weak = Arc::downgrade(services);
                    services.tasks.push(move || {
                        if let Err(error) = handler.horizon_updated(base, horizon, sink) {
                            if let Some(services) = weak.upgrade() {
                                navigation_driver_failure(&services, error);
                            }
                        }
                    });
                }
            }
        }
    }

    fn invoke_navigation_cancel(&self, services: &Arc<Services>) {
        services.state.set_driving(false);
        let Some(navigation) = services.handlers.navigation() else {
            return;
        };
        services.tasks.push(move || {
            let outcome = match &navigation {
                Navigation::Step(handler) => handler.cancel(),
                Navigation::Continuous(handler) => handler.cancel(),
            };
            if let Err(error) = outcome {
                tracing::warn!(%error, "navigation cancel failed");
            }
        });
    }

    fn invoke_navigation_pause(&self, services: &Arc<Services>, pause: bool) {
        let Some(navigation) = services.handlers.navigation() else {
            return;
        };
        let weak = Arc::downgrade(services);
        services.tasks.push(move || {
            let outcome = match (&navigation, pause) {
                (Navigation::Step(handler), true) => handler.pause(),
                (Navigation::Step(handler), false) => handler.resume(),
                (Navigation::Continuous(handler), true) => handler.pause(),
                (Navigation::Continuous(handler), false) => handler.resume(),
            };
            if let Err(error) = outcome {
                if let Some(services) = weak.upgrade() {
                    navigation_driver_failure(&services, error);
                }
            }
        });
    }

    /// Fire the exit callback once all running activity drained away during
    /// a cancellation.
    fn check_drained(&self) {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.net.is_cancelling() && !inner.net.is_anything_active() {
                inner.on_all_exited.take()
            } else {
                None
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

#[derive(Clone, Copy)]
enum Control {
    Pause,
    Resume,
    Cancel,
}

/// A driver error from an action entrypoint: logged and converted into the
/// action's failure, which records the structured error and aborts the order
/// for order-scoped actions.
fn action_driver_failure(
    services: &Arc<Services>,
    action_id: &str,
    action_type: &str,
    error: anyhow::Error,
) {
    tracing::error!(action_id, action_type, %error, "action driver failed");
    services.net.action_event(
        services,
        action_id,
        ActionEvent::Failed { description: error.to_string() },
    );
}

/// A driver error from a navigation entrypoint.
fn navigation_driver_failure(services: &Arc<Services>, error: anyhow::Error) {
    tracing::error!(%error, "navigation driver failed");
    services.net.navigation_event(
        services,
        NavigationEvent::Failed { description: error.to_string() },
    );
}
