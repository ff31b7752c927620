// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The library handle.
//!
//! [`AgvHandle`] bundles the owned services — state store, update timer,
//! task queue, order engine, odometry — behind one `Arc`. The bundle itself
//! is immutable after construction; all mutability lives inside the state
//! store and the net marking. Sub-managers and sinks hold `Weak` references
//! into the bundle, never owning back-pointers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vda5050_wire::{
    Action, BatteryState, Connection, ConnectionState, Error, Header, InstantActions,
    OperatingMode, Order, SafetyState, Velocity,
};

use crate::description::AgvDescription;
use crate::handler::{
    ActionEvent, ActionHandler, ContinuousNavigationHandler, Navigation, NavigationEvent,
    NavigationHandler, OdometryHandler, PauseResumeHandler,
};
use crate::logic::Logic;
use crate::net::NetManager;
use crate::odometry::Odometry;
use crate::state::StateStore;
use crate::tasks::TaskQueue;
use crate::update::{MessageSink, StateUpdateTimer, UpdateUrgency};
use crate::validation::{
    classify, is_repetition, ActionContext, ActionDeclaredRule, OrderGraphRule,
    OrderReachableRule, OrderUpdateRule, Pipeline, UpdateDisposition,
};

/// Immutable bundle of the runtime services.
pub(crate) struct Services {
    pub(crate) description: AgvDescription,
    pub(crate) state: Arc<StateStore>,
    pub(crate) updates: StateUpdateTimer,
    pub(crate) tasks: TaskQueue,
    pub(crate) net: NetManager,
    pub(crate) logic: Logic,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) odometry: Odometry,
    pub(crate) shutdown: CancellationToken,
    order_rules: Pipeline<Order>,
    node_action_rules: Pipeline<Action>,
    edge_action_rules: Pipeline<Action>,
    instant_action_rules: Pipeline<Action>,
    connection_header: AtomicU64,
}

impl Services {
    /// Entry point for [`crate::handler::ActionSink`] events.
    pub(crate) fn action_event(self: &Arc<Self>, action_id: &str, event: ActionEvent) {
        self.net.action_event(self, action_id, event);
    }

    /// Entry point for [`crate::handler::NavigationSink`] events.
    pub(crate) fn navigation_event(self: &Arc<Self>, event: NavigationEvent) {
        self.net.navigation_event(self, event);
    }
}

/// Immutable registry of the integrator's drivers.
#[derive(Default, Clone)]
pub(crate) struct HandlerRegistry {
    actions: HashMap<String, Arc<dyn ActionHandler>>,
    fallback_action: Option<Arc<dyn ActionHandler>>,
    navigation: Option<Navigation>,
    pause_resume: Option<Arc<dyn PauseResumeHandler>>,
    odometry: Option<Arc<dyn OdometryHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn action_handler(&self, action_type: &str) -> Option<Arc<dyn ActionHandler>> {
        self.actions.get(action_type).cloned().or_else(|| self.fallback_action.clone())
    }

    pub(crate) fn navigation(&self) -> Option<Navigation> {
        self.navigation.clone()
    }

    pub(crate) fn pause_resume(&self) -> Option<Arc<dyn PauseResumeHandler>> {
        self.pause_resume.clone()
    }

    pub(crate) fn odometry(&self) -> Option<Arc<dyn OdometryHandler>> {
        self.odometry.clone()
    }
}

/// An order that failed admission control. The produced errors were already
/// appended to the outgoing state.
#[derive(Debug)]
pub struct OrderRejected {
    pub errors: Vec<Error>,
}

impl std::fmt::Display for OrderRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order rejected with {} validation error(s)", self.errors.len())
    }
}

impl std::error::Error for OrderRejected {}

/// Builder for [`AgvHandle`].
pub struct AgvHandleBuilder {
    description: AgvDescription,
    sink: Arc<dyn MessageSink>,
    state_update_period: Duration,
    registry: HandlerRegistry,
}

impl AgvHandleBuilder {
    pub fn new(description: AgvDescription, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            description,
            sink,
            // The standard recommends at most 30 s between state messages.
            state_update_period: Duration::from_secs(30),
            registry: HandlerRegistry::default(),
        }
    }

    /// Base period of the state heartbeat.
    pub fn with_state_update_period(mut self, period: Duration) -> Self {
        self.state_update_period = period;
        self
    }

    /// Register the handler for one action type.
    pub fn with_action_handler(
        mut self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        self.registry.actions.insert(action_type.into(), handler);
        self
    }

    /// Register the handler used for action types without their own handler.
    pub fn with_fallback_action_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.registry.fallback_action = Some(handler);
        self
    }

    pub fn with_navigation_handler(mut self, handler: Arc<dyn NavigationHandler>) -> Self {
        self.registry.navigation = Some(Navigation::Step(handler));
        self
    }

    pub fn with_continuous_navigation_handler(
        mut self,
        handler: Arc<dyn ContinuousNavigationHandler>,
    ) -> Self {
        self.registry.navigation = Some(Navigation::Continuous(handler));
        self
    }

    pub fn with_pause_resume_handler(mut self, handler: Arc<dyn PauseResumeHandler>) -> Self {
        self.registry.pause_resume = Some(handler);
        self
    }

    pub fn with_odometry_handler(mut self, handler: Arc<dyn OdometryHandler>) -> Self {
        self.registry.odometry = Some(handler);
        self
    }

    /// Assemble the services and spawn the background loops.
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> AgvHandle {
        let store = Arc::new(StateStore::new(
            self.description.manufacturer.clone(),
            self.description.serial_number.clone(),
        ));
        let (tasks, task_worker) = TaskQueue::spawn();
        let updates = StateUpdateTimer::new(
            self.state_update_period,
            Arc::clone(&store),
            Arc::clone(&self.sink),
        );
        let odometry = Odometry::new(Arc::clone(&store), Arc::clone(&self.sink));

        let order_rules = Pipeline::new()
            .with(OrderGraphRule)
            .with(OrderUpdateRule::new(Arc::clone(&store)))
            .with(OrderReachableRule::new(Arc::clone(&store)));
        let node_action_rules =
            Pipeline::new().with(ActionDeclaredRule::new(&self.description, ActionContext::Node));
        let edge_action_rules =
            Pipeline::new().with(ActionDeclaredRule::new(&self.description, ActionContext::Edge));
        let instant_action_rules = Pipeline::new()
            .with(ActionDeclaredRule::new(&self.description, ActionContext::Instant));

        let services = Arc::new(Services {
            description: self.description,
            state: store,
            updates,
            tasks,
            net: NetManager::new(),
            logic: Logic::default(),
            handlers: self.registry,
            odometry,
            shutdown: CancellationToken::new(),
            order_rules,
            node_action_rules,
            edge_action_rules,
            instant_action_rules,
            connection_header: AtomicU64::new(0),
        });

        AgvHandle { services, task_worker: Mutex::new(Some(task_worker)) }
    }
}

/// The vehicle-side runtime handle.
pub struct AgvHandle {
    services: Arc<Services>,
    task_worker: Mutex<Option<JoinHandle<()>>>,
}

impl AgvHandle {
    // -- Messaging entrypoints ------------------------------------------------

    /// Admission-control an incoming order and hand it to the engine.
    ///
    /// On rejection the validation errors are appended to the outgoing state,
    /// a state update is requested and the engine stays untouched.
    pub fn receive_order(&self, order: Order) -> Result<(), OrderRejected> {
        let services = &self.services;

        // A repetition of the current order/update was already processed; it
        // never reaches the validators again. An equal `order_update_id`
        // with a different body falls through and is rejected as fatal by
        // the update rule.
        let identical_repeat = services
            .state
            .with_order(|current| current.is_some_and(|current| is_repetition(current, &order)));
        if identical_repeat {
            tracing::debug!(order_id = %order.order_id, "ignoring duplicate order message");
            return Ok(());
        }

        let mut errors = services.order_rules.run(&order);
        for node in &order.nodes {
            for action in &node.actions {
                errors.extend(services.node_action_rules.run(action));
            }
        }
        for edge in &order.edges {
            for action in &edge.actions {
                errors.extend(services.edge_action_rules.run(action));
            }
        }

        if !errors.is_empty() {
            tracing::warn!(
                order_id = %order.order_id,
                order_update_id = order.order_update_id,
                count = errors.len(),
                "order rejected"
            );
            services.state.append_errors(errors.clone());
            services.updates.request_update(UpdateUrgency::High);
            return Err(OrderRejected { errors });
        }

        match classify(&services.state, &order) {
            UpdateDisposition::Duplicate => {
                tracing::debug!(order_id = %order.order_id, "ignoring duplicate order message");
            }
            UpdateDisposition::NewOrder => {
                tracing::info!(order_id = %order.order_id, "order accepted");
                services.state.set_order(&order);
                services.logic.interpret_order(services, &order);
                services.updates.request_update(UpdateUrgency::Medium);
            }
            UpdateDisposition::Extension => {
                tracing::info!(
                    order_id = %order.order_id,
                    order_update_id = order.order_update_id,
                    "order update accepted"
                );
                services.state.extend_order(&order);
                services.net.extend(services, &order);
                services.updates.request_update(UpdateUrgency::Medium);
            }
        }
        Ok(())
    }

    /// Validate and dispatch a batch of instant actions.
    ///
    /// Invalid actions are reported through the state and skipped; valid
    /// ones are tracked as action states and dispatched.
    pub fn receive_instant_actions(&self, message: InstantActions) {
        let services = &self.services;
        let mut rejected = false;

        for action in &message.instant_actions {
            let errors = services.instant_action_rules.run(action);
            if !errors.is_empty() {
                tracing::warn!(
                    action_id = %action.action_id,
                    action_type = %action.action_type,
                    count = errors.len(),
                    "instant action rejected"
                );
                services.state.append_errors(errors);
                rejected = true;
                continue;
            }
            services.state.add_instant_action_state(action);
            services.logic.do_instant_action(services, action);
        }

        if rejected {
            services.updates.request_update(UpdateUrgency::High);
        }
    }

    /// Request a state emission with the given urgency.
    pub fn request_state_update(&self, urgency: UpdateUrgency) {
        self.services.updates.request_update(urgency);
    }

    // -- Vehicle status intake ------------------------------------------------

    pub fn set_position(&self, position: vda5050_wire::AgvPosition) {
        self.services.state.set_agv_position(position);
    }

    pub fn set_velocity(&self, velocity: Velocity) {
        self.services.state.set_velocity(velocity);
    }

    pub fn set_operating_mode(&self, mode: OperatingMode) {
        self.services.state.set_operating_mode(mode);
    }

    pub fn set_battery_state(&self, battery: BatteryState) {
        self.services.state.set_battery_state(battery);
    }

    pub fn set_safety_state(&self, safety: SafetyState) {
        self.services.state.set_safety_state(safety);
    }

    pub fn set_loads(&self, loads: Vec<vda5050_wire::Load>) {
        self.services.state.set_loads(loads);
    }

    // -- Visualization --------------------------------------------------------

    /// Publish a visualization message every `period` until disabled.
    pub async fn enable_visualization(&self, period: Duration) {
        self.services.odometry.enable_visualization(period).await;
    }

    pub async fn disable_visualization(&self) {
        self.services.odometry.disable_visualization().await;
    }

    // -- Connection topic helpers ---------------------------------------------

    /// Build the next `connection` message for the transport to publish.
    pub fn connection_message(&self, connection_state: ConnectionState) -> Connection {
        let header_id = self.services.connection_header.fetch_add(1, Ordering::Relaxed) + 1;
        Connection {
            header: Header::now(
                header_id,
                self.services.description.manufacturer.clone(),
                self.services.description.serial_number.clone(),
            ),
            connection_state,
        }
    }

    // -- Introspection --------------------------------------------------------

    pub fn description(&self) -> &AgvDescription {
        &self.services.description
    }

    /// Cancellation token observed by everything the handle spawned.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.services.shutdown.clone()
    }

    // -- Shutdown -------------------------------------------------------------

    /// Stop the background loops, drain the task queue and join everything.
    pub async fn shutdown(&self) {
        self.services.shutdown.cancel();
        self.services.updates.shutdown().await;
        self.services.odometry.disable_visualization().await;
        self.services.tasks.close();
        let worker = self.task_worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod handle_tests;
