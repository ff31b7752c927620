// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contracts between the runtime and the integrator's driver code.
//!
//! Handlers are plain `Send + Sync` trait objects. The runtime invokes their
//! entrypoints on the task-queue worker, never while holding engine or state
//! locks; the driver reports progress out-of-band through the sink value it
//! received. A sink holds a weak relation to the runtime services — dropping
//! the handle invalidates all outstanding sinks without leaking anything.
//!
//! An `Err` returned from an entrypoint is the adapter-boundary rendition of
//! a driver exception: it is converted into a structured protocol error, and
//! the order is aborted (order-scoped handlers) or the action failed
//! (instant-scoped handlers).

use std::fmt;
use std::sync::Weak;

use vda5050_wire::{Action, AgvPosition, Edge, Node};

use crate::handle::Services;

/// Progress events a driver can report for an action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ActionEvent {
    Started,
    Paused,
    Resumed,
    Finished { result: Option<String> },
    Failed { description: String },
}

/// Progress events a driver can report for navigation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NavigationEvent {
    Reached { node_id: String },
    Failed { description: String },
}

/// Executes the AGV-specific actions of one action type.
pub trait ActionHandler: Send + Sync {
    /// Begin executing `action`. Report progress through `sink`.
    fn start(&self, action: Action, sink: ActionSink) -> anyhow::Result<()>;

    /// Pause the running action; acknowledge via the sink's `paused`.
    fn pause(&self, action_id: &str) -> anyhow::Result<()>;

    /// Resume the paused action; acknowledge via the sink's `resumed`.
    fn resume(&self, action_id: &str) -> anyhow::Result<()>;

    /// Cancel the action. The driver may still finish or fail it normally.
    fn cancel(&self, action_id: &str) -> anyhow::Result<()>;
}

/// Step-based navigation: the runtime requests one node at a time.
pub trait NavigationHandler: Send + Sync {
    fn navigate_to_node(&self, node: Node, sink: NavigationSink) -> anyhow::Result<()>;

    /// Stop driving; an in-flight step may still report `reached`.
    fn cancel(&self) -> anyhow::Result<()>;

    fn pause(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn resume(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A consecutive run of nodes and edges handed to a continuous navigation
/// driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSegment {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Continuous navigation: the runtime hands over whole route segments and
/// learns about progress through `position_at` events.
pub trait ContinuousNavigationHandler: Send + Sync {
    /// The drivable base and the predicted horizon changed.
    fn horizon_updated(
        &self,
        base: RouteSegment,
        horizon: RouteSegment,
        sink: NavigationSink,
    ) -> anyhow::Result<()>;

    fn cancel(&self) -> anyhow::Result<()>;

    fn pause(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn resume(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Either flavour of navigation driver.
#[derive(Clone)]
pub enum Navigation {
    Step(std::sync::Arc<dyn NavigationHandler>),
    Continuous(std::sync::Arc<dyn ContinuousNavigationHandler>),
}

/// Pauses or resumes the vehicle on behalf of a `startPause`/`stopPause`
/// instant action.
pub trait PauseResumeHandler: Send + Sync {
    fn do_pause(&self, sink: PauseResumeSink) -> anyhow::Result<()>;
    fn do_resume(&self, sink: PauseResumeSink) -> anyhow::Result<()>;
}

/// Driver-supplied position source.
pub trait OdometryHandler: Send + Sync {
    /// Called when an `initPosition` instant action was received. Returning
    /// `Ok` indicates a successful initialization.
    fn initialize_position(&self, position: &AgvPosition) -> Result<(), InitializePositionError>;
}

/// Failure reported by [`OdometryHandler::initialize_position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializePositionError(pub String);

impl fmt::Display for InitializePositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position initialization failed: {}", self.0)
    }
}

impl std::error::Error for InitializePositionError {}

// -- Sinks --------------------------------------------------------------------

/// Callback channel for one action handed to an [`ActionHandler`].
#[derive(Clone)]
pub struct ActionSink {
    services: Weak<Services>,
    action_id: String,
}

impl ActionSink {
    pub(crate) fn new(services: Weak<Services>, action_id: impl Into<String>) -> Self {
        Self { services, action_id: action_id.into() }
    }

    fn emit(&self, event: ActionEvent) {
        if let Some(services) = self.services.upgrade() {
            services.action_event(&self.action_id, event);
        }
    }

    /// The driver began executing the action.
    pub fn started(&self) {
        self.emit(ActionEvent::Started);
    }

    pub fn paused(&self) {
        self.emit(ActionEvent::Paused);
    }

    pub fn resumed(&self) {
        self.emit(ActionEvent::Resumed);
    }

    pub fn finished(&self) {
        self.emit(ActionEvent::Finished { result: None });
    }

    /// Finish with a result description, e.g. the payload of an RFID read.
    pub fn finished_with(&self, result: impl Into<String>) {
        self.emit(ActionEvent::Finished { result: Some(result.into()) });
    }

    pub fn failed(&self, description: impl Into<String>) {
        self.emit(ActionEvent::Failed { description: description.into() });
    }
}

/// Callback channel for navigation progress.
#[derive(Clone)]
pub struct NavigationSink {
    services: Weak<Services>,
}

impl NavigationSink {
    pub(crate) fn new(services: Weak<Services>) -> Self {
        Self { services }
    }

    fn emit(&self, event: NavigationEvent) {
        if let Some(services) = self.services.upgrade() {
            services.navigation_event(event);
        }
    }

    /// The AGV arrived at (or drove over) the given node.
    pub fn reached(&self, node_id: impl Into<String>) {
        self.emit(NavigationEvent::Reached { node_id: node_id.into() });
    }

    /// Continuous-navigation alias for [`reached`](Self::reached).
    pub fn position_at(&self, node_id: impl Into<String>) {
        self.reached(node_id);
    }

    pub fn failed(&self, description: impl Into<String>) {
        self.emit(NavigationEvent::Failed { description: description.into() });
    }
}

/// Callback channel handed to a [`PauseResumeHandler`].
#[derive(Clone)]
pub struct PauseResumeSink {
    services: Weak<Services>,
    action_id: String,
    pausing: bool,
}

impl PauseResumeSink {
    pub(crate) fn new(services: Weak<Services>, action_id: impl Into<String>, pausing: bool) -> Self {
        Self { services, action_id: action_id.into(), pausing }
    }

    /// The pause/resume procedure began.
    pub fn started(&self) {
        if let Some(services) = self.services.upgrade() {
            crate::pause_resume::started(&services, &self.action_id);
        }
    }

    /// The vehicle is now paused (or resumed).
    pub fn finished(&self) {
        if let Some(services) = self.services.upgrade() {
            crate::pause_resume::finished(&services, &self.action_id, self.pausing);
        }
    }

    pub fn failed(&self, description: impl Into<String>) {
        if let Some(services) = self.services.upgrade() {
            crate::pause_resume::failed(&services, &self.action_id, description.into());
        }
    }

    /// Ask the runtime to pause (or resume) all running actions.
    pub fn notify_running_actions(&self) {
        if let Some(services) = self.services.upgrade() {
            crate::pause_resume::notify_running_actions(&services, self.pausing);
        }
    }

    /// Ask the runtime to pause (or resume) driving.
    pub fn notify_running_navigation(&self) {
        if let Some(services) = self.services.upgrade() {
            crate::pause_resume::notify_running_navigation(&services, self.pausing);
        }
    }
}
