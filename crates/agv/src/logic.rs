// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logic façade: the small API the messaging layer drives, plus the instant
//! action dispatcher.

use std::sync::Arc;

use parking_lot::Mutex;

use vda5050_wire::{Action, ActionStatus, AgvPosition, Error, Order};

use crate::handle::Services;
use crate::pause_resume::PauseResumeActionManager;
use crate::update::UpdateUrgency;
use crate::validation::kind;

/// Order and instant-action entrypoints, one level above the net manager.
#[derive(Default)]
pub struct Logic {
    /// The manager of the currently handled `startPause`/`stopPause` action.
    pause_resume: Mutex<Option<PauseResumeActionManager>>,
}

impl Logic {
    /// Build and start the net of a validated, freshly accepted order.
    pub(crate) fn interpret_order(&self, services: &Arc<Services>, order: &Order) {
        services.net.interpret(services, order);
    }

    /// Re-evaluate the net, e.g. after a resume.
    pub(crate) fn restart(&self, services: &Arc<Services>) {
        services.net.restart(services);
    }

    /// Cancel the running order and invoke `and_then` once it drained.
    pub(crate) fn abort_order(
        &self,
        services: &Arc<Services>,
        and_then: Option<Box<dyn FnOnce() + Send + 'static>>,
    ) {
        services.net.on_all_exited(and_then);
        services.net.cancel_all(services);
    }

    /// Dispatch a validated instant action.
    pub(crate) fn do_instant_action(&self, services: &Arc<Services>, action: &Action) {
        match action.action_type.as_str() {
            "startPause" | "stopPause" => {
                let manager = PauseResumeActionManager::new(action);
                manager.initialize(services);
                *self.pause_resume.lock() = Some(manager);
            }
            "cancelOrder" => self.do_cancel_order(services, action),
            "stateRequest" => {
                // The next state message answers the request by itself.
                services.state.set_action_status(&action.action_id, ActionStatus::Finished);
                services.updates.request_update(UpdateUrgency::High);
            }
            "initPosition" => self.do_init_position(services, action),
            _ => services.net.intercept_with_action(services, action),
        }
    }

    fn do_cancel_order(&self, services: &Arc<Services>, action: &Action) {
        if !services.net.is_anything_active() {
            services.state.set_action_status(&action.action_id, ActionStatus::Failed);
            services.state.add_error(
                Error::warning(kind::NO_ORDER_TO_CANCEL)
                    .with_description("There is nothing to cancel")
                    .with_reference("action.actionId", &action.action_id),
            );
            services.updates.request_update(UpdateUrgency::High);
            return;
        }

        // Pending actions get skipped, running ones cancelled; the action
        // finishes when the tail of the order was reached.
        let weak = Arc::downgrade(services);
        let action_id = action.action_id.clone();
        services.net.on_all_exited(Some(Box::new(move || {
            let Some(services) = weak.upgrade() else {
                return;
            };
            services.state.set_action_status(&action_id, ActionStatus::Finished);
            services.updates.request_update(UpdateUrgency::Immediate);
            services.state.clear_order();
            services.net.clear();
            services.updates.request_update(UpdateUrgency::Low);
        })));

        services.state.set_action_status(&action.action_id, ActionStatus::Running);
        services.updates.request_update(UpdateUrgency::Medium);
        services.net.cancel_all(services);
    }

    fn do_init_position(&self, services: &Arc<Services>, action: &Action) {
        let Some(odometry) = services.handlers.odometry() else {
            tracing::warn!("no odometry handler set, dropping initPosition action");
            services.state.set_action_status(&action.action_id, ActionStatus::Failed);
            services.state.add_error(
                Error::warning(kind::ACTION_ERROR)
                    .with_description("No odometry handler attached")
                    .with_reference("actionId", &action.action_id)
                    .with_reference("actionType", &action.action_type),
            );
            services.updates.request_update(UpdateUrgency::High);
            return;
        };

        // Parameters are present and typed; admission control checked them.
        let position = AgvPosition {
            x: action.parameter("x").and_then(|v| v.as_f64()).unwrap_or_default(),
            y: action.parameter("y").and_then(|v| v.as_f64()).unwrap_or_default(),
            theta: action.parameter("theta").and_then(|v| v.as_f64()).unwrap_or_default(),
            map_id: action
                .parameter("mapId")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned(),
            map_description: None,
            position_initialized: true,
            localization_score: None,
            deviation_range: None,
        };
        let last_node_id = action
            .parameter("lastNodeId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();

        let weak = Arc::downgrade(services);
        let action_id = action.action_id.clone();
        let action_type = action.action_type.clone();
        services.tasks.push(move || {
            let Some(services) = weak.upgrade() else {
                return;
            };
            services.state.set_action_status(&action_id, ActionStatus::Running);
            services.updates.request_update(UpdateUrgency::High);

            match odometry.initialize_position(&position) {
                Ok(()) => {
                    services.state.set_last_node_id(last_node_id);
                    services.state.set_action_status(&action_id, ActionStatus::Finished);
                }
                Err(error) => {
                    tracing::warn!(%error, "position initialization failed");
                    services.state.add_error(
                        Error::warning(kind::ACTION_ERROR)
                            .with_description(error.to_string())
                            .with_reference("action.actionType", &action_type)
                            .with_reference("action.actionId", &action_id),
                    );
                }
            }
            services.updates.request_update(UpdateUrgency::High);
        });
    }
}

#[cfg(test)]
#[path = "logic_tests.rs"]
mod logic_tests;
