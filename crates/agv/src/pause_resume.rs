// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State machine around one `startPause`/`stopPause` instant action.
//!
//! The manager owns the driver call for the lifetime of one action: it
//! schedules `do_pause`/`do_resume` on the task queue and the sink events
//! defined here move the action through its states. The driver may use the
//! sink's notify hooks to have the runtime pause or resume running actions
//! and navigation while it brings the vehicle to a halt.

use std::sync::Arc;

use vda5050_wire::{Action, ActionStatus, Error};

use crate::handle::Services;
use crate::handler::PauseResumeSink;
use crate::update::UpdateUrgency;
use crate::validation::kind;

pub(crate) struct PauseResumeActionManager {
    action_id: String,
    action_type: String,
    /// True for `startPause`, false for `stopPause`.
    pausing: bool,
}

impl PauseResumeActionManager {
    pub fn new(action: &Action) -> Self {
        Self {
            action_id: action.action_id.clone(),
            action_type: action.action_type.clone(),
            pausing: action.action_type == "startPause",
        }
    }

    /// Schedule the driver call on the task queue.
    pub fn initialize(&self, services: &Arc<Services>) {
        let Some(handler) = services.handlers.pause_resume() else {
            tracing::warn!(action_type = %self.action_type, "no pause/resume handler registered");
            services.state.set_action_status(&self.action_id, ActionStatus::Failed);
            services.state.add_error(
                Error::warning(kind::ACTION_ERROR)
                    .with_description("No pause/resume handler attached")
                    .with_reference("actionId", &self.action_id)
                    .with_reference("actionType", &self.action_type),
            );
            services.updates.request_update(UpdateUrgency::High);
            return;
        };

        let sink = PauseResumeSink::new(Arc::downgrade(services), &self.action_id, self.pausing);
        let weak = Arc::downgrade(services);
        let action_id = self.action_id.clone();
        let pausing = self.pausing;
        services.tasks.push(move || {
            let outcome =
                if pausing { handler.do_pause(sink) } else { handler.do_resume(sink) };
            if let Err(error) = outcome {
                let Some(services) = weak.upgrade() else {
                    return;
                };
                let entrypoint = if pausing {
                    "PauseResumeHandler::do_pause"
                } else {
                    "PauseResumeHandler::do_resume"
                };
                tracing::error!(%error, entrypoint, "pause/resume driver failed");
                services.state.add_error(
                    Error::fatal(kind::ACTION_ERROR)
                        .with_description(format!("{entrypoint}: {error}"))
                        .with_reference("actionId", &action_id),
                );
                services.state.set_action_status(&action_id, ActionStatus::Failed);
                services.updates.request_update(UpdateUrgency::High);
                services.logic.abort_order(&services, None);
            }
        });
    }
}

// -- Sink events ---------------------------------------------------------------

pub(crate) fn started(services: &Arc<Services>, action_id: &str) {
    services.state.set_action_status(action_id, ActionStatus::Running);
    services.updates.request_update(UpdateUrgency::Medium);
}

pub(crate) fn failed(services: &Arc<Services>, action_id: &str, description: String) {
    tracing::warn!(action_id, %description, "pause/resume failed");
    services.state.set_action_status(action_id, ActionStatus::Failed);
    services.updates.request_update(UpdateUrgency::High);
}

pub(crate) fn finished(services: &Arc<Services>, action_id: &str, pausing: bool) {
    services.state.set_action_status(action_id, ActionStatus::Finished);
    services.state.set_paused(pausing);
    if !pausing {
        // Resuming: the net re-evaluates everything that was held back.
        services.logic.restart(services);
    }
    services.updates.request_update(UpdateUrgency::High);
}

pub(crate) fn notify_running_actions(services: &Arc<Services>, pausing: bool) {
    if pausing {
        services.net.pause_all_running_actions(services);
    } else {
        services.net.resume_all_paused_actions(services);
        services.logic.restart(services);
    }
}

pub(crate) fn notify_running_navigation(services: &Arc<Services>, pausing: bool) {
    if pausing {
        services.net.pause_driving(services);
    } else {
        services.net.resume_driving(services);
        services.logic.restart(services);
    }
}
