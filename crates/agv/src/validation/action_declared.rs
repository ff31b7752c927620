// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checks an action against the AGV's declared action set plus the built-in
//! control actions.

use std::cmp::Ordering;

use vda5050_wire::{Action, ActionParameter, Error};

use crate::description::{ActionDeclaration, AgvDescription};
use crate::value::ParameterRange;

use super::{control_actions, kind, Rule};

/// Where the checked action is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionContext {
    Node,
    Edge,
    Instant,
}

/// Validates that an action was declared, fits its context and blocking
/// type, and that its parameters satisfy the declared ranges.
///
/// When the AGV description carries no `supported_actions` at all, action
/// validation is disabled and every action passes.
pub struct ActionDeclaredRule {
    supported: Option<Vec<ActionDeclaration>>,
    context: ActionContext,
}

impl ActionDeclaredRule {
    pub fn new(description: &AgvDescription, context: ActionContext) -> Self {
        Self { supported: description.supported_actions.clone(), context }
    }

    fn declaration_for(&self, action_type: &str) -> Option<&ActionDeclaration> {
        let supported = self.supported.as_ref()?;
        supported
            .iter()
            .find(|d| d.action_type == action_type)
            .or_else(|| control_actions().iter().find(|d| d.action_type == action_type))
    }
}

impl Rule<Action> for ActionDeclaredRule {
    fn name(&self) -> &'static str {
        "action-declared"
    }

    fn check(&self, action: &Action) -> Vec<Error> {
        // `supported_actions: None` disables action validation.
        if self.supported.is_none() {
            return vec![];
        }

        let Some(declaration) = self.declaration_for(&action.action_type) else {
            return vec![action_error(kind::UNKNOWN_ACTION, action)
                .with_description("Action type not supported")];
        };

        let context_ok = match self.context {
            ActionContext::Node => declaration.node,
            ActionContext::Edge => declaration.edge,
            ActionContext::Instant => declaration.instant,
        };
        if !context_ok {
            let what = match self.context {
                ActionContext::Node => "Action cannot be executed on nodes",
                ActionContext::Edge => "Action cannot be executed on edges",
                ActionContext::Instant => "Action cannot be executed instantaneously",
            };
            return vec![action_error(kind::ACTION_CONTEXT, action).with_description(what)];
        }

        if !declaration.allows_blocking_type(action.blocking_type) {
            return vec![action_error(kind::ACTION_BLOCKING_TYPE, action)
                .with_description("Action blockingType not supported")];
        }

        let mut errors = vec![];
        let mut missing: Vec<&str> =
            declaration.parameters.iter().map(|p| p.key.as_str()).collect();

        for param in &action.action_parameters {
            if let Some(range) = declaration.parameter(&param.key) {
                missing.retain(|key| *key != param.key);
                errors.extend(parameter_errors(action, range, param));
            } else if let Some(range) = declaration.optional_parameter(&param.key) {
                errors.extend(parameter_errors(action, range, param));
            } else {
                errors.push(
                    action_error(kind::ACTION_PARAMETER, action)
                        .with_description("Action parameter not supported")
                        .with_reference("actionParameter.key", &param.key),
                );
            }
        }

        if !missing.is_empty() {
            errors.push(
                action_error(kind::ACTION_PARAMETER_MISSING, action)
                    .with_description("Required action parameters missing")
                    .with_reference("actionParameter.key", missing.join(" ")),
            );
        }

        errors
    }
}

/// Check one supplied parameter against its declared range; yields at most
/// one error.
fn parameter_errors(
    action: &Action,
    range: &ParameterRange,
    param: &ActionParameter,
) -> Option<Error> {
    let text = param.value.to_text();

    if let Some(value_set) = &range.value_set {
        if !value_set.contains(&text) {
            return Some(
                parameter_error(kind::ACTION_PARAMETER_VALUE, action, param)
                    .with_description("Invalid action parameter value"),
            );
        }
        return None;
    }

    for (bound, out_of_bounds) in [
        (range.ordinal_max.as_ref(), Ordering::Greater),
        (range.ordinal_min.as_ref(), Ordering::Less),
    ] {
        let Some(bound) = bound else { continue };
        match bound.with_text(&text).try_cmp(bound) {
            Ok(ordering) if ordering == out_of_bounds => {
                return Some(
                    parameter_error(kind::ACTION_PARAMETER_OUT_OF_BOUNDS, action, param)
                        .with_description("Action parameter value out of bounds"),
                );
            }
            Ok(_) => {}
            Err(_) => {
                // The cast failure stops here; it never propagates further.
                return Some(
                    parameter_error(kind::ACTION_PARAMETER_TYPE, action, param)
                        .with_description(
                            "Action parameter value does not match the declared type",
                        ),
                );
            }
        }
    }

    None
}

fn action_error(error_type: &str, action: &Action) -> Error {
    Error::warning(error_type)
        .with_reference("actionId", &action.action_id)
        .with_reference("actionType", &action.action_type)
}

fn parameter_error(error_type: &str, action: &Action, param: &ActionParameter) -> Error {
    action_error(error_type, action)
        .with_reference("actionParameter.key", &param.key)
        .with_reference("actionParameter.value", param.value.to_text())
}

#[cfg(test)]
#[path = "action_declared_tests.rs"]
mod action_declared_tests;
