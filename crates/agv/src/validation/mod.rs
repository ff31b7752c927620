// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control for incoming orders and actions.
//!
//! A [`Rule`] is a named predicate producing a list of protocol errors;
//! composition is plain list concatenation through a [`Pipeline`]. Rules
//! never mutate anything: a rejected order or action leaves the engine state
//! unchanged, the produced errors are appended to the outgoing state by the
//! caller.

pub mod action_declared;
pub mod order_graph;
pub mod order_reachable;
pub mod order_update;

pub use action_declared::{ActionContext, ActionDeclaredRule};
pub use order_graph::OrderGraphRule;
pub use order_reachable::OrderReachableRule;
pub use order_update::{OrderUpdateRule, UpdateDisposition};
pub(crate) use order_update::classify;
pub(crate) use order_update::is_repetition;

use std::sync::OnceLock;

use vda5050_wire::{BlockingType, Error};

use crate::description::ActionDeclaration;
use crate::value::ParameterRange;

/// Stable error-kind strings reported to master control.
pub mod kind {
    pub const ORDER_ERROR: &str = "OrderError";
    pub const ACTION_ERROR: &str = "ActionError";
    pub const UNKNOWN_ACTION: &str = "Unknown Action";
    pub const ACTION_CONTEXT: &str = "Action Context";
    pub const ACTION_BLOCKING_TYPE: &str = "Action BlockingType";
    pub const ACTION_PARAMETER: &str = "ActionParameter";
    pub const ACTION_PARAMETER_MISSING: &str = "ActionParameter missing";
    pub const ACTION_PARAMETER_VALUE: &str = "ActionParameter Value";
    pub const ACTION_PARAMETER_OUT_OF_BOUNDS: &str = "ActionParameterValue out of bounds";
    pub const ACTION_PARAMETER_TYPE: &str = "ActionParameter type";
    pub const NO_ORDER_TO_CANCEL: &str = "noOrderToCancel";
}

/// A named check over one input type.
pub trait Rule<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the check; an empty list means the input passed.
    fn check(&self, input: &T) -> Vec<Error>;
}

/// A sequence of rules evaluated in order; their findings concatenate.
#[derive(Default)]
pub struct Pipeline<T> {
    rules: Vec<Box<dyn Rule<T>>>,
}

impl<T> Pipeline<T> {
    pub fn new() -> Self {
        Self { rules: vec![] }
    }

    pub fn with(mut self, rule: impl Rule<T> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn run(&self, input: &T) -> Vec<Error> {
        let mut errors = vec![];
        for rule in &self.rules {
            let findings = rule.check(input);
            if !findings.is_empty() {
                tracing::debug!(rule = rule.name(), count = findings.len(), "validation findings");
            }
            errors.extend(findings);
        }
        errors
    }
}

/// The control actions every AGV understands, declared by the library itself.
pub fn control_actions() -> &'static [ActionDeclaration] {
    static DECLARATIONS: OnceLock<Vec<ActionDeclaration>> = OnceLock::new();
    DECLARATIONS.get_or_init(|| {
        vec![
            ActionDeclaration::new("startPause")
                .with_blocking_types([BlockingType::Hard])
                .instant(),
            ActionDeclaration::new("stopPause")
                .with_blocking_types([BlockingType::Hard])
                .instant(),
            ActionDeclaration::new("stateRequest")
                .with_blocking_types([BlockingType::None])
                .instant(),
            ActionDeclaration::new("logReport")
                .with_parameter(ParameterRange::any("reason"))
                .with_blocking_types([BlockingType::None])
                .instant(),
            ActionDeclaration::new("cancelOrder")
                .with_blocking_types([BlockingType::Hard])
                .instant(),
            ActionDeclaration::new("initPosition")
                .with_parameter(ParameterRange::float("x"))
                .with_parameter(ParameterRange::float("y"))
                .with_parameter(ParameterRange::float("theta"))
                .with_parameter(ParameterRange::any("mapId"))
                .with_parameter(ParameterRange::any("lastNodeId"))
                .with_blocking_types([BlockingType::Hard])
                .instant(),
        ]
    })
}

/// Look up a control-action declaration by type.
pub fn control_action(action_type: &str) -> Option<&'static ActionDeclaration> {
    control_actions().iter().find(|d| d.action_type == action_type)
}
