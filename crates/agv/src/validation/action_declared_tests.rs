// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use vda5050_wire::{ActionParameterValue, BlockingType};

use super::*;
use crate::test_support::description;
use crate::test_support::orders::{action, action_with_params};
use crate::value::{ParameterRange, SerializedValue};

/// Declaration used throughout: `pick` with a mandatory `loadId`, HARD only,
/// node context.
fn pick_declaration() -> ActionDeclaration {
    ActionDeclaration::new("pick")
        .with_parameter(ParameterRange::any("loadId"))
        .with_optional_parameter(
            ParameterRange::any("height")
                .with_min(SerializedValue::of_float(0.0))
                .with_max(SerializedValue::of_float(2.0)),
        )
        .with_blocking_types([BlockingType::Hard])
        .on_nodes()
}

fn rule(context: ActionContext) -> ActionDeclaredRule {
    ActionDeclaredRule::new(&description(Some(vec![pick_declaration()])), context)
}

fn pick_with_load() -> vda5050_wire::Action {
    action_with_params(
        "pick",
        "a1",
        BlockingType::Hard,
        vec![("loadId", ActionParameterValue::Str("pallet-7".to_owned()))],
    )
}

#[test]
fn valid_action_passes() {
    assert!(rule(ActionContext::Node).check(&pick_with_load()).is_empty());
}

#[test]
fn unknown_action_type() {
    let errors = rule(ActionContext::Node).check(&action("teleport", "a1", BlockingType::None));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::UNKNOWN_ACTION);
    assert_eq!(errors[0].error_level, vda5050_wire::ErrorLevel::Warning);
    assert!(errors[0].error_references.iter().any(|r| r.reference_value == "teleport"));
}

#[test]
fn wrong_context_on_edge() {
    let errors = rule(ActionContext::Edge).check(&pick_with_load());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_CONTEXT);
}

#[test]
fn wrong_context_as_instant() {
    let errors = rule(ActionContext::Instant).check(&pick_with_load());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_CONTEXT);
}

#[test]
fn unsupported_blocking_type() {
    let mut a = pick_with_load();
    a.blocking_type = BlockingType::Soft;
    let errors = rule(ActionContext::Node).check(&a);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_BLOCKING_TYPE);
}

#[test]
fn missing_mandatory_parameter() {
    let errors = rule(ActionContext::Node).check(&action("pick", "a1", BlockingType::Hard));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_PARAMETER_MISSING);
    assert!(errors[0]
        .error_references
        .iter()
        .any(|r| r.reference_key == "actionParameter.key" && r.reference_value.contains("loadId")));
}

#[test]
fn unsupported_parameter() {
    let a = action_with_params(
        "pick",
        "a1",
        BlockingType::Hard,
        vec![
            ("loadId", ActionParameterValue::Str("p".to_owned())),
            ("color", ActionParameterValue::Str("red".to_owned())),
        ],
    );
    let errors = rule(ActionContext::Node).check(&a);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_PARAMETER);
}

#[test]
fn optional_parameter_out_of_bounds() {
    let a = action_with_params(
        "pick",
        "a1",
        BlockingType::Hard,
        vec![
            ("loadId", ActionParameterValue::Str("p".to_owned())),
            ("height", ActionParameterValue::Float(2.5)),
        ],
    );
    let errors = rule(ActionContext::Node).check(&a);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_PARAMETER_OUT_OF_BOUNDS);
}

#[test]
fn parameter_of_the_wrong_type() {
    let a = action_with_params(
        "pick",
        "a1",
        BlockingType::Hard,
        vec![
            ("loadId", ActionParameterValue::Str("p".to_owned())),
            ("height", ActionParameterValue::Str("tall".to_owned())),
        ],
    );
    let errors = rule(ActionContext::Node).check(&a);
    assert_eq!(errors.len(), 1);
    // The bad cast surfaces as a warning and stops there.
    assert_eq!(errors[0].error_type, kind::ACTION_PARAMETER_TYPE);
    assert_eq!(errors[0].error_level, vda5050_wire::ErrorLevel::Warning);
}

#[test]
fn value_set_membership() {
    let declaration = ActionDeclaration::new("turn")
        .with_parameter(ParameterRange::one_of("side", ["left", "right"]))
        .with_blocking_types([BlockingType::None])
        .on_nodes();
    let r = ActionDeclaredRule::new(&description(Some(vec![declaration])), ActionContext::Node);

    let ok = action_with_params(
        "turn",
        "a1",
        BlockingType::None,
        vec![("side", ActionParameterValue::Str("left".to_owned()))],
    );
    assert!(r.check(&ok).is_empty());

    let bad = action_with_params(
        "turn",
        "a2",
        BlockingType::None,
        vec![("side", ActionParameterValue::Str("up".to_owned()))],
    );
    let errors = r.check(&bad);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_PARAMETER_VALUE);
}

#[test]
fn control_actions_are_always_declared() {
    let r = rule(ActionContext::Instant);
    assert!(r.check(&action("cancelOrder", "c1", BlockingType::Hard)).is_empty());
    assert!(r.check(&action("stateRequest", "s1", BlockingType::None)).is_empty());

    // Control actions still enforce their declared blocking type.
    let errors = r.check(&action("cancelOrder", "c2", BlockingType::None));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_BLOCKING_TYPE);
}

#[test]
fn init_position_parameters_are_typed() {
    let r = rule(ActionContext::Instant);
    let ok = action_with_params(
        "initPosition",
        "i1",
        BlockingType::Hard,
        vec![
            ("x", ActionParameterValue::Float(1.0)),
            ("y", ActionParameterValue::Float(2.0)),
            ("theta", ActionParameterValue::Float(0.0)),
            ("mapId", ActionParameterValue::Str("m".to_owned())),
            ("lastNodeId", ActionParameterValue::Str("N7".to_owned())),
        ],
    );
    assert!(r.check(&ok).is_empty());

    let bad = action_with_params(
        "initPosition",
        "i2",
        BlockingType::Hard,
        vec![
            ("x", ActionParameterValue::Str("east".to_owned())),
            ("y", ActionParameterValue::Float(2.0)),
            ("theta", ActionParameterValue::Float(0.0)),
            ("mapId", ActionParameterValue::Str("m".to_owned())),
            ("lastNodeId", ActionParameterValue::Str("N7".to_owned())),
        ],
    );
    let errors = r.check(&bad);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ACTION_PARAMETER_TYPE);
}

#[test]
fn validation_is_skipped_without_declarations() {
    let r = ActionDeclaredRule::new(&description(None), ActionContext::Node);
    assert!(r.check(&action("teleport", "a1", BlockingType::None)).is_empty());
}

#[test]
fn empty_declaration_set_rejects_agv_actions_but_keeps_control_actions() {
    let r = ActionDeclaredRule::new(&description(Some(vec![])), ActionContext::Instant);
    assert!(r.check(&action("startPause", "p1", BlockingType::Hard)).is_empty());
    let errors = r.check(&action("pick", "a1", BlockingType::Hard));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::UNKNOWN_ACTION);
}
