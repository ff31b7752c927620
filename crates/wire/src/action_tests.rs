// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[allow(clippy::panic)]
fn parse(json: &str) -> Action {
    match serde_json::from_str(json) {
        Ok(a) => a,
        Err(e) => panic!("invalid action JSON: {e}"),
    }
}

#[test]
fn deserialize_typed_parameters() {
    let action = parse(
        r#"{
            "actionType": "pick",
            "actionId": "a1",
            "blockingType": "HARD",
            "actionParameters": [
                {"key": "loadId", "value": "pallet-7"},
                {"key": "height", "value": 0.35},
                {"key": "stationNo", "value": 4},
                {"key": "deep", "value": true}
            ]
        }"#,
    );

    assert_eq!(action.parameter("loadId").and_then(|v| v.as_str()), Some("pallet-7"));
    assert_eq!(action.parameter("height").and_then(|v| v.as_f64()), Some(0.35));
    assert_eq!(action.parameter("stationNo"), Some(&ActionParameterValue::Integer(4)));
    assert_eq!(action.parameter("deep").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(action.parameter("missing"), None);
}

#[test]
fn integer_widens_to_float_view() {
    let v = ActionParameterValue::Integer(4);
    assert_eq!(v.as_f64(), Some(4.0));
    assert_eq!(v.as_str(), None);
}

#[test]
fn parameter_value_round_trip() {
    let param = ActionParameter {
        key: "signal".to_owned(),
        value: ActionParameterValue::Str("left".to_owned()),
    };
    let json = serde_json::to_string(&param).ok();
    assert_eq!(json.as_deref(), Some(r#"{"key":"signal","value":"left"}"#));
}

#[test]
fn blocking_type_wire_names() {
    assert_eq!(serde_json::to_string(&BlockingType::None).ok().as_deref(), Some("\"NONE\""));
    assert_eq!(serde_json::to_string(&BlockingType::Soft).ok().as_deref(), Some("\"SOFT\""));
    assert_eq!(serde_json::to_string(&BlockingType::Hard).ok().as_deref(), Some("\"HARD\""));
}

#[test]
fn equality_ignores_description() {
    let a = parse(r#"{"actionType":"pick","actionId":"a1","blockingType":"NONE"}"#);
    let mut b = a.clone();
    b.action_description = Some("described".to_owned());
    assert_eq!(a, b);

    let mut c = a.clone();
    c.action_id = "a2".to_owned();
    assert_ne!(a, c);
}

#[test]
fn missing_parameters_default_to_empty() {
    let action = parse(r#"{"actionType":"stateRequest","actionId":"sr1","blockingType":"NONE"}"#);
    assert!(action.action_parameters.is_empty());
}
