// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actions and their parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A discrete, named operation the AGV is asked to perform, attached to a
/// node, an edge, or sent as an instant action.
///
/// Equality ignores `action_description`: two actions that differ only in
/// their description are considered the same action on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Identifies the function of the action.
    pub action_type: String,
    /// Globally unique id distinguishing multiple actions, even of the same
    /// type on the same node/edge.
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_description: Option<String>,
    pub blocking_type: BlockingType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_parameters: Vec<ActionParameter>,
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.action_type == other.action_type
            && self.action_id == other.action_id
            && self.blocking_type == other.blocking_type
            && self.action_parameters == other.action_parameters
    }
}

impl Action {
    /// Look up a parameter value by key.
    pub fn parameter(&self, key: &str) -> Option<&ActionParameterValue> {
        self.action_parameters.iter().find(|p| p.key == key).map(|p| &p.value)
    }
}

/// Regulates if the action is allowed to be executed during movement and/or
/// parallel to other actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockingType {
    /// Action can happen in parallel with others, including movement.
    None,
    /// Action can happen simultaneously with others, but not while moving.
    Soft,
    /// No other actions can be performed while this action is running.
    Hard,
}

impl BlockingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Soft => "SOFT",
            Self::Hard => "HARD",
        }
    }
}

impl fmt::Display for BlockingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(key, value)` action parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    /// For example `duration`, `direction`, `signal`.
    pub key: String,
    #[serde(deserialize_with = "deserialize_parameter_value")]
    pub value: ActionParameterValue,
}

/// The value of an action parameter. The standard permits any JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
}

impl ActionParameterValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view: integers widen to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Plain-text rendering, used for error references and value-set
    /// membership checks.
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for ActionParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn deserialize_parameter_value<'de, D>(deserializer: D) -> Result<ActionParameterValue, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;

    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = ActionParameterValue;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean, integer, float or string")
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(ActionParameterValue::Bool(v))
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(ActionParameterValue::Integer(v))
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map(ActionParameterValue::Integer)
                .or(Ok(ActionParameterValue::Float(v as f64)))
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(ActionParameterValue::Float(v))
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(ActionParameterValue::Str(v.to_owned()))
        }

        fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(ActionParameterValue::Str(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod action_tests;
