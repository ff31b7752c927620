// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `state` topic: the full vehicle state published back to master
//! control, plus the error and information objects embedded in it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{
    AgvPosition, BoundingBoxReference, Header, LoadDimensions, NodePosition, Trajectory, Velocity,
};

/// All-encompassing state of the AGV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(flatten)]
    pub header: Header,
    /// Current or previously finished order id; empty string if none.
    pub order_id: String,
    /// 0 if no previous order update id is available.
    pub order_update_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_set_id: Option<String>,
    /// Node id of the last reached node; empty string if none.
    pub last_node_id: String,
    /// 0 if no node has been reached yet.
    pub last_node_sequence_id: u64,
    /// True while the AGV is driving and/or rotating.
    pub driving: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// True when the AGV is almost at the end of the base and would like a
    /// new base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_base_request: Option<bool>,
    /// Meters driven past `last_node_id`, for line-guided vehicles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_since_last_node: Option<f64>,
    pub operating_mode: OperatingMode,
    /// Nodes the AGV still has to drive over. Empty when idle.
    pub node_states: Vec<NodeState>,
    /// Edges the AGV still has to drive over. Empty when idle.
    pub edge_states: Vec<EdgeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agv_position: Option<AgvPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Velocity>,
    /// Loads the AGV currently carries, if it can reason about them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loads: Vec<Load>,
    /// Current and not-yet-finished actions; kept until a new order arrives.
    pub action_states: Vec<ActionState>,
    pub battery_state: BatteryState,
    /// All currently active errors. Empty array when none.
    pub errors: Vec<Error>,
    /// Visualization/debugging hints; never protocol logic.
    pub information: Vec<Information>,
    pub safety_state: SafetyState,
}

/// A node still ahead of the AGV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub node_id: String,
    pub sequence_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_position: Option<NodePosition>,
    pub released: bool,
}

/// An edge still ahead of the AGV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeState {
    pub edge_id: String,
    pub sequence_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_description: Option<String>,
    pub released: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Trajectory>,
}

/// Execution state of a single action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionState {
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_description: Option<String>,
    pub action_status: ActionStatus,
    /// For example the result of an RFID read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_description: Option<String>,
}

/// Status of an action as observed by master control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    /// Received, but the triggering node/edge was not reached yet.
    Waiting,
    /// Triggered; preparatory measures are initiated.
    Initializing,
    Running,
    /// Paused by a pause instant action or an external trigger.
    Paused,
    /// Finished; a result may be reported via `result_description`.
    Finished,
    /// Could not be finished for whatever reason.
    Failed,
}

impl ActionStatus {
    /// FINISHED and FAILED are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Initializing => "INITIALIZING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A load the AGV carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Load {
    /// Barcode/RFID of the load; empty if not yet identified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_type: Option<String>,
    /// Which load handling unit carries it, e.g. `front`, `back`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box_reference: Option<BoundingBoxReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_dimensions: Option<LoadDimensions>,
    /// Weight in kg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Battery information block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryState {
    /// State of charge in percent.
    pub battery_charge: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    /// State of health in percent, [0..100].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_health: Option<u32>,
    pub charging: bool,
    /// Estimated reach with the current charge, in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<f64>,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            battery_charge: 100.0,
            battery_voltage: None,
            battery_health: None,
            charging: false,
            reach: None,
        }
    }
}

/// Current operating mode of the AGV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingMode {
    #[default]
    Automatic,
    Semiautomatic,
    Manual,
    Service,
    Teachin,
}

/// A single protocol error entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// Type/name of the error; stable strings defined per subsystem.
    pub error_type: String,
    /// References identifying the offending protocol fields.
    pub error_references: Vec<ErrorReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    pub error_level: ErrorLevel,
}

impl Error {
    pub fn new(error_type: impl Into<String>, error_level: ErrorLevel) -> Self {
        Self {
            error_type: error_type.into(),
            error_references: vec![],
            error_description: None,
            error_level,
        }
    }

    pub fn warning(error_type: impl Into<String>) -> Self {
        Self::new(error_type, ErrorLevel::Warning)
    }

    pub fn fatal(error_type: impl Into<String>) -> Self {
        Self::new(error_type, ErrorLevel::Fatal)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.error_references.push(ErrorReference {
            reference_key: key.into(),
            reference_value: value.into(),
        });
        self
    }
}

/// `(key, value)` pair pointing at the source of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReference {
    /// E.g. `orderId`, `actionId`, `actionParameter.key`.
    pub reference_key: String,
    pub reference_value: String,
}

/// Error level reported to master control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorLevel {
    /// AGV is ready to continue.
    Warning,
    /// AGV is not in running condition; user intervention required.
    Fatal,
}

/// A visualization/debugging information entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Information {
    pub info_type: String,
    pub info_references: Vec<InfoReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_description: Option<String>,
    pub info_level: InfoLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoReference {
    pub reference_key: String,
    pub reference_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfoLevel {
    Info,
    Debug,
}

/// Safety status block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyState {
    pub e_stop: EStop,
    /// True when the protective field is violated.
    pub field_violation: bool,
}

/// Acknowledge type of the e-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EStop {
    /// Auto-acknowledgeable e-stop, e.g. from a bumper or protective field.
    Autoack,
    /// Has to be acknowledged manually at the vehicle.
    Manual,
    /// Facility e-stop, acknowledged remotely.
    Remote,
    /// No e-stop activated.
    #[default]
    None,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
