// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration-time description of the vehicle.
//!
//! The integrator hands one [`AgvDescription`] to the handle builder. It
//! feeds the outgoing message headers and, through `supported_actions`, the
//! admission control of incoming actions. All of it is serde-derived so a
//! deployment can keep the description in a JSON file.

use serde::{Deserialize, Serialize};

use vda5050_wire::BlockingType;

use crate::value::ParameterRange;

/// The library configuration describing one AGV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgvDescription {
    /// Unique AGV id.
    pub agv_id: String,
    /// Manufacturer string (message header).
    pub manufacturer: String,
    /// Serial number (message header).
    pub serial_number: String,
    /// Free-text description of the AGV.
    #[serde(default)]
    pub description: String,
    pub battery: Battery,
    pub navigation: NavigationProfile,
    /// [kg] Weight of the AGV without load.
    pub weight: f64,
    /// Declarations of all actions the AGV itself handles.
    ///
    /// The control actions (`cancelOrder`, `startPause`, ...) are always
    /// declared by the library and must not be listed here.
    /// `Some(vec![])` means no AGV actions are available; `None` disables
    /// action validation altogether.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_actions: Option<Vec<ActionDeclaration>>,
}

/// Battery description of an AGV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// [m] Maximum reach with a full battery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reach: Option<u32>,
    /// [Ah] Maximum battery charge.
    pub max_charge: f64,
    /// [V] Maximum battery voltage.
    pub max_voltage: f64,
    /// What kind of charge station can be used.
    pub charge_type: String,
}

/// Navigation capabilities of the AGV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationProfile {
    pub driving_mode: DrivingMode,
    pub kinematic: Kinematic,
    pub max_velocity: VelocityLimit,
    pub max_acceleration: Acceleration,
    pub max_deceleration: Acceleration,
    /// [m] Minimum turning radius of the AGV.
    pub min_turning_radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrivingMode {
    #[default]
    Unspecified,
    /// Limited to a physical or virtual line.
    LineGuided,
    /// Plans its own trajectory.
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kinematic {
    #[default]
    Unspecified,
    Holonomous,
    Ackermann,
    Differential,
}

/// Maximum velocities of the AGV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityLimit {
    /// [m/s] linear motion.
    pub linear: f64,
    /// [rad/s] angular motion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular: Option<f64>,
}

/// Acceleration limits of the AGV.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Acceleration {
    /// [m/s^2] along the x direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ax: Option<f64>,
    /// [m/s^2] along the y direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ay: Option<f64>,
    /// [rad/s^2] around the z axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omega: Option<f64>,
}

/// Declaration of one action type the AGV can perform, used to validate
/// incoming actions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionDeclaration {
    /// Identifies the declaration; unique within the description.
    pub action_type: String,
    /// Mandatory parameters, unique per key.
    #[serde(default)]
    pub parameters: Vec<ParameterRange>,
    /// Optional parameters, unique per key.
    #[serde(default)]
    pub optional_parameters: Vec<ParameterRange>,
    /// All blocking types the AGV accepts for this action.
    pub blocking_types: Vec<BlockingType>,
    /// Can this action be sent as an instant action?
    #[serde(default)]
    pub instant: bool,
    /// Can this action be attached to a node?
    #[serde(default)]
    pub node: bool,
    /// Can this action be attached to an edge?
    #[serde(default)]
    pub edge: bool,
}

impl ActionDeclaration {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self { action_type: action_type.into(), ..Self::default() }
    }

    pub fn with_parameter(mut self, range: ParameterRange) -> Self {
        self.parameters.push(range);
        self
    }

    pub fn with_optional_parameter(mut self, range: ParameterRange) -> Self {
        self.optional_parameters.push(range);
        self
    }

    pub fn with_blocking_types(mut self, types: impl IntoIterator<Item = BlockingType>) -> Self {
        self.blocking_types.extend(types);
        self
    }

    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    pub fn on_nodes(mut self) -> Self {
        self.node = true;
        self
    }

    pub fn on_edges(mut self) -> Self {
        self.edge = true;
        self
    }

    /// Look up a mandatory parameter declaration by key.
    pub fn parameter(&self, key: &str) -> Option<&ParameterRange> {
        self.parameters.iter().find(|p| p.key == key)
    }

    /// Look up an optional parameter declaration by key.
    pub fn optional_parameter(&self, key: &str) -> Option<&ParameterRange> {
        self.optional_parameters.iter().find(|p| p.key == key)
    }

    pub fn allows_blocking_type(&self, blocking_type: BlockingType) -> bool {
        self.blocking_types.contains(&blocking_type)
    }
}
