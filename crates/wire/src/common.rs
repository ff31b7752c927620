// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared message fragments: the common header block, positions, velocity
//! and trajectory geometry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol version stamped into every outgoing header.
pub const PROTOCOL_VERSION: &str = "2.0.0";

/// Header block shared by every VDA 5050 topic.
///
/// `header_id` is counted per topic and incremented by 1 with each sent (but
/// not necessarily received) message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub header_id: u64,
    /// Timestamp (ISO 8601, UTC), e.g. `2017-04-15T11:40:03.12Z`.
    pub timestamp: DateTime<Utc>,
    /// Protocol version `[Major].[Minor].[Patch]`.
    pub version: String,
    pub manufacturer: String,
    pub serial_number: String,
}

impl Header {
    /// Build a header stamped with the current time and protocol version.
    pub fn now(header_id: u64, manufacturer: impl Into<String>, serial_number: impl Into<String>) -> Self {
        Self {
            header_id,
            timestamp: Utc::now(),
            version: PROTOCOL_VERSION.to_owned(),
            manufacturer: manufacturer.into(),
            serial_number: serial_number.into(),
        }
    }
}

/// Current position of the AGV on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgvPosition {
    pub x: f64,
    pub y: f64,
    /// Range: [-pi..pi]. Orientation of the AGV.
    pub theta: f64,
    pub map_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_description: Option<String>,
    pub position_initialized: bool,
    /// 0.0: position unknown, 1.0: position known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localization_score: Option<f64>,
    /// Deviation range of the position in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation_range: Option<f64>,
}

/// Position of a node on a map, with the deviation the AGV is allowed when
/// traversing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
    /// Range: [-pi..pi]. Orientation the AGV has to assume on this node, if
    /// defined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    /// Allowed deviation radius in meters. 0 means no deviation beyond the
    /// manufacturer tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_deviation_xy: Option<f64>,
    /// Allowed deviation of the theta angle on this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_deviation_theta: Option<f64>,
    pub map_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_description: Option<String>,
}

/// The AGVs velocity in vehicle coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Velocity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
    /// Turning speed around the z axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omega: Option<f64>,
}

/// Position of a load on the AGV, in vehicle coordinates. The reference
/// point is the middle of the load's footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBoxReference {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Orientation of the load's bounding box, e.g. for tugger trains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
}

/// Dimensions of a load's bounding box in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDimensions {
    pub length: f64,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// NURBS trajectory for an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// Number of control points that influence any given point on the curve.
    pub degree: i64,
    /// Knot vector; size is number of control points + degree + 1.
    pub knot_vector: Vec<f64>,
    pub control_points: Vec<ControlPoint>,
}

/// A single NURBS control point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
    /// Range: (0..infinity). Weight with which this control point pulls on
    /// the curve; 1.0 when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f64>,
}
