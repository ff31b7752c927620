// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `order` topic: a graph of nodes and edges for the AGV to execute.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::common::{Header, NodePosition, Trajectory};

/// An order communicated from master control to the AGV.
///
/// Nodes and edges alternate by `sequence_id`: nodes sit at even positions,
/// edges at odd ones. Released elements form the base and must be executed;
/// unreleased elements form the horizon and may be replaced by updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub header: Header,
    /// Unique order identification.
    pub order_id: String,
    /// Unique per `order_id`, incremented with every update.
    pub order_update_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_set_id: Option<String>,
    /// Base and horizon nodes of the order graph.
    pub nodes: Vec<Node>,
    /// Base and horizon edges of the order graph.
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: String,
    /// Tracks the position of this node within the order; runs across all
    /// nodes and edges of the same `order_id`.
    pub sequence_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_description: Option<String>,
    /// True: part of the base. False: part of the horizon.
    pub released: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_position: Option<NodePosition>,
    /// Actions to execute on the node, in list order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub edge_id: String,
    pub sequence_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_description: Option<String>,
    /// True: part of the base. False: part of the horizon.
    pub released: bool,
    pub start_node_id: String,
    pub end_node_id: String,
    /// Permitted maximum speed on the edge in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    /// Permitted maximum height of vehicle and load in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f64>,
    /// Orientation of the AGV on the edge relative to the map origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f64>,
    /// Junction direction hint for line-guided vehicles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rotation_speed: Option<f64>,
    /// Distance from start to end node in meters, used by line-guided AGVs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Trajectory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod order_tests;
