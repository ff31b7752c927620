// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VDA 5050 v2.0 message model.
//!
//! Serde representations of the five protocol topics exchanged between an AGV
//! and master control: `order`, `instantActions`, `state`, `visualization`
//! and `connection`.  Field names, enumerations and required/optional markers
//! follow the standard; structs serialize with camelCase keys and enums with
//! SCREAMING_SNAKE_CASE values, matching the published JSON schemas.

pub mod action;
pub mod common;
pub mod connection;
pub mod instant_actions;
pub mod order;
pub mod state;
pub mod visualization;

pub use action::{Action, ActionParameter, ActionParameterValue, BlockingType};
pub use common::{AgvPosition, Header, NodePosition, Trajectory, Velocity};
pub use connection::{Connection, ConnectionState};
pub use instant_actions::InstantActions;
pub use order::{Edge, Node, Order};
pub use state::{
    ActionState, ActionStatus, BatteryState, EStop, EdgeState, Error, ErrorLevel, ErrorReference,
    InfoLevel, InfoReference, Information, Load, NodeState, OperatingMode, SafetyState, State,
};
pub use visualization::Visualization;
