// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `connection` topic, published with the retain flag and configured as
//! the broker's last-will message so master control learns about broken
//! connections.

use serde::{Deserialize, Serialize};

use crate::common::Header;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(flatten)]
    pub header: Header,
    pub connection_state: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// The connection between AGV and broker is active.
    Online,
    /// The AGV went offline in a coordinated way.
    Offline,
    /// The connection ended unexpectedly (last-will payload).
    ConnectionBroken,
}
