// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `instantActions` topic: actions executed as soon as they arrive,
//! out-of-band of the running order.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::common::Header;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantActions {
    #[serde(flatten)]
    pub header: Header,
    /// Actions to perform immediately, not part of the regular order.
    pub instant_actions: Vec<Action>,
}
