// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checks that the first node of a new order is trivially reachable.

use std::sync::Arc;

use vda5050_wire::{Error, Order};

use crate::geometry::{angle_difference, circle_enclosure_of, Circle, Vec2};
use crate::state::StateStore;

use super::{kind, Rule};

/// Applies only to a brand-new order (engine idle, first node at
/// `sequence_id` 0). Reachability holds when the last reached node is the
/// order's first node, or when the AGV's position-uncertainty circle lies
/// fully inside the node's allowed-deviation circle and the orientation is
/// within the allowed deviation.
pub struct OrderReachableRule {
    store: Arc<StateStore>,
}

impl OrderReachableRule {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    fn first_node_reachable(&self, order: &Order) -> bool {
        let first = &order.nodes[0];

        let last_node_id = self.store.last_node_id();
        if !last_node_id.is_empty() {
            return last_node_id == first.node_id;
        }

        let position = match self.store.agv_position() {
            Some(p) if p.position_initialized => p,
            _ => return false,
        };
        let Some(node_position) = &first.node_position else {
            return false;
        };

        let possible_positions = Circle::new(
            Vec2::new(position.x, position.y),
            position.deviation_range.unwrap_or(0.0),
        );
        let node_deviation = Circle::new(
            Vec2::new(node_position.x, node_position.y),
            node_position.allowed_deviation_xy.unwrap_or(0.0),
        );

        if !circle_enclosure_of(node_deviation, possible_positions) {
            return false;
        }

        match node_position.theta {
            None => true,
            Some(theta) => {
                angle_difference(theta, position.theta)
                    <= node_position.allowed_deviation_theta.unwrap_or(0.0)
            }
        }
    }
}

impl Rule<Order> for OrderReachableRule {
    fn name(&self) -> &'static str {
        "order-reachable"
    }

    fn check(&self, order: &Order) -> Vec<Error> {
        let Some(first) = order.nodes.first() else {
            return vec![];
        };
        // Only a brand-new order is this rule's responsibility.
        if !(self.store.is_idle() && first.sequence_id == 0) {
            return vec![];
        }

        if self.first_node_reachable(order) {
            return vec![];
        }

        vec![Error::warning(kind::ORDER_ERROR)
            .with_description("First node of the order is not trivially reachable")
            .with_reference("node.nodeId", &first.node_id)
            .with_reference("node.sequenceId", "0")]
    }
}

#[cfg(test)]
#[path = "order_reachable_tests.rs"]
mod order_reachable_tests;
