// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consistency checks between an incoming order and the order the vehicle is
//! already executing, plus the classification the messaging layer uses to
//! route an accepted order.

use std::sync::Arc;

use vda5050_wire::{Error, Order};

use crate::state::StateStore;

use super::{kind, Rule};

/// How an incoming order that passed validation is to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDisposition {
    /// A new `order_id`: build a fresh net.
    NewOrder,
    /// Same `order_id`, higher `order_update_id`: extend the running net.
    Extension,
    /// An already-processed message: ignore silently.
    Duplicate,
}

/// Classify an incoming order against the currently accepted one.
///
/// Assumes the order already passed the [`OrderUpdateRule`].
pub fn classify(store: &StateStore, order: &Order) -> UpdateDisposition {
    store.with_order(|current| match current {
        None => UpdateDisposition::NewOrder,
        Some(current) if current.order_id != order.order_id => UpdateDisposition::NewOrder,
        Some(current) if current.order_update_id == order.order_update_id => {
            UpdateDisposition::Duplicate
        }
        Some(_) => UpdateDisposition::Extension,
    })
}

/// Whether `incoming` is a repetition of an already processed message: same
/// order and update id, and every element it carries matches the accepted
/// (merged) order at the same sequence id.
///
/// The accepted order accumulates all released elements across updates, so a
/// re-sent update compares as a subset, not byte-for-byte against the whole.
pub(crate) fn is_repetition(current: &Order, incoming: &Order) -> bool {
    if current.order_id != incoming.order_id
        || current.order_update_id != incoming.order_update_id
    {
        return false;
    }
    incoming.nodes.iter().all(|node| {
        current.nodes.iter().any(|known| known.sequence_id == node.sequence_id && known == node)
    }) && incoming.edges.iter().all(|edge| {
        current.edges.iter().any(|known| known.sequence_id == edge.sequence_id && known == edge)
    })
}

/// Validates the `order_update_id` progression and that an update repeats the
/// already-released part of the order byte-for-byte.
pub struct OrderUpdateRule {
    store: Arc<StateStore>,
}

impl OrderUpdateRule {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

impl Rule<Order> for OrderUpdateRule {
    fn name(&self) -> &'static str {
        "order-update"
    }

    fn check(&self, order: &Order) -> Vec<Error> {
        let current = self.store.with_order(|o| o.cloned());

        let Some(current) = current else {
            return vec![];
        };

        if current.order_id != order.order_id {
            if !self.store.is_idle() {
                return vec![Error::warning(kind::ORDER_ERROR)
                    .with_description("Cannot accept a new order while an order is active")
                    .with_reference("orderId", &order.order_id)];
            }
            return vec![];
        }

        if order.order_update_id < current.order_update_id {
            return vec![Error::warning(kind::ORDER_ERROR)
                .with_description("orderUpdateId is stale")
                .with_reference("orderId", &order.order_id)
                .with_reference("orderUpdateId", order.order_update_id.to_string())];
        }

        if order.order_update_id == current.order_update_id {
            // A repetition of the same update must match what was accepted;
            // an equal id with a different body is a fatal protocol
            // violation.
            if !is_repetition(&current, order) {
                return vec![Error::fatal(kind::ORDER_ERROR)
                    .with_description("orderUpdateId was reused with a different order body")
                    .with_reference("orderId", &order.order_id)
                    .with_reference("orderUpdateId", order.order_update_id.to_string())];
            }
            return vec![];
        }

        // A proper update: everything it repeats from the released part of
        // the running order must match exactly.
        let mut errors = vec![];
        for node in order.nodes.iter().filter(|n| n.released) {
            if let Some(known) =
                current.nodes.iter().filter(|n| n.released).find(|n| n.sequence_id == node.sequence_id)
            {
                if known != node {
                    errors.push(
                        Error::warning(kind::ORDER_ERROR)
                            .with_description("Order update rewrites an already released node")
                            .with_reference("node.nodeId", &node.node_id)
                            .with_reference("node.sequenceId", node.sequence_id.to_string()),
                    );
                }
            }
        }
        for edge in order.edges.iter().filter(|e| e.released) {
            if let Some(known) =
                current.edges.iter().filter(|e| e.released).find(|e| e.sequence_id == edge.sequence_id)
            {
                if known != edge {
                    errors.push(
                        Error::warning(kind::ORDER_ERROR)
                            .with_description("Order update rewrites an already released edge")
                            .with_reference("edge.edgeId", &edge.edge_id)
                            .with_reference("edge.sequenceId", edge.sequence_id.to_string()),
                    );
                }
            }
        }
        errors
    }
}

#[cfg(test)]
#[path = "order_update_tests.rs"]
mod order_update_tests;
