// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural checks on the order graph itself.

use vda5050_wire::{Error, Order};

use super::{kind, Rule};

/// Validates the node/edge alternation of an order:
/// nodes sit at even `sequence_id`s, edges at odd ones, the combined sequence
/// is contiguous and strictly increasing, it starts and ends with a node,
/// released elements precede the horizon, and every edge names its
/// neighbouring nodes.
#[derive(Default)]
pub struct OrderGraphRule;

enum Element<'a> {
    Node(&'a vda5050_wire::Node),
    Edge(&'a vda5050_wire::Edge),
}

impl Element<'_> {
    fn sequence_id(&self) -> u64 {
        match self {
            Element::Node(n) => n.sequence_id,
            Element::Edge(e) => e.sequence_id,
        }
    }

    fn released(&self) -> bool {
        match self {
            Element::Node(n) => n.released,
            Element::Edge(e) => e.released,
        }
    }
}

fn order_error(description: &str, order: &Order) -> Error {
    Error::warning(kind::ORDER_ERROR)
        .with_description(description)
        .with_reference("orderId", &order.order_id)
        .with_reference("orderUpdateId", order.order_update_id.to_string())
}

impl Rule<Order> for OrderGraphRule {
    fn name(&self) -> &'static str {
        "order-graph"
    }

    fn check(&self, order: &Order) -> Vec<Error> {
        let mut errors = vec![];

        if order.nodes.is_empty() {
            errors.push(order_error("Order contains no nodes", order));
            return errors;
        }

        let mut elements: Vec<Element> = order
            .nodes
            .iter()
            .map(Element::Node)
            .chain(order.edges.iter().map(Element::Edge))
            .collect();
        elements.sort_by_key(Element::sequence_id);

        let first_sequence = elements[0].sequence_id();
        if first_sequence % 2 != 0 || !matches!(elements[0], Element::Node(_)) {
            errors.push(order_error("Order does not start with a node", order));
        }
        if !matches!(elements[elements.len() - 1], Element::Node(_)) {
            errors.push(order_error("Order does not end with a node", order));
        }

        for (offset, element) in elements.iter().enumerate() {
            let expected = first_sequence + offset as u64;
            if element.sequence_id() != expected {
                errors.push(
                    order_error("Order sequence ids are not contiguous", order)
                        .with_reference("sequenceId", element.sequence_id().to_string()),
                );
                // Alternation checks are meaningless on a broken sequence.
                return errors;
            }
            let is_node = matches!(element, Element::Node(_));
            if is_node != (element.sequence_id() % 2 == 0) {
                errors.push(
                    order_error("Nodes and edges do not alternate", order)
                        .with_reference("sequenceId", element.sequence_id().to_string()),
                );
            }
        }

        // Horizon elements never precede released ones.
        let mut horizon_seen = false;
        for element in &elements {
            if element.released() && horizon_seen {
                errors.push(
                    order_error("Released element follows a horizon element", order)
                        .with_reference("sequenceId", element.sequence_id().to_string()),
                );
            }
            if !element.released() {
                horizon_seen = true;
            }
        }

        // Edges reference their neighbouring nodes.
        for window in elements.windows(3) {
            if let [Element::Node(prev), Element::Edge(edge), Element::Node(next)] = window {
                if edge.start_node_id != prev.node_id || edge.end_node_id != next.node_id {
                    errors.push(
                        order_error("Edge endpoints do not match the adjacent nodes", order)
                            .with_reference("edge.edgeId", &edge.edge_id),
                    );
                }
            }
        }

        errors
    }
}

#[cfg(test)]
#[path = "order_graph_tests.rs"]
mod order_graph_tests;
