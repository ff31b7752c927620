// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use vda5050_wire::ErrorLevel;

use super::*;
use crate::test_support::orders::{base_and_update, node, order, two_nodes_with_actions};

fn store_with_base() -> (Arc<StateStore>, vda5050_wire::Order, vda5050_wire::Order) {
    let store = Arc::new(StateStore::new("acme", "agv-042"));
    let (base, update) = base_and_update();
    store.set_order(&base);
    (store, base, update)
}

#[test]
fn first_order_passes_with_nothing_to_compare() {
    let store = Arc::new(StateStore::new("acme", "agv-042"));
    let rule = OrderUpdateRule::new(Arc::clone(&store));
    let o = two_nodes_with_actions();

    assert!(rule.check(&o).is_empty());
    assert_eq!(classify(&store, &o), UpdateDisposition::NewOrder);
}

#[test]
fn new_order_id_is_rejected_while_active() {
    let (store, _, _) = store_with_base();
    let rule = OrderUpdateRule::new(Arc::clone(&store));

    let other = order("o-2", 0, vec![node("N1", 0, true, vec![])], vec![]);
    let errors = rule.check(&other);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, kind::ORDER_ERROR);
}

#[test]
fn stale_update_id_is_rejected() {
    let (store, base, _) = store_with_base();
    store.extend_order(&{
        let (_, update) = base_and_update();
        update
    });
    let rule = OrderUpdateRule::new(Arc::clone(&store));

    let mut stale = base;
    stale.order_update_id = 0;
    // The store is now at update id 1; a replay of id 0 body differs from
    // the merged order, but the stale id is caught first.
    let errors = rule.check(&stale);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].error_description.as_deref() == Some("orderUpdateId is stale"));
}

#[test]
fn identical_repetition_is_a_duplicate() {
    let (store, base, _) = store_with_base();
    let rule = OrderUpdateRule::new(Arc::clone(&store));

    assert!(rule.check(&base).is_empty());
    assert_eq!(classify(&store, &base), UpdateDisposition::Duplicate);
}

#[test]
fn reused_update_id_with_different_body_is_fatal() {
    let (store, base, _) = store_with_base();
    let rule = OrderUpdateRule::new(Arc::clone(&store));

    let mut tampered = base;
    tampered.nodes[0].node_id = "N9".to_owned();
    let errors = rule.check(&tampered);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_level, ErrorLevel::Fatal);
}

#[test]
fn proper_extension_passes() {
    let (store, _, update) = store_with_base();
    let rule = OrderUpdateRule::new(Arc::clone(&store));

    assert!(rule.check(&update).is_empty());
    assert_eq!(classify(&store, &update), UpdateDisposition::Extension);
}

#[test]
fn update_rewriting_released_elements_is_rejected() {
    let (store, _, update) = store_with_base();
    let rule = OrderUpdateRule::new(Arc::clone(&store));

    let mut rewriting = update;
    // The stitch node N2 at sequence 2 is already released; renaming it
    // breaks the byte-for-byte repetition rule.
    rewriting.nodes[0].node_id = "N9".to_owned();
    let errors = rule.check(&rewriting);
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .error_description
        .as_deref()
        .is_some_and(|d| d.contains("already released node")));
}
