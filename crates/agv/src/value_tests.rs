// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::cmp::Ordering;

use yare::parameterized;

use super::*;

#[test]
fn typed_constructors() {
    assert_eq!(SerializedValue::of_bool(true).ty, ValueType::Boolean);
    assert_eq!(SerializedValue::of_int(-3).value, "-3");
    assert_eq!(SerializedValue::of_float(1.5).value, "1.5");
    assert_eq!(SerializedValue::of_str("hall").as_str().ok(), Some("hall"));
}

#[test]
#[allow(clippy::panic)]
fn accessors_reject_wrong_type() {
    let s = SerializedValue::of_str("7");
    assert!(s.as_i64().is_err());
    assert!(s.as_f64().is_err());
    assert!(s.as_bool().is_err());

    let err = match s.as_i64() {
        Err(e) => e,
        Ok(_) => panic!("expected a cast error"),
    };
    assert_eq!(err.expected, ValueType::Integer);
    assert_eq!(err.found, ValueType::String);
}

#[test]
fn accessors_reject_unparsable_text() {
    let broken = SerializedValue { ty: ValueType::Integer, value: "not-a-number".to_owned() };
    assert!(broken.as_i64().is_err());

    let broken = SerializedValue { ty: ValueType::Float, value: "one point five".to_owned() };
    assert!(broken.as_f64().is_err());
}

#[parameterized(
    integers = { SerializedValue::of_int(2), SerializedValue::of_int(10), Ordering::Less },
    integers_text_order_differs = { SerializedValue::of_int(9), SerializedValue::of_int(10), Ordering::Less },
    floats = { SerializedValue::of_float(2.5), SerializedValue::of_float(2.25), Ordering::Greater },
    strings = { SerializedValue::of_str("a"), SerializedValue::of_str("b"), Ordering::Less },
    equal_floats = { SerializedValue::of_float(1.0), SerializedValue::of_float(1.0), Ordering::Equal },
)]
fn ordering_within_a_type(a: SerializedValue, b: SerializedValue, expected: Ordering) {
    assert_eq!(a.try_cmp(&b).ok(), Some(expected));
}

#[test]
fn boolean_true_is_greater_than_false() {
    let t = SerializedValue::of_bool(true);
    let f = SerializedValue::of_bool(false);
    assert_eq!(t.try_cmp(&f).ok(), Some(Ordering::Greater));
    assert_eq!(f.try_cmp(&t).ok(), Some(Ordering::Less));
    assert_eq!(t.try_cmp(&t).ok(), Some(Ordering::Equal));
}

#[test]
fn mixed_types_do_not_compare() {
    let i = SerializedValue::of_int(1);
    let f = SerializedValue::of_float(1.0);
    assert!(i.try_cmp(&f).is_err());
    assert!(f.try_cmp(&i).is_err());
}

#[test]
fn with_text_keeps_the_declared_type() {
    let bound = SerializedValue::of_float(10.0);
    let candidate = bound.with_text("3.5");
    assert_eq!(candidate.ty, ValueType::Float);
    assert_eq!(candidate.try_cmp(&bound).ok(), Some(Ordering::Less));

    // Text that does not parse as the declared type fails the comparison.
    assert!(bound.with_text("fast").try_cmp(&bound).is_err());
}

#[test]
fn parameter_range_builders() {
    let r = ParameterRange::one_of("side", ["left", "right"]);
    assert!(r.value_set.as_ref().is_some_and(|s| s.contains("left")));

    let r = ParameterRange::float("x");
    assert!(r.ordinal_min.is_some());
    assert!(r.ordinal_max.is_some());

    let r = ParameterRange::any("note");
    assert!(r.ordinal_min.is_none() && r.ordinal_max.is_none() && r.value_set.is_none());
}
