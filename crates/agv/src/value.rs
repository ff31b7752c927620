// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed-string values and declarative parameter constraints.
//!
//! Action parameters travel as text plus a declared type.  A
//! [`SerializedValue`] carries both and offers fallible accessors and an
//! ordering that is only defined between values of the same type; the
//! declarative [`ParameterRange`] constraint built on top of it drives the
//! action parameter validation.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The type tag of a serialized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    Unspecified,
    Boolean,
    Integer,
    Float,
    String,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
        }
    }
}

/// Raised when a [`SerializedValue`] is read or compared as a type it does
/// not hold, or its text does not parse as the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadSerializedValueCast {
    pub expected: ValueType,
    pub found: ValueType,
}

impl fmt::Display for BadSerializedValueCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "serialized value of type {} cannot be read as {}",
            self.found.as_str(),
            self.expected.as_str()
        )
    }
}

impl std::error::Error for BadSerializedValueCast {}

/// A value kept in its serialized text form alongside its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedValue {
    #[serde(rename = "type")]
    pub ty: ValueType,
    pub value: String,
}

impl SerializedValue {
    pub fn of_bool(b: bool) -> Self {
        Self { ty: ValueType::Boolean, value: b.to_string() }
    }

    pub fn of_int(i: i64) -> Self {
        Self { ty: ValueType::Integer, value: i.to_string() }
    }

    pub fn of_float(f: f64) -> Self {
        Self { ty: ValueType::Float, value: f.to_string() }
    }

    pub fn of_str(s: impl Into<String>) -> Self {
        Self { ty: ValueType::String, value: s.into() }
    }

    /// Reinterpret some text as a value of this value's type; used to check
    /// an incoming parameter against a declared bound.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self { ty: self.ty, value: text.into() }
    }

    fn cast_error(&self, expected: ValueType) -> BadSerializedValueCast {
        BadSerializedValueCast { expected, found: self.ty }
    }

    pub fn as_bool(&self) -> Result<bool, BadSerializedValueCast> {
        if self.ty != ValueType::Boolean {
            return Err(self.cast_error(ValueType::Boolean));
        }
        match self.value.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(self.cast_error(ValueType::Boolean)),
        }
    }

    pub fn as_i64(&self) -> Result<i64, BadSerializedValueCast> {
        if self.ty != ValueType::Integer {
            return Err(self.cast_error(ValueType::Integer));
        }
        self.value.parse().map_err(|_| self.cast_error(ValueType::Integer))
    }

    pub fn as_f64(&self) -> Result<f64, BadSerializedValueCast> {
        if self.ty != ValueType::Float {
            return Err(self.cast_error(ValueType::Float));
        }
        self.value.parse().map_err(|_| self.cast_error(ValueType::Float))
    }

    pub fn as_str(&self) -> Result<&str, BadSerializedValueCast> {
        if self.ty != ValueType::String {
            return Err(self.cast_error(ValueType::String));
        }
        Ok(self.value.as_str())
    }

    /// Compare two values of equal type.
    ///
    /// INTEGER and FLOAT compare numerically, STRING and UNSPECIFIED by text,
    /// BOOLEAN with `true > false`. Values of unequal type do not compare.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, BadSerializedValueCast> {
        if self.ty != other.ty {
            return Err(BadSerializedValueCast { expected: self.ty, found: other.ty });
        }
        match self.ty {
            ValueType::Integer => Ok(self.as_i64()?.cmp(&other.as_i64()?)),
            ValueType::Float => {
                let (a, b) = (self.as_f64()?, other.as_f64()?);
                a.partial_cmp(&b).ok_or_else(|| self.cast_error(ValueType::Float))
            }
            ValueType::Boolean => Ok(self.as_bool()?.cmp(&other.as_bool()?)),
            ValueType::String | ValueType::Unspecified => Ok(self.value.cmp(&other.value)),
        }
    }
}

impl fmt::Display for SerializedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Declarative constraint for one action parameter, identified by its key.
///
/// Either `value_set` enumerates the allowed literals, or the ordinal bounds
/// constrain the value using the bound's declared type for parsing. A range
/// with neither accepts any value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterRange {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal_min: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal_max: Option<SerializedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<BTreeSet<String>>,
}

impl ParameterRange {
    /// An unconstrained parameter.
    pub fn any(key: impl Into<String>) -> Self {
        Self { key: key.into(), ..Self::default() }
    }

    /// A float parameter bounded to the full finite range.
    pub fn float(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ordinal_min: Some(SerializedValue::of_float(f64::MIN)),
            ordinal_max: Some(SerializedValue::of_float(f64::MAX)),
            value_set: None,
        }
    }

    /// A parameter restricted to an enumerated set of literals.
    pub fn one_of(key: impl Into<String>, values: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            key: key.into(),
            ordinal_min: None,
            ordinal_max: None,
            value_set: Some(values.into_iter().map(str::to_owned).collect()),
        }
    }

    pub fn with_min(mut self, min: SerializedValue) -> Self {
        self.ordinal_min = Some(min);
        self
    }

    pub fn with_max(mut self, max: SerializedValue) -> Self {
        self.ordinal_max = Some(max);
        self
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod value_tests;
