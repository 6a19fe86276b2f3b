//! Type definitions for the record store abstraction

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{StatsError, StatsResult};
use crate::interval::IntoInstant;

/// What scalar to compute over a filtered collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "function", content = "field", rename_all = "lowercase")]
pub enum AggregateSpec {
    Count(String),
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

impl AggregateSpec {
    pub fn count(field: impl Into<String>) -> Self {
        Self::Count(field.into())
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Self::Sum(field.into())
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Self::Avg(field.into())
    }

    pub fn min(field: impl Into<String>) -> Self {
        Self::Min(field.into())
    }

    pub fn max(field: impl Into<String>) -> Self {
        Self::Max(field.into())
    }

    /// Field the aggregate reads
    pub fn field(&self) -> &str {
        match self {
            Self::Count(field)
            | Self::Sum(field)
            | Self::Avg(field)
            | Self::Min(field)
            | Self::Max(field) => field,
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            Self::Count(_) => "COUNT",
            Self::Sum(_) => "SUM",
            Self::Avg(_) => "AVG",
            Self::Min(_) => "MIN",
            Self::Max(_) => "MAX",
        }
    }
}

impl Default for AggregateSpec {
    fn default() -> Self {
        Self::count("id")
    }
}

impl fmt::Display for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function(), self.field())
    }
}

/// Scalar produced by an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Int(i64),
    Float(f64),
    Null,
}

impl AggregateValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Empty buckets count as zero
impl Default for AggregateValue {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl From<i64> for AggregateValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AggregateValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<AggregateValue>> From<Option<T>> for AggregateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Comparison applied to a date field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Inclusive on both ends
    Range(NaiveDateTime, NaiveDateTime),
    Lt(NaiveDateTime),
    Lte(NaiveDateTime),
    Gt(NaiveDateTime),
    Gte(NaiveDateTime),
}

impl Lookup {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Range(..) => "range",
            Self::Lt(_) => "lt",
            Self::Lte(_) => "lte",
            Self::Gt(_) => "gt",
            Self::Gte(_) => "gte",
        }
    }

    pub fn matches(&self, value: NaiveDateTime) -> bool {
        match *self {
            Self::Range(start, end) => start <= value && value <= end,
            Self::Lt(pivot) => value < pivot,
            Self::Lte(pivot) => value <= pivot,
            Self::Gt(pivot) => value > pivot,
            Self::Gte(pivot) => value >= pivot,
        }
    }
}

/// One filter condition, rendered as `"<field>__<op>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub lookup: Lookup,
}

impl Predicate {
    pub fn new(field: impl Into<String>, lookup: Lookup) -> Self {
        Self {
            field: field.into(),
            lookup,
        }
    }

    pub fn range(field: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self::new(field, Lookup::Range(start, end))
    }

    pub fn key(&self) -> String {
        format!("{}__{}", self.field, self.lookup.op())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lookup {
            Lookup::Range(start, end) => write!(f, "{}=({start}, {end})", self.key()),
            Lookup::Lt(v) | Lookup::Lte(v) | Lookup::Gt(v) | Lookup::Gte(v) => {
                write!(f, "{}={v}", self.key())
            }
        }
    }
}

/// Pivot comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn lookup(self, pivot: impl IntoInstant) -> Lookup {
        let pivot = pivot.into_instant();
        match self {
            Self::Lt => Lookup::Lt(pivot),
            Self::Lte => Lookup::Lte(pivot),
            Self::Gt => Lookup::Gt(pivot),
            Self::Gte => Lookup::Gte(pivot),
        }
    }
}

impl FromStr for Comparison {
    type Err = StatsError;

    fn from_str(s: &str) -> StatsResult<Self> {
        match s {
            "lt" | "<" => Ok(Self::Lt),
            "lte" | "<=" => Ok(Self::Lte),
            "gt" | ">" => Ok(Self::Gt),
            "gte" | ">=" => Ok(Self::Gte),
            other => Err(StatsError::invalid_operator(other)),
        }
    }
}

/// One row of a grouped aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub label: String,
    pub value: AggregateValue,
}

/// Value held by a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

impl FieldValue {
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::DateTime(value.into_instant())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single stored record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}
