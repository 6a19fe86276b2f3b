//! Common test utilities and helpers

use chrono::{NaiveDate, NaiveDateTime};
use qstats::sql::BucketExpression;
use qstats::store::{GroupRow, StoreResult};
use qstats::{AggregateSpec, AggregateValue, MemoryCollection, Predicate, Record, RecordCollection};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness (`RUST_LOG=qstats=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Create an order record placed at `placed`
pub fn order(id: i64, placed: &str, total: f64) -> Record {
    Record::new()
        .with("id", id)
        .with("placed_at", dt(placed))
        .with("total", total)
}

/// Collection that records every call it receives and renders grouped labels
/// as full timestamps, the way many SQL drivers return text columns
#[derive(Debug, Clone)]
pub struct RecordingCollection {
    inner: MemoryCollection,
    pub log: Arc<Mutex<Vec<String>>>,
    week_numbers: bool,
}

impl RecordingCollection {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            inner: MemoryCollection::new(records),
            log: Arc::new(Mutex::new(Vec::new())),
            week_numbers: false,
        }
    }

    /// Label grouped rows with the ISO week number (`"11"`) instead of a date,
    /// like `to_char(field, 'IW')` does
    pub fn with_week_numbers(mut self) -> Self {
        self.week_numbers = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl RecordCollection for RecordingCollection {
    fn filter(&self, predicates: &[Predicate]) -> StoreResult<Self> {
        for predicate in predicates {
            self.push(format!("filter {}", predicate.key()));
        }
        Ok(Self {
            inner: self.inner.filter(predicates)?,
            log: Arc::clone(&self.log),
            week_numbers: self.week_numbers,
        })
    }

    fn aggregate(&self, spec: &AggregateSpec) -> StoreResult<AggregateValue> {
        self.push(format!("aggregate {spec}"));
        self.inner.aggregate(spec)
    }

    fn group_by_expression(
        &self,
        label: &str,
        expression: &BucketExpression,
        spec: &AggregateSpec,
    ) -> StoreResult<Vec<GroupRow>> {
        self.push(format!("group {label} = {}", expression.sql));
        let rows = self.inner.group_by_expression(label, expression, spec)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let label = if self.week_numbers {
                    let day = NaiveDate::parse_from_str(&row.label[..10], "%Y-%m-%d").unwrap();
                    day.format("%V").to_string()
                } else if row.label.len() == 10 {
                    format!("{} 00:00:00", row.label)
                } else {
                    format!("{}:00", row.label)
                };
                GroupRow { label, ..row }
            })
            .collect())
    }
}
