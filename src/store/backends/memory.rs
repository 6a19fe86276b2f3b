//! In-memory record collection
//!
//! Holds records in process and evaluates filters, aggregates and bucket
//! grouping itself. Grouped rows are labelled the way a MySQL server renders
//! its `DATE_FORMAT` expressions, so results flow through the same label
//! parsing as a real backend's would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::interval::IntervalKind;
use crate::sql::BucketExpression;
use crate::store::{
    error::{StoreError, StoreResult},
    traits::RecordCollection,
    types::{AggregateSpec, AggregateValue, FieldValue, GroupRow, Predicate, Record},
};

/// Field name that makes `Count` include every record
pub const COUNT_ALL: &str = "*";

/// In-memory record collection
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    records: Arc<Vec<Record>>,
    queries: Arc<AtomicUsize>,
    grouping: bool,
    failure: Option<String>,
}

impl MemoryCollection {
    /// Create a collection over the given records
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: Arc::new(records.into_iter().collect()),
            queries: Arc::new(AtomicUsize::new(0)),
            grouping: true,
            failure: None,
        }
    }

    /// Reject `group_by_expression` as unsupported
    pub fn without_grouping(mut self) -> Self {
        self.grouping = false;
        self
    }

    /// Fail every query with a connection error carrying `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of aggregate and grouping queries issued, shared by every
    /// collection filtered from this one
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn begin_query(&self) -> StoreResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(StoreError::connection(message)),
            None => Ok(()),
        }
    }
}

impl RecordCollection for MemoryCollection {
    fn filter(&self, predicates: &[Predicate]) -> StoreResult<Self> {
        let records = self
            .records
            .iter()
            .filter(|record| predicates.iter().all(|p| matches_predicate(record, p)))
            .cloned()
            .collect();

        Ok(Self {
            records: Arc::new(records),
            queries: Arc::clone(&self.queries),
            grouping: self.grouping,
            failure: self.failure.clone(),
        })
    }

    fn aggregate(&self, spec: &AggregateSpec) -> StoreResult<AggregateValue> {
        self.begin_query()?;
        trace!("memory aggregate {} over {} records", spec, self.records.len());
        evaluate(spec, self.records.iter())
    }

    fn group_by_expression(
        &self,
        label: &str,
        expression: &BucketExpression,
        spec: &AggregateSpec,
    ) -> StoreResult<Vec<GroupRow>> {
        if !self.grouping {
            return Err(StoreError::unsupported("grouping by expression"));
        }
        self.begin_query()?;
        trace!("memory group by {} as {}", expression.sql, label);

        let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
        for record in self.records.iter() {
            let Some(value) = record.get(&expression.field).and_then(FieldValue::as_datetime)
            else {
                continue;
            };
            let start = expression.interval.bounds(value).start;
            groups
                .entry(bucket_label(start, expression.interval))
                .or_default()
                .push(record);
        }

        groups
            .into_iter()
            .map(|(label, records)| {
                Ok::<_, StoreError>(GroupRow {
                    label,
                    value: evaluate(spec, records.into_iter())?,
                })
            })
            .collect()
    }
}

fn matches_predicate(record: &Record, predicate: &Predicate) -> bool {
    record
        .get(&predicate.field)
        .and_then(FieldValue::as_datetime)
        .is_some_and(|value| predicate.lookup.matches(value))
}

fn bucket_label(start: chrono::NaiveDateTime, interval: IntervalKind) -> String {
    let format = match interval {
        IntervalKind::Minute => "%Y-%m-%d %H:%M",
        IntervalKind::Hour => "%Y-%m-%d %H:00",
        IntervalKind::Day | IntervalKind::Week | IntervalKind::Month | IntervalKind::Year => {
            "%Y-%m-%d"
        }
    };
    start.format(format).to_string()
}

fn evaluate<'a>(
    spec: &AggregateSpec,
    records: impl Iterator<Item = &'a Record>,
) -> StoreResult<AggregateValue> {
    let field = spec.field();

    if let AggregateSpec::Count(_) = spec {
        let count = records
            .filter(|record| field == COUNT_ALL || record.get(field).is_some())
            .count();
        return Ok(AggregateValue::Int(count as i64));
    }

    let values = records
        .filter_map(|record| record.get(field))
        .map(|value| match value {
            FieldValue::Int(v) => Ok(AggregateValue::Int(*v)),
            FieldValue::Float(v) => Ok(AggregateValue::Float(*v)),
            other => Err(StoreError::type_mismatch(format!(
                "{} cannot aggregate {other:?}",
                spec.function()
            ))),
        })
        .collect::<StoreResult<Vec<_>>>()?;

    let Some(first) = values.first().copied() else {
        return Ok(AggregateValue::Null);
    };
    let all_ints = values.iter().all(|v| matches!(v, AggregateValue::Int(_)));
    let total: f64 = values.iter().filter_map(AggregateValue::as_f64).sum();

    let result = match spec {
        AggregateSpec::Count(_) => AggregateValue::Int(values.len() as i64),
        AggregateSpec::Sum(_) if all_ints => values
            .iter()
            .filter_map(AggregateValue::as_i64)
            .try_fold(0i64, i64::checked_add)
            .map(AggregateValue::Int)
            .ok_or_else(|| StoreError::database(format!("{spec} is out of range for BIGINT")))?,
        AggregateSpec::Sum(_) => AggregateValue::Float(total),
        AggregateSpec::Avg(_) => AggregateValue::Float(total / values.len() as f64),
        AggregateSpec::Min(_) => values
            .into_iter()
            .fold(first, |best, v| if v.as_f64() < best.as_f64() { v } else { best }),
        AggregateSpec::Max(_) => values
            .into_iter()
            .fold(first, |best, v| if v.as_f64() > best.as_f64() { v } else { best }),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{IntervalSql, SqlTable};
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn order(id: i64, created: &str, amount: i64) -> Record {
        Record::new()
            .with("id", id)
            .with("created", dt(created))
            .with("amount", amount)
    }

    fn orders() -> MemoryCollection {
        MemoryCollection::new([
            order(1, "2024-01-01 09:00:00", 10),
            order(2, "2024-01-01 17:30:00", 5),
            order(3, "2024-01-03 12:00:00", 7),
            Record::new().with("id", 4i64),
        ])
    }

    #[test]
    fn test_filter_by_range() {
        let filtered = orders()
            .filter(&[Predicate::range(
                "created",
                dt("2024-01-01 00:00:00"),
                dt("2024-01-01 23:59:59"),
            )])
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(
            filtered.aggregate(&AggregateSpec::count("id")).unwrap(),
            AggregateValue::Int(2)
        );
    }

    #[test]
    fn test_count_skips_missing_fields() {
        let collection = orders();
        assert_eq!(
            collection.aggregate(&AggregateSpec::count("created")).unwrap(),
            AggregateValue::Int(3)
        );
        assert_eq!(
            collection.aggregate(&AggregateSpec::count(COUNT_ALL)).unwrap(),
            AggregateValue::Int(4)
        );
    }

    #[test]
    fn test_numeric_aggregates() {
        let collection = orders();
        assert_eq!(
            collection.aggregate(&AggregateSpec::sum("amount")).unwrap(),
            AggregateValue::Int(22)
        );
        assert_eq!(
            collection.aggregate(&AggregateSpec::min("amount")).unwrap(),
            AggregateValue::Int(5)
        );
        assert_eq!(
            collection.aggregate(&AggregateSpec::max("amount")).unwrap(),
            AggregateValue::Int(10)
        );
        let avg = collection.aggregate(&AggregateSpec::avg("amount")).unwrap();
        assert!((avg.as_f64().unwrap() - 22.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_integer_sum_overflow_is_an_error() {
        let collection = MemoryCollection::new([
            Record::new().with("amount", i64::MAX),
            Record::new().with("amount", 1i64),
        ]);
        let err = collection
            .aggregate(&AggregateSpec::sum("amount"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("SUM(amount)")));

        let negative = MemoryCollection::new([
            Record::new().with("amount", i64::MAX),
            Record::new().with("amount", -1i64),
        ]);
        assert_eq!(
            negative.aggregate(&AggregateSpec::sum("amount")).unwrap(),
            AggregateValue::Int(i64::MAX - 1)
        );
    }

    #[test]
    fn test_sum_over_nothing_is_null() {
        let empty = MemoryCollection::new([]);
        assert_eq!(
            empty.aggregate(&AggregateSpec::sum("amount")).unwrap(),
            AggregateValue::Null
        );
        assert_eq!(
            empty.aggregate(&AggregateSpec::count("id")).unwrap(),
            AggregateValue::Int(0)
        );
    }

    #[test]
    fn test_sum_of_dates_is_type_mismatch() {
        let err = orders()
            .aggregate(&AggregateSpec::sum("created"))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch(_)));
    }

    #[test]
    fn test_group_by_day_labels() {
        let expr = SqlTable::default()
            .expression("mysql", "created", IntervalKind::Day)
            .unwrap();
        let rows = orders()
            .group_by_expression("d", &expr, &AggregateSpec::count("id"))
            .unwrap();
        assert_eq!(
            rows,
            vec![
                GroupRow {
                    label: "2024-01-01".to_string(),
                    value: AggregateValue::Int(2),
                },
                GroupRow {
                    label: "2024-01-03".to_string(),
                    value: AggregateValue::Int(1),
                },
            ]
        );
    }

    #[test]
    fn test_group_by_hour_labels() {
        let expr = SqlTable::default()
            .expression("postgres", "created", IntervalKind::Hour)
            .unwrap();
        let rows = orders()
            .group_by_expression("d", &expr, &AggregateSpec::sum("amount"))
            .unwrap();
        let labels: Vec<_> = rows.iter().map(|row| row.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2024-01-01 09:00", "2024-01-01 17:00", "2024-01-03 12:00"]
        );
    }

    #[test]
    fn test_grouping_can_be_disabled() {
        let expr = SqlTable::default()
            .expression("mysql", "created", IntervalKind::Day)
            .unwrap();
        let err = orders()
            .without_grouping()
            .group_by_expression("d", &expr, &AggregateSpec::count("id"))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_query_count_is_shared_with_filtered_views() {
        let collection = orders();
        let filtered = collection.filter(&[]).unwrap();
        filtered.aggregate(&AggregateSpec::count("id")).unwrap();
        filtered.aggregate(&AggregateSpec::count("id")).unwrap();
        assert_eq!(collection.query_count(), 2);
    }

    #[test]
    fn test_failing_collection() {
        let err = orders()
            .failing("connection refused")
            .aggregate(&AggregateSpec::count("id"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(msg) if msg == "connection refused"));
    }
}
