//! Date truncation expressions used by grouped time series queries
//!
//! Each backend maps every interval kind to an expression that renders the
//! start of the bucket a date field falls into, as text the stats engine can
//! parse back (`2024-03-11`, `2024-03-11 14:00`). The table is plain data and
//! can be extended with further backends or replaced through [`IntervalSql`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{StatsError, StatsResult};
use crate::interval::IntervalKind;

const FIELD_PLACEHOLDER: &str = "{field}";

/// Rendered bucket expression for one backend, field and interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketExpression {
    pub sql: String,
    pub backend: String,
    pub field: String,
    pub interval: IntervalKind,
}

/// Source of bucket expressions for the grouped time series query
pub trait IntervalSql {
    /// Expression truncating `field` to the start of its `interval` bucket.
    ///
    /// Fails with `UnsupportedEngine` for an unknown backend and with
    /// `InvalidInterval` when the backend has no expression for the interval.
    fn expression(
        &self,
        backend: &str,
        field: &str,
        interval: IntervalKind,
    ) -> StatsResult<BucketExpression>;
}

/// Template table keyed by backend name and interval kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlTable {
    backends: HashMap<String, HashMap<IntervalKind, String>>,
}

impl SqlTable {
    /// A table with no backends
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Register (or replace) a backend. Templates use `{field}` for the column.
    pub fn with_backend<I, S>(mut self, name: impl Into<String>, templates: I) -> Self
    where
        I: IntoIterator<Item = (IntervalKind, S)>,
        S: Into<String>,
    {
        let templates = templates
            .into_iter()
            .map(|(kind, template)| (kind, template.into()))
            .collect();
        self.backends.insert(name.into(), templates);
        self
    }

    pub fn supports(&self, backend: &str) -> bool {
        self.backends.contains_key(backend)
    }
}

impl Default for SqlTable {
    fn default() -> Self {
        Self::empty()
            .with_backend(
                "mysql",
                [
                    (IntervalKind::Minute, "DATE_FORMAT(`{field}`, '%Y-%m-%d %H:%i')"),
                    (IntervalKind::Hour, "DATE_FORMAT(`{field}`, '%Y-%m-%d %H:00')"),
                    (IntervalKind::Day, "DATE_FORMAT(`{field}`, '%Y-%m-%d')"),
                    (
                        IntervalKind::Week,
                        "DATE_FORMAT(DATE_SUB(`{field}`, INTERVAL(WEEKDAY(`{field}`)) DAY), '%Y-%m-%d')",
                    ),
                    (IntervalKind::Month, "DATE_FORMAT(`{field}`, '%Y-%m-01')"),
                    (IntervalKind::Year, "DATE_FORMAT(`{field}`, '%Y-01-01')"),
                ],
            )
            .with_backend(
                "postgres",
                [
                    (IntervalKind::Minute, "to_char({field}, 'YYYY-MM-DD HH24:MI')"),
                    (IntervalKind::Hour, "to_char({field}, 'YYYY-MM-DD HH24:00')"),
                    (IntervalKind::Day, "to_char({field}, 'YYYY-MM-DD')"),
                    (
                        IntervalKind::Week,
                        "to_char(date_trunc('week', {field}), 'YYYY-MM-DD')",
                    ),
                    (IntervalKind::Month, "to_char({field}, 'YYYY-MM-01')"),
                    (IntervalKind::Year, "to_char({field}, 'YYYY-01-01')"),
                ],
            )
    }
}

impl IntervalSql for SqlTable {
    fn expression(
        &self,
        backend: &str,
        field: &str,
        interval: IntervalKind,
    ) -> StatsResult<BucketExpression> {
        let templates = self
            .backends
            .get(backend)
            .ok_or_else(|| StatsError::unsupported_engine(backend))?;

        let template = templates.get(&interval).ok_or_else(|| {
            StatsError::invalid_interval(format!("{} for {backend} DB backend", interval.plural()))
        })?;

        Ok(BucketExpression {
            sql: template.replace(FIELD_PLACEHOLDER, field),
            backend: backend.to_string(),
            field: field.to_string(),
            interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_week_expression() {
        let expr = SqlTable::default()
            .expression("mysql", "created", IntervalKind::Week)
            .unwrap();
        assert_eq!(
            expr.sql,
            "DATE_FORMAT(DATE_SUB(`created`, INTERVAL(WEEKDAY(`created`)) DAY), '%Y-%m-%d')"
        );
        assert_eq!(expr.interval, IntervalKind::Week);
        assert_eq!(expr.backend, "mysql");
    }

    #[test]
    fn test_postgres_day_expression() {
        let expr = SqlTable::default()
            .expression("postgres", "created_at", IntervalKind::Day)
            .unwrap();
        assert_eq!(expr.sql, "to_char(created_at, 'YYYY-MM-DD')");
    }

    #[test]
    fn test_every_interval_has_a_default_expression() {
        let table = SqlTable::default();
        for backend in ["mysql", "postgres"] {
            for kind in IntervalKind::ALL {
                assert!(table.expression(backend, "d", kind).is_ok(), "{backend} {kind}");
            }
        }
    }

    #[test]
    fn test_unknown_backend_is_unsupported_engine() {
        let err = SqlTable::default()
            .expression("oracle", "created", IntervalKind::Day)
            .unwrap_err();
        assert!(matches!(err, StatsError::UnsupportedEngine(engine) if engine == "oracle"));
    }

    #[test]
    fn test_missing_interval_is_invalid_interval() {
        let table = SqlTable::empty().with_backend(
            "sqlite",
            [(IntervalKind::Day, "strftime('%Y-%m-%d', {field})")],
        );
        assert!(table.supports("sqlite"));
        assert_eq!(
            table
                .expression("sqlite", "ts", IntervalKind::Day)
                .unwrap()
                .sql,
            "strftime('%Y-%m-%d', ts)"
        );
        assert!(matches!(
            table.expression("sqlite", "ts", IntervalKind::Week),
            Err(StatsError::InvalidInterval(_))
        ));
    }
}
