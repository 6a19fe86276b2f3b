//! Stats sessions over a record collection
//!
//! A [`Stats`] session holds the defaults a caller would otherwise repeat on
//! every query (collection, date field, aggregate, backend hint) plus a cached
//! "today". Snapshots aggregate one calendar bucket, pivots aggregate
//! everything before or after an instant, and time series aggregate every
//! bucket of a range.

mod accessor;
mod series;

pub use accessor::Accessor;
pub use series::{parse_bucket_label, SeriesPoint, SeriesRequest, BUCKET_LABEL};

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::{FallbackPolicy, StatsConfig};
use crate::error::{StatsError, StatsResult};
use crate::interval::{IntervalKind, IntoInstant};
use crate::sql::{IntervalSql, SqlTable};
use crate::store::{AggregateSpec, AggregateValue, Comparison, Predicate, RecordCollection};

/// Per-call overrides of the session defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions<'a> {
    pub date_field: Option<&'a str>,
    pub aggregate: Option<&'a AggregateSpec>,
}

impl<'a> QueryOptions<'a> {
    pub fn date_field(mut self, field: &'a str) -> Self {
        self.date_field = Some(field);
        self
    }

    pub fn aggregate(mut self, spec: &'a AggregateSpec) -> Self {
        self.aggregate = Some(spec);
        self
    }
}

/// Effective parameters of one query
struct Resolved<'a, C> {
    collection: &'a C,
    date_field: &'a str,
    aggregate: &'a AggregateSpec,
}

/// Statistics session over a record collection
pub struct Stats<C> {
    collection: Option<C>,
    date_field: Option<String>,
    aggregate: AggregateSpec,
    engine: String,
    fallback: FallbackPolicy,
    today: NaiveDate,
    clock: Arc<dyn Clock>,
    sql: Arc<dyn IntervalSql>,
}

impl<C: RecordCollection> Stats<C> {
    /// Create a session over `collection` with default settings
    pub fn new(collection: C) -> Self {
        Self::build(Some(collection), &StatsConfig::default())
    }

    /// Create a session from loaded configuration
    pub fn from_config(collection: C, config: &StatsConfig) -> Self {
        Self::build(Some(collection), config)
    }

    /// Create a session with no collection; every query fails with `QuerySetMissing`
    pub fn without_collection() -> Self {
        Self::build(None, &StatsConfig::default())
    }

    fn build(collection: Option<C>, config: &StatsConfig) -> Self {
        let clock = SystemClock;
        Self {
            collection,
            date_field: config.date_field.clone(),
            aggregate: config.aggregate.clone(),
            engine: config.engine.clone(),
            fallback: config.fallback,
            today: clock.today(),
            clock: Arc::new(clock),
            sql: Arc::new(SqlTable::default()),
        }
    }

    pub fn with_date_field(mut self, field: impl Into<String>) -> Self {
        self.date_field = Some(field.into());
        self
    }

    pub fn with_aggregate(mut self, spec: AggregateSpec) -> Self {
        self.aggregate = spec;
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }

    /// Pin the cached "today"
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Use another clock; the cached "today" is refreshed from it
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.today = clock.today();
        self.clock = Arc::new(clock);
        self
    }

    /// Use another table of bucket expressions for grouped time series
    pub fn with_sql(mut self, sql: impl IntervalSql + 'static) -> Self {
        self.sql = Arc::new(sql);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn date_field(&self) -> Option<&str> {
        self.date_field.as_deref()
    }

    pub fn aggregate(&self) -> &AggregateSpec {
        &self.aggregate
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn collection(&self) -> Option<&C> {
        self.collection.as_ref()
    }

    /// Re-read "today" from the session clock
    pub fn update_today(&mut self) -> NaiveDate {
        self.today = self.clock.today();
        self.today
    }

    /// Aggregate over the `kind` bucket containing `instant`.
    pub fn for_interval(
        &self,
        kind: IntervalKind,
        instant: impl IntoInstant,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        let range = kind.bounds(instant);
        let resolved = self.resolve(opts)?;
        debug!(
            "{} for {} {} .. {} on {}",
            resolved.aggregate, kind, range.start, range.end, resolved.date_field
        );
        Self::run(
            &resolved,
            Predicate::range(resolved.date_field, range.start, range.end),
        )
    }

    /// Aggregate over the `kind` bucket containing the cached "today".
    pub fn this_interval(
        &self,
        kind: IntervalKind,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        self.for_interval(kind, self.today, opts)
    }

    /// Aggregate over records whose date field compares to `instant` by `operator`.
    pub fn pivot(
        &self,
        instant: impl IntoInstant,
        operator: Comparison,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        let resolved = self.resolve(opts)?;
        let predicate = Predicate::new(resolved.date_field, operator.lookup(instant));
        debug!("{} pivot {}", resolved.aggregate, predicate);
        Self::run(&resolved, predicate)
    }

    /// [`pivot`](Self::pivot) with the operator given by name (`lt`, `lte`, `gt`, `gte`).
    pub fn pivot_named(
        &self,
        instant: impl IntoInstant,
        operator: &str,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        self.pivot(instant, operator.parse()?, opts)
    }

    /// Aggregate over records dated at or before `instant`
    pub fn until(
        &self,
        instant: impl IntoInstant,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        self.pivot(instant, Comparison::Lte, opts)
    }

    pub fn until_now(&self, opts: QueryOptions<'_>) -> StatsResult<AggregateValue> {
        self.until(self.clock.now(), opts)
    }

    /// Aggregate over records dated at or after `instant`
    pub fn after(
        &self,
        instant: impl IntoInstant,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        self.pivot(instant, Comparison::Gte, opts)
    }

    pub fn after_now(&self, opts: QueryOptions<'_>) -> StatsResult<AggregateValue> {
        self.after(self.clock.now(), opts)
    }

    // Explicit argument wins, then the session default.
    fn resolve<'a>(&'a self, opts: QueryOptions<'a>) -> StatsResult<Resolved<'a, C>> {
        let date_field = opts
            .date_field
            .or(self.date_field.as_deref())
            .ok_or(StatsError::DateFieldMissing)?;
        let collection = self.collection.as_ref().ok_or(StatsError::QuerySetMissing)?;

        Ok(Resolved {
            collection,
            date_field,
            aggregate: opts.aggregate.unwrap_or(&self.aggregate),
        })
    }

    fn run(resolved: &Resolved<'_, C>, predicate: Predicate) -> StatsResult<AggregateValue> {
        let value = resolved
            .collection
            .filter(&[predicate])?
            .aggregate(resolved.aggregate)?;
        Ok(value)
    }
}

macro_rules! interval_accessors {
    ($($kind:ident => $for_fn:ident, $this_fn:ident;)*) => {
        impl<C: RecordCollection> Stats<C> {
            $(
                #[doc = concat!("[`for_interval`](Self::for_interval) bound to `IntervalKind::", stringify!($kind), "`")]
                pub fn $for_fn(
                    &self,
                    instant: impl IntoInstant,
                    opts: QueryOptions<'_>,
                ) -> StatsResult<AggregateValue> {
                    self.for_interval(IntervalKind::$kind, instant, opts)
                }

                #[doc = concat!("[`this_interval`](Self::this_interval) bound to `IntervalKind::", stringify!($kind), "`")]
                pub fn $this_fn(&self, opts: QueryOptions<'_>) -> StatsResult<AggregateValue> {
                    self.this_interval(IntervalKind::$kind, opts)
                }
            )*
        }
    };
}

interval_accessors! {
    Minute => for_minute, this_minute;
    Hour => for_hour, this_hour;
    Day => for_day, this_day;
    Week => for_week, this_week;
    Month => for_month, this_month;
    Year => for_year, this_year;
}
