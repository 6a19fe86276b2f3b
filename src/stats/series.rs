//! Dense time series over calendar buckets
//!
//! A series first tries one grouped query, letting the store truncate every
//! date to its bucket start. When the store or backend table cannot do that,
//! the series is rebuilt with one snapshot query per bucket. Both strategies
//! walk the same bucket plan, so they return the same points.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

use super::{QueryOptions, Stats};
use crate::error::{StatsError, StatsResult};
use crate::interval::{IntervalKind, IntoInstant};
use crate::store::{AggregateSpec, AggregateValue, Predicate, RecordCollection};

/// Label under which grouped queries return the bucket start
pub const BUCKET_LABEL: &str = "d";

const DATETIME_LABEL_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// One bucket of a time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub value: AggregateValue,
}

impl From<SeriesPoint> for (NaiveDateTime, AggregateValue) {
    fn from(point: SeriesPoint) -> Self {
        (point.timestamp, point.value)
    }
}

/// Parameters of a time series query
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    interval: String,
    date_field: Option<String>,
    aggregate: Option<AggregateSpec>,
    engine: Option<String>,
}

impl SeriesRequest {
    /// Daily series from `start` up to the session's "today"
    pub fn new(start: impl IntoInstant) -> Self {
        Self {
            start: start.into_instant(),
            end: None,
            interval: IntervalKind::Day.plural().to_string(),
            date_field: None,
            aggregate: None,
            engine: None,
        }
    }

    /// Exclusive end of the series
    pub fn end(mut self, end: impl IntoInstant) -> Self {
        self.end = Some(end.into_instant());
        self
    }

    /// Bucket size by plural name: `minutes`, `hours`, `days`, `weeks`, `months`, `years`
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn kind(self, kind: IntervalKind) -> Self {
        self.interval(kind.plural())
    }

    pub fn date_field(mut self, field: impl Into<String>) -> Self {
        self.date_field = Some(field.into());
        self
    }

    pub fn aggregate(mut self, spec: AggregateSpec) -> Self {
        self.aggregate = Some(spec);
        self
    }

    /// Backend hint selecting the bucket expression dialect
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    fn options(&self) -> QueryOptions<'_> {
        QueryOptions {
            date_field: self.date_field.as_deref(),
            aggregate: self.aggregate.as_ref(),
        }
    }
}

/// Parse a bucket label returned by a grouped query (year first).
pub fn parse_bucket_label(label: &str) -> StatsResult<NaiveDateTime> {
    let label = label.trim();

    DATETIME_LABEL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(label, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(label, DATE_LABEL_FORMAT)
                .ok()
                .map(IntoInstant::into_instant)
        })
        .ok_or_else(|| StatsError::InvalidBucketLabel(label.to_string()))
}

impl<C: RecordCollection> Stats<C> {
    /// Aggregate every bucket from `start` up to, but excluding, `end`.
    ///
    /// Buckets without records are reported as zero. The grouped query is
    /// tried first; errors the fallback policy accepts rerun the series one
    /// bucket per query, anything else is returned as is.
    pub fn time_series(&self, request: &SeriesRequest) -> StatsResult<Vec<SeriesPoint>> {
        let kind = IntervalKind::from_plural(&request.interval)?;
        let end = request
            .end
            .unwrap_or_else(|| self.today().into_instant());
        let buckets = kind.buckets(request.start, end);
        let engine = request.engine.as_deref().unwrap_or(self.engine());
        let opts = request.options();

        debug!(
            "time series of {} {} from {} to {} via {}",
            buckets.len(),
            kind.plural(),
            request.start,
            end,
            engine
        );

        match self.fast_time_series(kind, &buckets, opts, engine) {
            Ok(series) => Ok(series),
            Err(err) if err.is_fallback_trigger(self.fallback) => {
                warn!("grouped time series failed, querying per bucket: {}", err);
                self.slow_time_series(kind, &buckets, opts)
            }
            Err(err) => Err(err),
        }
    }

    fn fast_time_series(
        &self,
        kind: IntervalKind,
        buckets: &[NaiveDateTime],
        opts: QueryOptions<'_>,
        engine: &str,
    ) -> StatsResult<Vec<SeriesPoint>> {
        let resolved = self.resolve(opts)?;
        let (Some(&first), Some(&last)) = (buckets.first(), buckets.last()) else {
            return Ok(Vec::new());
        };

        let expression = self.sql.expression(engine, resolved.date_field, kind)?;
        let range = Predicate::range(resolved.date_field, first, kind.bounds(last).end);

        let rows = resolved.collection.filter(&[range])?.group_by_expression(
            BUCKET_LABEL,
            &expression,
            resolved.aggregate,
        )?;

        let data = rows
            .into_iter()
            .map(|row| Ok::<_, StatsError>((parse_bucket_label(&row.label)?, row.value)))
            .collect::<StatsResult<HashMap<_, _>>>()?;

        Ok(fill_buckets(buckets, &data))
    }

    fn slow_time_series(
        &self,
        kind: IntervalKind,
        buckets: &[NaiveDateTime],
        opts: QueryOptions<'_>,
    ) -> StatsResult<Vec<SeriesPoint>> {
        buckets
            .iter()
            .map(|&bucket| {
                trace!("per-bucket query for {} {}", kind, bucket);
                Ok::<_, StatsError>(SeriesPoint {
                    timestamp: bucket,
                    value: self.for_interval(kind, bucket, opts)?,
                })
            })
            .collect()
    }
}

// Missing buckets get the zero value.
fn fill_buckets(
    buckets: &[NaiveDateTime],
    data: &HashMap<NaiveDateTime, AggregateValue>,
) -> Vec<SeriesPoint> {
    buckets
        .iter()
        .map(|bucket| SeriesPoint {
            timestamp: *bucket,
            value: data.get(bucket).copied().unwrap_or_default(),
        })
        .collect()
}
