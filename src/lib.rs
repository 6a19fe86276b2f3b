//! # qstats
//!
//! Aggregate statistics over timestamped records, bucketed into calendar
//! intervals. Answers snapshot questions ("how many signups this month") and
//! produces dense time series ("signups per day for the last 30 days") ready
//! for charting.
//!
//! ## Usage
//!
//! ```ignore
//! use qstats::{MemoryCollection, QueryOptions, SeriesRequest, Stats};
//!
//! let stats = Stats::new(collection).with_date_field("created_at");
//! let this_month = stats.this_month(QueryOptions::default())?;
//! let daily = stats.time_series(&SeriesRequest::new(start).end(end).interval("days"))?;
//! ```
//!
//! ## Modules
//!
//! - `interval` - Calendar interval kinds and bucket bounds
//! - `stats` - Stats sessions: snapshots, pivots and time series
//! - `sql` - Backend date truncation expressions for grouped queries
//! - `store` - Record collection abstraction and in-memory backend
//! - `config` - Session defaults loadable from TOML
//! - `clock` - Source of "now" and "today"
//! - `error` - Error types
pub mod clock;
pub mod config;
pub mod error;
pub mod interval;
pub mod sql;
pub mod stats;
pub mod store;


pub use config::{FallbackPolicy, StatsConfig};
pub use error::{StatsError, StatsResult};
pub use interval::{bounds, bounds_named, IntervalKind, IntoInstant, TimeRange, TICK};
pub use sql::{BucketExpression, IntervalSql, SqlTable};
pub use stats::{Accessor, QueryOptions, SeriesPoint, SeriesRequest, Stats};
pub use store::{
    AggregateSpec, AggregateValue, Comparison, MemoryCollection, Predicate, Record,
    RecordCollection, StoreError,
};
