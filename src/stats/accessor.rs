//! Name-based snapshot dispatch (`for_day`, `this_month`, ...)

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use super::{QueryOptions, Stats};
use crate::error::{StatsError, StatsResult};
use crate::interval::{IntervalKind, IntoInstant};
use crate::store::{AggregateValue, RecordCollection};

const FOR_PREFIX: &str = "for_";
const THIS_PREFIX: &str = "this_";

/// A snapshot accessor resolved from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// `for_<kind>`: the bucket containing a given instant
    For(IntervalKind),
    /// `this_<kind>`: the bucket containing the session's "today"
    This(IntervalKind),
}

impl Accessor {
    /// Resolve `for_<kind>` / `this_<kind>`.
    ///
    /// A known prefix with an unknown kind fails with `InvalidInterval`; any
    /// other name fails with `UnknownAccessor`.
    pub fn parse(name: &str) -> StatsResult<Self> {
        if let Some(kind) = name.strip_prefix(FOR_PREFIX) {
            return Ok(Self::For(kind.parse()?));
        }
        if let Some(kind) = name.strip_prefix(THIS_PREFIX) {
            return Ok(Self::This(kind.parse()?));
        }
        Err(StatsError::UnknownAccessor(name.to_string()))
    }

    pub fn kind(self) -> IntervalKind {
        match self {
            Self::For(kind) | Self::This(kind) => kind,
        }
    }
}

impl FromStr for Accessor {
    type Err = StatsError;

    fn from_str(s: &str) -> StatsResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::For(kind) => write!(f, "{FOR_PREFIX}{kind}"),
            Self::This(kind) => write!(f, "{THIS_PREFIX}{kind}"),
        }
    }
}

impl<C: RecordCollection> Stats<C> {
    /// Run a snapshot accessor by name.
    ///
    /// `this_<kind>` ignores `instant`. `for_<kind>` without an instant uses the
    /// cached "today", the same bucket `this_<kind>` would pick.
    pub fn call(
        &self,
        name: &str,
        instant: Option<NaiveDateTime>,
        opts: QueryOptions<'_>,
    ) -> StatsResult<AggregateValue> {
        let accessor = Accessor::parse(name)?;
        let today = self.today().into_instant();
        let instant = match accessor {
            Accessor::For(_) => instant.unwrap_or(today),
            Accessor::This(_) => today,
        };
        self.for_interval(accessor.kind(), instant, opts)
    }
}
