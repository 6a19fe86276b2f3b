//! Core trait definition for the record store abstraction

use super::error::{StoreError, StoreResult};
use super::types::{AggregateSpec, AggregateValue, GroupRow, Predicate};
use crate::sql::BucketExpression;

/// A queryable collection of timestamped records
///
/// Every method is a blocking call into the underlying store. Implementations
/// are expected to be cheap to clone; `filter` returns a narrowed view rather
/// than copying records.
pub trait RecordCollection: Clone {
    /// Narrow the collection to records matching every predicate
    fn filter(&self, predicates: &[Predicate]) -> StoreResult<Self>;

    /// Compute one scalar over the collection
    fn aggregate(&self, spec: &AggregateSpec) -> StoreResult<AggregateValue>;

    /// Group by a date truncation expression and aggregate per group.
    ///
    /// Rows come back in no particular order. Stores without server-side
    /// grouping keep the default, which reports the operation as unsupported.
    fn group_by_expression(
        &self,
        label: &str,
        expression: &BucketExpression,
        spec: &AggregateSpec,
    ) -> StoreResult<Vec<GroupRow>> {
        let _ = (label, spec);
        Err(StoreError::unsupported(format!(
            "grouping by {} expressions",
            expression.backend
        )))
    }
}
