//! Record store abstraction
//!
//! The stats engine never talks to a database directly. It filters and
//! aggregates through [`RecordCollection`], which a caller implements on top of
//! whatever data-access layer they use. [`backends::MemoryCollection`] keeps
//! records in process.

pub mod backends;
pub mod error;
pub mod traits;
pub mod types;

pub use backends::MemoryCollection;
pub use error::{StoreError, StoreResult};
pub use traits::RecordCollection;
pub use types::{
    AggregateSpec, AggregateValue, Comparison, FieldValue, GroupRow, Lookup, Predicate, Record,
};
