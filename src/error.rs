use thiserror::Error;

use crate::config::FallbackPolicy;
use crate::store::StoreError;

/// Result type for stats operations
pub type StatsResult<T> = Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Interval is not supported: {0}")]
    InvalidInterval(String),

    #[error("DB engine is not supported: {0}")]
    UnsupportedEngine(String),

    #[error("Invalid pivot operator: {0}")]
    InvalidOperator(String),

    #[error("Please provide a date_field")]
    DateFieldMissing,

    #[error("Please provide a record collection")]
    QuerySetMissing,

    #[error("No such accessor: {0}")]
    UnknownAccessor(String),

    #[error("Cannot parse bucket label: {0}")]
    InvalidBucketLabel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

impl StatsError {
    pub fn invalid_interval(interval: impl Into<String>) -> Self {
        Self::InvalidInterval(interval.into())
    }

    pub fn unsupported_engine(engine: impl Into<String>) -> Self {
        Self::UnsupportedEngine(engine.into())
    }

    pub fn invalid_operator(operator: impl Into<String>) -> Self {
        Self::InvalidOperator(operator.into())
    }

    pub fn config<E: std::fmt::Display>(err: E) -> Self {
        Self::Config(err.to_string())
    }

    /// Whether a failed grouped time series query may be retried bucket by bucket.
    pub fn is_fallback_trigger(&self, policy: FallbackPolicy) -> bool {
        match self {
            Self::InvalidInterval(_) | Self::UnsupportedEngine(_) | Self::InvalidBucketLabel(_) => {
                true
            }
            Self::Store(err) => match policy {
                FallbackPolicy::AnyStoreError => true,
                FallbackPolicy::SupportErrorsOnly => err.is_unsupported(),
            },
            _ => false,
        }
    }
}

impl From<toml::de::Error> for StatsError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_errors_always_fall_back() {
        for policy in [FallbackPolicy::AnyStoreError, FallbackPolicy::SupportErrorsOnly] {
            assert!(StatsError::invalid_interval("weeks").is_fallback_trigger(policy));
            assert!(StatsError::unsupported_engine("oracle").is_fallback_trigger(policy));
            assert!(StatsError::from(StoreError::unsupported("grouping")).is_fallback_trigger(policy));
            assert!(StatsError::InvalidBucketLabel("11".to_string()).is_fallback_trigger(policy));
        }
    }

    #[test]
    fn test_store_errors_follow_policy() {
        let err = StatsError::from(StoreError::connection("refused"));
        assert!(err.is_fallback_trigger(FallbackPolicy::AnyStoreError));
        assert!(!err.is_fallback_trigger(FallbackPolicy::SupportErrorsOnly));
    }

    #[test]
    fn test_missing_parameters_never_fall_back() {
        assert!(!StatsError::DateFieldMissing.is_fallback_trigger(FallbackPolicy::AnyStoreError));
        assert!(!StatsError::QuerySetMissing.is_fallback_trigger(FallbackPolicy::AnyStoreError));
        assert!(!StatsError::invalid_operator("eq").is_fallback_trigger(FallbackPolicy::AnyStoreError));
    }
}
