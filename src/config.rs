//! Session defaults loadable from TOML

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{StatsError, StatsResult};
use crate::store::AggregateSpec;

/// Environment variable overriding the default date field
pub const DATE_FIELD_VAR: &str = "QSTATS_DATE_FIELD";
/// Environment variable overriding the backend hint
pub const ENGINE_VAR: &str = "QSTATS_ENGINE";

/// Which grouped-query failures fall back to per-bucket queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Any record store error
    #[default]
    AnyStoreError,
    /// Only stores reporting grouping as unsupported
    SupportErrorsOnly,
}

/// Defaults applied by a stats session when a call does not override them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Date field used for bucketing and pivots
    #[serde(default)]
    pub date_field: Option<String>,

    /// Aggregate computed per bucket
    #[serde(default)]
    pub aggregate: AggregateSpec,

    /// Backend hint for grouped time series queries
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default)]
    pub fallback: FallbackPolicy,
}

fn default_engine() -> String {
    "mysql".to_string()
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            date_field: None,
            aggregate: AggregateSpec::default(),
            engine: default_engine(),
            fallback: FallbackPolicy::default(),
        }
    }
}

impl StatsConfig {
    pub fn from_toml_str(content: &str) -> StatsResult<Self> {
        let config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> StatsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StatsError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Read `path`, then apply `QSTATS_*` overrides from the environment
    pub fn load(path: impl AsRef<Path>) -> StatsResult<Self> {
        let mut config = Self::from_file(path)?;
        config.merge_env_vars();
        Ok(config)
    }

    /// Apply `QSTATS_*` overrides from the process environment
    pub fn merge_env_vars(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn merge_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(date_field) = lookup(DATE_FIELD_VAR) {
            self.date_field = Some(date_field);
        }

        if let Some(engine) = lookup(ENGINE_VAR) {
            self.engine = engine;
        }
    }
}
