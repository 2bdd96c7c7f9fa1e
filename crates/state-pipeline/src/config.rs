use std::time::Duration;

use serde::{Deserialize, Serialize};
use state_codec::CodecConfig;

use crate::allocator::{IdStrategy, MIN_ALPHANUMERIC_LEN};
use crate::error::ConfigError;
use state_types::MAX_STATE_ID_LEN;

/// Configuration for the state persistence pipeline.
///
/// Passed explicitly to [`StatePipeline::new`](crate::StatePipeline::new);
/// nothing in the pipeline reads the environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bucket holding top-level state documents.
    pub state_bucket: String,
    /// Bucket holding layers routed by directives.
    pub layer_bucket: String,
    /// Key prefix for state documents (`<prefix>/<id>`).
    pub state_prefix: String,
    /// Optional key prefix for layers. Layers are keyed by bare name when unset.
    pub layer_prefix: Option<String>,
    pub id_strategy: IdStrategy,
    /// Collisions tolerated before allocation gives up.
    pub max_allocation_attempts: u32,
    /// Deadline for `get`/`exists`, in milliseconds.
    pub read_timeout_ms: u64,
    /// Deadline for `put`/`create`/`delete`, in milliseconds.
    pub write_timeout_ms: u64,
    /// Upper bound on concurrent layer actions within one save.
    pub layer_concurrency: usize,
    pub codec: CodecConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            state_bucket: String::new(),
            layer_bucket: String::new(),
            state_prefix: "states".into(),
            layer_prefix: None,
            id_strategy: IdStrategy::default(),
            max_allocation_attempts: 16,
            read_timeout_ms: 5_000,
            write_timeout_ms: 30_000,
            layer_concurrency: 8,
            codec: CodecConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults with the two required bucket names filled in.
    pub fn new(state_bucket: impl Into<String>, layer_bucket: impl Into<String>) -> Self {
        Self {
            state_bucket: state_bucket.into(),
            layer_bucket: layer_bucket.into(),
            ..Default::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_bucket.trim().is_empty() {
            return Err(ConfigError::Missing("state_bucket"));
        }
        if self.layer_bucket.trim().is_empty() {
            return Err(ConfigError::Missing("layer_bucket"));
        }
        if self.max_allocation_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_allocation_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.layer_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "layer_concurrency",
                reason: "must be at least 1".into(),
            });
        }
        if self.read_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeouts",
                reason: "must be non-zero".into(),
            });
        }
        if let IdStrategy::Alphanumeric { length } = self.id_strategy {
            if !(MIN_ALPHANUMERIC_LEN..=MAX_STATE_ID_LEN).contains(&length) {
                return Err(ConfigError::Invalid {
                    field: "id_strategy.length",
                    reason: format!(
                        "must be between {MIN_ALPHANUMERIC_LEN} and {MAX_STATE_ID_LEN}"
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.state_prefix, "states");
        assert_eq!(c.read_timeout(), Duration::from_secs(5));
        assert_eq!(c.write_timeout(), Duration::from_secs(30));
        assert_eq!(c.id_strategy, IdStrategy::Numeric);
        assert!(c.layer_prefix.is_none());
    }

    #[test]
    fn missing_buckets_are_rejected() {
        assert_eq!(
            PipelineConfig::default().validate(),
            Err(ConfigError::Missing("state_bucket"))
        );
        assert_eq!(
            PipelineConfig::new("s", " ").validate(),
            Err(ConfigError::Missing("layer_bucket"))
        );
        assert!(PipelineConfig::new("s", "l").validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut c = PipelineConfig::new("s", "l");
        c.max_allocation_attempts = 0;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::new("s", "l");
        c.layer_concurrency = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn short_alphanumeric_ids_are_rejected() {
        let mut c = PipelineConfig::new("s", "l");
        c.id_strategy = IdStrategy::Alphanumeric { length: 4 };
        assert!(matches!(c.validate(), Err(ConfigError::Invalid { .. })));
        c.id_strategy = IdStrategy::Alphanumeric { length: 12 };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_json() {
        let c: PipelineConfig = serde_json::from_str(
            r#"{"state_bucket":"a","layer_bucket":"b","id_strategy":{"kind":"alphanumeric","length":14}}"#,
        )
        .unwrap();
        assert_eq!(c.id_strategy, IdStrategy::Alphanumeric { length: 14 });
        assert_eq!(c.max_allocation_attempts, 16);
    }
}
