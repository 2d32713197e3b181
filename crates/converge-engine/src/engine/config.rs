//! Apply engine configuration.

use derive_builder::Builder;

use crate::provider::RetryPolicy;

/// Configuration for the apply engine.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ApplyConfig {
    /// Maximum number of nodes applied concurrently within a ready rank.
    #[builder(default = "4")]
    pub max_concurrent_applies: usize,

    /// Retry policy for transient provider failures.
    #[builder(default)]
    pub retry: RetryPolicy,

    /// Confirm that recorded resources still exist remotely before
    /// diffing; vanished resources are recreated.
    #[builder(default = "true")]
    pub refresh: bool,

    /// Delete recorded resources whose declarations no longer exist.
    #[builder(default = "true")]
    pub prune: bool,
}

impl ApplyConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_concurrent_applies {
            if max == 0 {
                return Err("max_concurrent_applies must be at least 1".into());
            }
        }
        Ok(())
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_applies: 4,
            retry: RetryPolicy::default(),
            refresh: true,
            prune: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ApplyConfigBuilder::default().build().unwrap();
        assert_eq!(config.max_concurrent_applies, 4);
        assert!(config.refresh);
        assert!(config.prune);
    }

    #[test]
    fn test_builder_rejects_zero_concurrency() {
        let result = ApplyConfigBuilder::default()
            .max_concurrent_applies(0usize)
            .build();
        assert!(result.is_err());
    }
}
