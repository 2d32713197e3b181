//! Conditional inclusion gates.
//!
//! A gate decides whether a declaration participates in the graph at
//! all. Gates are evaluated exactly once, against configuration values
//! only (never against provider state), so a node either fully exists
//! with all outputs resolvable or fully does not.

use crate::config::Config;
use crate::error::EngineResult;

/// Inclusion predicate for a resource declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gate {
    /// The node is always part of the graph.
    #[default]
    Always,
    /// The node exists only while the config key holds a non-empty value.
    ConfigSet(String),
    /// The node exists only while the config key resolves to `true`,
    /// falling back to `default` when the key is unset.
    ConfigTrue {
        /// Config key to evaluate.
        key: String,
        /// Value assumed when the key is unset.
        default: bool,
    },
}

impl Gate {
    /// Evaluates the gate against the given configuration.
    pub fn evaluate(&self, config: &Config) -> EngineResult<bool> {
        match self {
            Gate::Always => Ok(true),
            Gate::ConfigSet(key) => Ok(config.is_set(key)),
            Gate::ConfigTrue { key, default } => config.get_bool_or(key, *default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_gate() {
        assert!(Gate::Always.evaluate(&Config::new()).unwrap());
    }

    #[test]
    fn test_config_set_gate() {
        let gate = Gate::ConfigSet("vpc_connector_name".into());
        assert!(!gate.evaluate(&Config::new()).unwrap());
        assert!(
            !gate
                .evaluate(&Config::new().with_value("vpc_connector_name", ""))
                .unwrap()
        );
        assert!(
            gate.evaluate(&Config::new().with_value("vpc_connector_name", "vpc-a"))
                .unwrap()
        );
    }

    #[test]
    fn test_config_true_gate_uses_default_when_unset() {
        let gate = Gate::ConfigTrue {
            key: "allow_unauthenticated".into(),
            default: true,
        };
        assert!(gate.evaluate(&Config::new()).unwrap());
        assert!(
            !gate
                .evaluate(&Config::new().with_value("allow_unauthenticated", "false"))
                .unwrap()
        );
    }

    #[test]
    fn test_config_true_gate_rejects_garbage() {
        let gate = Gate::ConfigTrue {
            key: "allow_unauthenticated".into(),
            default: true,
        };
        assert!(
            gate.evaluate(&Config::new().with_value("allow_unauthenticated", "maybe"))
                .is_err()
        );
    }
}
