//! Two-tier configuration input and secret values.
//!
//! Configuration is a flat key/value mapping partitioned into plain and
//! secret tiers. Values are resolved once, at graph-build time, through
//! the `get_*` accessors; the graph never re-reads configuration after
//! construction, so plan and apply always see the same values.

use std::collections::BTreeMap;

use derive_more::From;
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};

/// A secret configuration value.
///
/// The wrapped string is only reachable through [`SecretString::expose`];
/// `Debug` and `Display` render a redaction marker, and the value never
/// derives `Serialize`. State records and plans store the SHA-256
/// fingerprint instead of the plaintext.
#[derive(Clone, PartialEq, Eq, From)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a plaintext secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plaintext. Callers must not log or persist it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the hex-encoded SHA-256 digest of the plaintext.
    ///
    /// Fingerprints are stable across runs, which is what makes secret
    /// properties diffable without persisting them.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        format!("sha256:{}", hex::encode(digest))
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Flat configuration input with plain and secret tiers.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, String>,
    secrets: BTreeMap<String, SecretString>,
}

impl Config {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Adds a secret value.
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<SecretString>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    /// Returns a plain value, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns a plain value, falling back to a default.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }

    /// Returns a required plain value.
    pub fn require(&self, key: &str) -> EngineResult<String> {
        self.get(key)
            .map(str::to_owned)
            .ok_or_else(|| EngineError::InvalidConfig {
                key: key.to_owned(),
                message: "required value is missing".into(),
            })
    }

    /// Returns an integer value, falling back to a default.
    pub fn get_int_or(&self, key: &str, default: i64) -> EngineResult<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| EngineError::InvalidConfig {
                key: key.to_owned(),
                message: format!("expected an integer, got '{raw}'"),
            }),
        }
    }

    /// Returns a boolean value, falling back to a default.
    ///
    /// Accepts `true`/`false` in any casing.
    pub fn get_bool_or(&self, key: &str, default: bool) -> EngineResult<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(EngineError::InvalidConfig {
                    key: key.to_owned(),
                    message: format!("expected a boolean, got '{raw}'"),
                }),
            },
        }
    }

    /// Returns whether a plain key holds a non-empty value.
    ///
    /// An empty string counts as unset, matching the usual behavior of
    /// optional infrastructure toggles supplied via environment.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_empty())
    }

    /// Returns a secret value, if set.
    pub fn get_secret(&self, key: &str) -> Option<&SecretString> {
        self.secrets.get(key)
    }

    /// Returns a required secret value.
    pub fn require_secret(&self, key: &str) -> EngineResult<SecretString> {
        self.get_secret(key)
            .cloned()
            .ok_or_else(|| EngineError::InvalidConfig {
                key: key.to_owned(),
                message: "required secret is missing".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_prefers_set_value() {
        let config = Config::new().with_value("region", "europe-west1");
        assert_eq!(config.get_or("region", "us-central1"), "europe-west1");
        assert_eq!(config.get_or("zone", "us-central1-a"), "us-central1-a");
    }

    #[test]
    fn test_require_missing_key() {
        let config = Config::new();
        assert!(matches!(
            config.require("project"),
            Err(EngineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_get_int_or_rejects_garbage() {
        let config = Config::new().with_value("max_instances", "three");
        assert!(config.get_int_or("max_instances", 3).is_err());
        assert_eq!(Config::new().get_int_or("max_instances", 3).unwrap(), 3);
    }

    #[test]
    fn test_get_bool_or_is_case_insensitive() {
        let config = Config::new().with_value("allow", "TRUE");
        assert!(config.get_bool_or("allow", false).unwrap());
    }

    #[test]
    fn test_is_set_treats_empty_as_unset() {
        let config = Config::new().with_value("connector", "");
        assert!(!config.is_set("connector"));
        assert!(Config::new().with_value("connector", "vpc-a").is_set("connector"));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{secret:?}"), "[redacted]");
        assert_eq!(format!("{secret}"), "[redacted]");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_secret_fingerprint_is_stable_and_opaque() {
        let a = SecretString::new("hunter2");
        let b = SecretString::new("hunter2");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("sha256:"));
        assert!(!a.fingerprint().contains("hunter2"));
    }
}
