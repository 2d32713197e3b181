//! Named configuration profiles.

use converge_engine::config::Config;
use converge_engine::{EngineError, EngineResult};
use strum::{Display, EnumString};

use crate::resources::Egress;

/// Deployment profile selecting the egress and unauthenticated-access
/// defaults.
///
/// The two deployment variants this replaces differed in exactly these
/// two defaults, with no migration path between them; they are kept as
/// distinct named profiles rather than collapsed into one guessed
/// default. Individual config keys (`vpc_egress`,
/// `allow_unauthenticated`) still override the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceProfile {
    /// Publicly reachable service: only private ranges egress through
    /// the VPC, unauthenticated invocation allowed by default.
    #[default]
    Public,
    /// Internal service: all egress routed through the VPC,
    /// authenticated invocation only by default.
    Internal,
}

impl ServiceProfile {
    /// Resolves the profile from the `profile` config key.
    pub fn from_config(config: &Config) -> EngineResult<Self> {
        match config.get("profile") {
            None => Ok(Self::default()),
            Some(raw) => raw.parse().map_err(|_| EngineError::InvalidConfig {
                key: "profile".into(),
                message: format!("unknown profile '{raw}'"),
            }),
        }
    }

    /// Default VPC egress policy for this profile.
    pub fn default_egress(self) -> Egress {
        match self {
            Self::Public => Egress::PrivateRangesOnly,
            Self::Internal => Egress::AllTraffic,
        }
    }

    /// Default for unauthenticated invocation.
    pub fn default_allow_unauthenticated(self) -> bool {
        match self {
            Self::Public => true,
            Self::Internal => false,
        }
    }
}
