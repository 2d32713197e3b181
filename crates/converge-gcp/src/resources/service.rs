//! Cloud Run v2 service.

use converge_engine::config::SecretString;
use converge_engine::graph::{ResourceDeclaration, ResourceName};
use strum::{Display, EnumString, IntoStaticStr};

use super::GcpResource;

/// VPC egress policy for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum Egress {
    /// Only traffic to private IP ranges is routed through the VPC.
    #[strum(serialize = "PRIVATE_RANGES_ONLY")]
    PrivateRangesOnly,
    /// All outbound traffic is routed through the VPC.
    #[strum(serialize = "ALL_TRAFFIC")]
    AllTraffic,
}

/// Startup probe parameters. The probe defaults to TCP against the
/// container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupProbe {
    /// Seconds to wait before the first probe.
    pub initial_delay_seconds: i64,
    /// Seconds between probes.
    pub period_seconds: i64,
    /// Failures tolerated before the instance is restarted.
    pub failure_threshold: i64,
    /// Probed port; the container port when unset.
    pub port: Option<u16>,
}

impl Default for StartupProbe {
    fn default() -> Self {
        Self {
            initial_delay_seconds: 0,
            period_seconds: 240,
            failure_threshold: 1,
            port: None,
        }
    }
}

/// A container environment variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    /// Plain value, visible in plans and state.
    Plain(String),
    /// Secret value, redacted everywhere outside the provider payload.
    Secret(SecretString),
}

/// A container environment variable.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: EnvValue,
}

impl EnvVar {
    /// Creates a plain environment variable.
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::Plain(value.into()),
        }
    }

    /// Creates a secret environment variable.
    pub fn secret(name: impl Into<String>, value: impl Into<SecretString>) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::Secret(value.into()),
        }
    }
}

/// VPC access block for the service.
///
/// The connector is an optional reference: if the connector node is
/// excluded by its gate, the property is dropped and the service runs
/// without VPC access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcAccess {
    /// Connector node whose generated id is threaded in once applied.
    pub connector: ResourceName,
    /// Egress policy; only declared when a connector is expected to
    /// exist.
    pub egress: Option<Egress>,
}

/// A Cloud Run v2 service.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudRunService {
    /// Service name.
    pub name: String,
    /// Deployment location (region).
    pub location: String,
    /// Container image reference.
    pub image: String,
    /// Port the container listens on.
    pub container_port: u16,
    /// CPU limit, e.g. `"2"`.
    pub cpu_limit: String,
    /// Memory limit, e.g. `"4Gi"`.
    pub memory_limit: String,
    /// Minimum number of instances.
    pub min_instances: i64,
    /// Maximum number of instances.
    pub max_instances: i64,
    /// Request timeout in seconds.
    pub timeout_seconds: i64,
    /// Startup probe parameters.
    pub startup_probe: Option<StartupProbe>,
    /// Container environment.
    pub env: Vec<EnvVar>,
    /// VPC access block.
    pub vpc_access: Option<VpcAccess>,
}

impl CloudRunService {
    /// Converts into a resource declaration. Environment variables
    /// become `env.<NAME>` properties (secret-typed where secret), the
    /// VPC connector becomes an optional reference, and traffic is
    /// pinned to the latest revision.
    pub fn declare(self, name: impl Into<ResourceName>) -> ResourceDeclaration {
        let container_port = self.container_port;
        let mut declaration = ResourceDeclaration::new(name, GcpResource::CloudRunService)
            .with_property("name", self.name)
            .with_property("location", self.location)
            .with_property("image", self.image)
            .with_property("container_port", i64::from(container_port))
            .with_property("cpu_limit", self.cpu_limit)
            .with_property("memory_limit", self.memory_limit)
            .with_property("min_instances", self.min_instances)
            .with_property("max_instances", self.max_instances)
            .with_property("timeout_seconds", self.timeout_seconds)
            .with_property("traffic.type", "TRAFFIC_TARGET_ALLOCATION_TYPE_LATEST")
            .with_property("traffic.percent", 100i64);

        if let Some(probe) = self.startup_probe {
            declaration = declaration
                .with_property("startup_probe.initial_delay_seconds", probe.initial_delay_seconds)
                .with_property("startup_probe.period_seconds", probe.period_seconds)
                .with_property("startup_probe.failure_threshold", probe.failure_threshold)
                .with_property(
                    "startup_probe.port",
                    i64::from(probe.port.unwrap_or(container_port)),
                );
        }

        for env in self.env {
            let key = format!("env.{}", env.name);
            declaration = match env.value {
                EnvValue::Plain(value) => declaration.with_property(key, value),
                EnvValue::Secret(secret) => declaration.with_secret(key, secret),
            };
        }

        if let Some(vpc) = self.vpc_access {
            declaration =
                declaration.with_optional_reference("vpc_access.connector", vpc.connector, "id");
            if let Some(egress) = vpc.egress {
                declaration =
                    declaration.with_property("vpc_access.egress", <&'static str>::from(egress));
            }
        }

        declaration
    }
}

#[cfg(test)]
mod tests {
    use converge_engine::graph::PropertyValue;

    use super::*;

    fn service() -> CloudRunService {
        CloudRunService {
            name: "app".into(),
            location: "us-central1".into(),
            image: "registry.example/app:latest".into(),
            container_port: 3000,
            cpu_limit: "2".into(),
            memory_limit: "4Gi".into(),
            min_instances: 0,
            max_instances: 3,
            timeout_seconds: 300,
            startup_probe: Some(StartupProbe::default()),
            env: vec![
                EnvVar::plain("APP_DB_HOST", "db.internal"),
                EnvVar::secret("APP_DB_PASS", "hunter2"),
            ],
            vpc_access: Some(VpcAccess {
                connector: "vpc-connector".into(),
                egress: Some(Egress::PrivateRangesOnly),
            }),
        }
    }

    #[test]
    fn test_declare_flattens_env_and_probe() {
        let decl = service().declare("service");
        assert_eq!(decl.resource_type.as_str(), "gcp:cloudrunv2/service");
        assert!(decl.properties.contains_key("env.APP_DB_HOST"));
        assert!(matches!(
            decl.properties["env.APP_DB_PASS"],
            PropertyValue::Secret(_)
        ));
        assert_eq!(
            decl.properties["startup_probe.port"],
            PropertyValue::literal(3000)
        );
    }

    #[test]
    fn test_declare_vpc_access_is_an_optional_reference() {
        let decl = service().declare("service");
        let (reference, optional) = decl.properties["vpc_access.connector"]
            .as_reference()
            .unwrap();
        assert!(optional);
        assert_eq!(reference.node.as_str(), "vpc-connector");
        assert_eq!(
            decl.properties["vpc_access.egress"],
            PropertyValue::literal("PRIVATE_RANGES_ONLY")
        );
    }

    #[test]
    fn test_declare_without_vpc_access() {
        let mut resource = service();
        resource.vpc_access = None;
        let decl = resource.declare("service");
        assert!(!decl.properties.contains_key("vpc_access.connector"));
        assert!(!decl.properties.contains_key("vpc_access.egress"));
    }

    #[test]
    fn test_egress_parses_wire_values() {
        assert_eq!("ALL_TRAFFIC".parse::<Egress>().unwrap(), Egress::AllTraffic);
        assert!("all_traffic".parse::<Egress>().is_err());
    }
}
