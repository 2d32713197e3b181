//! Container service stack assembly.
//!
//! [`ServiceStack::from_config`] maps flat configuration onto the
//! deployment graph: API toggles, the conditional VPC connector
//! subgraph, the Cloud Run service, and the gated public-access
//! binding, plus the export list consumed by operators.

use converge_engine::EngineResult;
use converge_engine::config::Config;
use converge_engine::export::Export;
use converge_engine::graph::{Gate, ResourceDeclaration, ResourceGraph};

use crate::TRACING_TARGET;
use crate::profile::ServiceProfile;
use crate::resources::{
    CloudRunService, EnvVar, Principal, ProjectService, Role, ServiceIamMember, StartupProbe,
    VpcAccess, VpcAccessConnector,
};

/// Node name of the Cloud Run API toggle.
pub const RUN_API: &str = "run-api";
/// Node name of the VPC Access API toggle.
pub const VPCACCESS_API: &str = "vpcaccess-api";
/// Node name of the VPC connector.
pub const VPC_CONNECTOR: &str = "vpc-connector";
/// Node name of the Cloud Run service.
pub const SERVICE: &str = "service";
/// Node name of the public-access IAM binding.
pub const PUBLIC_ACCESS: &str = "public-access";

/// Config key gating the VPC connector subgraph.
const VPC_CONNECTOR_NAME: &str = "vpc_connector_name";

/// The declared container-service deployment.
#[derive(Debug, Clone)]
pub struct ServiceStack {
    declarations: Vec<ResourceDeclaration>,
    exports: Vec<Export>,
}

impl ServiceStack {
    /// Assembles the stack from configuration.
    ///
    /// Every config value is resolved here, once; the resulting
    /// declarations are never re-read from config, so plan and apply
    /// cannot drift apart.
    pub fn from_config(config: &Config) -> EngineResult<Self> {
        let project = config.require("project")?;
        let region = config.get_or("region", "us-central1");
        let profile = ServiceProfile::from_config(config)?;
        let service_name = config.get_or("service_name", "app");
        let image = config.require("image")?;
        let container_port = port_from_config(config, "container_port", 3000)?;
        let connector_configured = config.is_set(VPC_CONNECTOR_NAME);

        let connector_gate = Gate::ConfigSet(VPC_CONNECTOR_NAME.into());
        let mut declarations = vec![
            ProjectService::new("run.googleapis.com").declare(RUN_API),
            ProjectService::new("vpcaccess.googleapis.com")
                .declare(VPCACCESS_API)
                .with_gate(connector_gate.clone()),
            VpcAccessConnector {
                name: config.get_or(VPC_CONNECTOR_NAME, ""),
                region: region.clone(),
                ip_cidr_range: config.get_or("vpc_connector_cidr", "10.8.0.0/28"),
                min_instances: config.get_int_or("vpc_connector_min_instances", 2)?,
                max_instances: config.get_int_or("vpc_connector_max_instances", 10)?,
                subnet: config.get("vpc_connector_subnet").map(str::to_owned),
            }
            .declare(VPC_CONNECTOR)
            .with_gate(connector_gate)
            .with_dependency(VPCACCESS_API),
        ];

        let egress = match config.get("vpc_egress") {
            None => profile.default_egress(),
            Some(raw) => raw
                .parse()
                .map_err(|_| converge_engine::EngineError::InvalidConfig {
                    key: "vpc_egress".into(),
                    message: format!("unknown egress policy '{raw}'"),
                })?,
        };

        declarations.push(
            CloudRunService {
                name: service_name.clone(),
                location: region,
                image,
                container_port,
                cpu_limit: config.get_or("cpu_limit", "2"),
                memory_limit: config.get_or("memory_limit", "4Gi"),
                min_instances: config.get_int_or("min_instances", 0)?,
                max_instances: config.get_int_or("max_instances", 3)?,
                timeout_seconds: config.get_int_or("request_timeout_seconds", 300)?,
                startup_probe: Some(StartupProbe {
                    initial_delay_seconds: config
                        .get_int_or("startup_probe_initial_delay_seconds", 0)?,
                    period_seconds: config.get_int_or("startup_probe_period_seconds", 240)?,
                    failure_threshold: config.get_int_or("startup_probe_failure_threshold", 1)?,
                    port: None,
                }),
                env: database_env(config, &service_name),
                vpc_access: Some(VpcAccess {
                    connector: VPC_CONNECTOR.into(),
                    egress: connector_configured.then_some(egress),
                }),
            }
            .declare(SERVICE)
            .with_dependency(RUN_API)
            .with_dependency(VPCACCESS_API),
        );

        declarations.push(
            ServiceIamMember {
                service: SERVICE.into(),
                role: Role::Invoker,
                member: match config.get("iam_member") {
                    Some(member) if member != "allUsers" => Principal::Member(member.to_owned()),
                    _ => Principal::AllUsers,
                },
            }
            .declare(PUBLIC_ACCESS)
            .with_gate(Gate::ConfigTrue {
                key: "allow_unauthenticated".into(),
                default: profile.default_allow_unauthenticated(),
            }),
        );

        // Connector exports are declared unconditionally; collection
        // leaves their keys absent when the subgraph is gated out.
        let exports = vec![
            Export::output("service_name", SERVICE, "name"),
            Export::output("service_url", SERVICE, "uri"),
            Export::output("service_location", SERVICE, "location"),
            Export::literal("project_id", project),
            Export::output("vpc_connector_id", VPC_CONNECTOR, "id"),
            Export::output("vpc_connector_name", VPC_CONNECTOR, "name"),
        ];

        tracing::debug!(
            target: TRACING_TARGET,
            service = %service_name,
            %profile,
            connector = connector_configured,
            "Assembled service stack"
        );

        Ok(Self {
            declarations,
            exports,
        })
    }

    /// Returns the stack's resource declarations.
    pub fn declarations(&self) -> &[ResourceDeclaration] {
        &self.declarations
    }

    /// Returns the stack's export list.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Builds the validated graph for this stack.
    pub fn build_graph(&self, config: &Config) -> EngineResult<ResourceGraph> {
        ResourceGraph::build(self.declarations.clone(), config)
    }

    /// Consumes the stack into declarations and exports.
    pub fn into_parts(self) -> (Vec<ResourceDeclaration>, Vec<Export>) {
        (self.declarations, self.exports)
    }
}

/// Database settings become container env vars under the configured
/// prefix. The block is only emitted when a host is configured;
/// credentials stay secret-typed end to end.
fn database_env(config: &Config, service_name: &str) -> Vec<EnvVar> {
    if !config.is_set("db_host") {
        return Vec::new();
    }
    let prefix = config.get_or("env_prefix", "APP");
    let mut env = vec![
        EnvVar::plain(
            format!("{prefix}_DB_TYPE"),
            config.get_or("db_type", "postgres"),
        ),
        EnvVar::plain(
            format!("{prefix}_DB_DBNAME"),
            config.get_or("db_name", service_name),
        ),
        EnvVar::plain(format!("{prefix}_DB_PORT"), config.get_or("db_port", "5432")),
        EnvVar::plain(format!("{prefix}_DB_HOST"), config.get_or("db_host", "")),
    ];
    if let Some(user) = config.get_secret("db_user") {
        env.push(EnvVar::secret(format!("{prefix}_DB_USER"), user.clone()));
    }
    if let Some(pass) = config.get_secret("db_pass") {
        env.push(EnvVar::secret(format!("{prefix}_DB_PASS"), pass.clone()));
    }
    env
}

fn port_from_config(config: &Config, key: &str, default: i64) -> EngineResult<u16> {
    let raw = config.get_int_or(key, default)?;
    u16::try_from(raw).map_err(|_| converge_engine::EngineError::InvalidConfig {
        key: key.to_owned(),
        message: format!("expected a port number, got {raw}"),
    })
}
