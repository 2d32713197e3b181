//! Typed GCP resource kinds.
//!
//! Each type here maps one provider resource kind into a flat
//! declaration:
//! - [`ProjectService`]: API-enablement toggle
//! - [`VpcAccessConnector`]: Serverless VPC Access connector
//! - [`CloudRunService`]: Cloud Run v2 service
//! - [`ServiceIamMember`]: access-policy binding

mod connector;
mod iam;
mod project_service;
mod service;

use converge_engine::graph::ResourceType;
use strum::IntoStaticStr;

pub use connector::VpcAccessConnector;
pub use iam::{Principal, Role, ServiceIamMember};
pub use project_service::ProjectService;
pub use service::{CloudRunService, Egress, EnvValue, EnvVar, StartupProbe, VpcAccess};

/// Resource kind tags understood by the GCP provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum GcpResource {
    /// Project-level API enablement (`gcp:projects/service`).
    #[strum(serialize = "gcp:projects/service")]
    ProjectService,
    /// Serverless VPC Access connector (`gcp:vpcaccess/connector`).
    #[strum(serialize = "gcp:vpcaccess/connector")]
    VpcAccessConnector,
    /// Cloud Run v2 service (`gcp:cloudrunv2/service`).
    #[strum(serialize = "gcp:cloudrunv2/service")]
    CloudRunService,
    /// Cloud Run v2 IAM member binding (`gcp:cloudrunv2/serviceIamMember`).
    #[strum(serialize = "gcp:cloudrunv2/serviceIamMember")]
    ServiceIamMember,
}

impl GcpResource {
    /// Returns the kind tag as a string.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<GcpResource> for ResourceType {
    fn from(kind: GcpResource) -> Self {
        ResourceType::new(kind.as_str())
    }
}
