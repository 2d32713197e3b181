//! Cloud Run IAM member binding.

use converge_engine::graph::{ResourceDeclaration, ResourceName};
use strum::{Display, IntoStaticStr};

use super::GcpResource;

/// Role granted by the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Role {
    /// Permission to invoke the service.
    #[strum(serialize = "roles/run.invoker")]
    Invoker,
}

/// Principal the role is granted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Anyone, including unauthenticated callers.
    AllUsers,
    /// A specific identity, e.g. `serviceAccount:ci@project.iam.gserviceaccount.com`.
    Member(String),
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllUsers => f.write_str("allUsers"),
            Self::Member(member) => f.write_str(member),
        }
    }
}

/// Grants a principal a role on a Cloud Run service.
///
/// The service's generated name and location are threaded in as
/// references, which also orders the binding after the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIamMember {
    /// Node name of the service being bound.
    pub service: ResourceName,
    /// Granted role.
    pub role: Role,
    /// Grantee.
    pub member: Principal,
}

impl ServiceIamMember {
    /// Converts into a resource declaration.
    pub fn declare(self, name: impl Into<ResourceName>) -> ResourceDeclaration {
        ResourceDeclaration::new(name, GcpResource::ServiceIamMember)
            .with_reference("service_name", self.service.clone(), "name")
            .with_reference("location", self.service, "location")
            .with_property("role", <&'static str>::from(self.role))
            .with_property("member", self.member.to_string())
    }
}
