//! Project-level API enablement.

use converge_engine::graph::{ResourceDeclaration, ResourceName};

use super::GcpResource;

/// Enables an API on the project, e.g. `run.googleapis.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectService {
    /// Fully qualified API name.
    pub service: String,
    /// Whether the API is disabled again when the toggle is destroyed.
    /// Left off for shared APIs that other deployments may rely on.
    pub disable_on_destroy: bool,
}

impl ProjectService {
    /// Creates a toggle that keeps the API enabled on destroy.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            disable_on_destroy: false,
        }
    }

    /// Converts into a resource declaration.
    pub fn declare(self, name: impl Into<ResourceName>) -> ResourceDeclaration {
        ResourceDeclaration::new(name, GcpResource::ProjectService)
            .with_property("service", self.service)
            .with_property("disable_on_destroy", self.disable_on_destroy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare() {
        let decl = ProjectService::new("run.googleapis.com").declare("run-api");
        assert_eq!(decl.name.as_str(), "run-api");
        assert_eq!(decl.resource_type.as_str(), "gcp:projects/service");
        assert_eq!(decl.properties.len(), 2);
    }
}
