//! Serverless VPC Access connector.

use converge_engine::graph::{ResourceDeclaration, ResourceName};

use super::GcpResource;

/// A Serverless VPC Access connector bridging the service into a
/// private network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcAccessConnector {
    /// Connector name.
    pub name: String,
    /// Region the connector lives in.
    pub region: String,
    /// CIDR block reserved for the connector.
    pub ip_cidr_range: String,
    /// Minimum number of connector instances.
    pub min_instances: i64,
    /// Maximum number of connector instances.
    pub max_instances: i64,
    /// Existing subnet to attach to instead of the CIDR block.
    pub subnet: Option<String>,
}

impl VpcAccessConnector {
    /// Converts into a resource declaration.
    pub fn declare(self, name: impl Into<ResourceName>) -> ResourceDeclaration {
        let mut declaration = ResourceDeclaration::new(name, GcpResource::VpcAccessConnector)
            .with_property("name", self.name)
            .with_property("region", self.region)
            .with_property("ip_cidr_range", self.ip_cidr_range)
            .with_property("min_instances", self.min_instances)
            .with_property("max_instances", self.max_instances);
        if let Some(subnet) = self.subnet {
            declaration = declaration.with_property("subnet", subnet);
        }
        declaration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> VpcAccessConnector {
        VpcAccessConnector {
            name: "vpc-a".into(),
            region: "us-central1".into(),
            ip_cidr_range: "10.8.0.0/28".into(),
            min_instances: 2,
            max_instances: 10,
            subnet: None,
        }
    }

    #[test]
    fn test_declare_without_subnet() {
        let decl = connector().declare("vpc-connector");
        assert_eq!(decl.resource_type.as_str(), "gcp:vpcaccess/connector");
        assert!(!decl.properties.contains_key("subnet"));
    }

    #[test]
    fn test_declare_with_subnet() {
        let mut resource = connector();
        resource.subnet = Some("shared-subnet".into());
        let decl = resource.declare("vpc-connector");
        assert!(decl.properties.contains_key("subnet"));
    }
}
