//! Image registry provisioning.

use std::collections::{BTreeMap, BTreeSet};

use gantry_cloud::{CloudEngine, RegistryHandle, RepositorySpec};
use gantry_core::DeployContext;
use tracing::info;

use crate::error::StackResult;

/// Allocates one image repository per logical service name.
///
/// Registries are account-scoped, not network-scoped, which is why this
/// component carries no dependency edge to the network.
#[derive(Debug, Clone)]
pub struct RegistryProvisioner {
    names: BTreeSet<String>,
}

impl RegistryProvisioner {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Provision every repository, returning handles keyed by logical name.
    pub async fn provision(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
    ) -> StackResult<BTreeMap<String, RegistryHandle>> {
        let mut registries = BTreeMap::new();
        for name in &self.names {
            let spec = RepositorySpec::new(name).tags(ctx.tags.clone());
            let registry = engine.create_repository(&spec).await?;
            info!("Provisioned repository {}", registry.repository_uri);
            registries.insert(name.clone(), registry);
        }
        Ok(registries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_cloud::MockCloud;
    use gantry_core::Identity;

    #[tokio::test]
    async fn test_one_repository_per_name() {
        let cloud = MockCloud::new();
        let ctx = DeployContext::new(Identity::new("123", "us-west-1"), "1.0.0");

        let provisioner = RegistryProvisioner::new(["products-service", "orders-service"]);
        let registries = provisioner.provision(&cloud, &ctx).await.unwrap();

        assert_eq!(registries.len(), 2);
        assert!(registries.contains_key("products-service"));
        assert!(registries.contains_key("orders-service"));
        // no network was required
        assert_eq!(cloud.call_count("create_network"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_names_collapse() {
        let cloud = MockCloud::new();
        let ctx = DeployContext::new(Identity::new("123", "us-west-1"), "1.0.0");

        let provisioner = RegistryProvisioner::new(["products-service", "products-service"]);
        let registries = provisioner.provision(&cloud, &ctx).await.unwrap();

        assert_eq!(registries.len(), 1);
        assert_eq!(cloud.call_count("create_repository"), 1);
    }
}
