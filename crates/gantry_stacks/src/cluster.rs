//! Orchestration cluster provisioning.

use gantry_cloud::{CloudEngine, ClusterHandle, ClusterSpec, NetworkHandle};
use gantry_core::DeployContext;
use tracing::info;

use crate::error::StackResult;

/// Binds a named cluster to a network. Pure binding; no further state.
#[derive(Debug, Clone)]
pub struct ClusterProvisioner {
    name: String,
}

impl ClusterProvisioner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Provision the cluster. Idempotent under the engine's converge
    /// semantics: re-running with unchanged inputs is a no-op.
    pub async fn provision(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
        network: &NetworkHandle,
    ) -> StackResult<ClusterHandle> {
        let spec = ClusterSpec::new(&self.name, network).tags(ctx.tags.clone());
        let cluster = engine.create_cluster(&spec).await?;
        info!(
            "Provisioned cluster {} on network {}",
            cluster.name, cluster.network_id
        );
        Ok(cluster)
    }
}
