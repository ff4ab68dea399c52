//! Virtual network provisioning.

use gantry_cloud::{CloudEngine, NetworkHandle, NetworkSpec};
use gantry_core::DeployContext;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StackError, StackResult};

/// Configuration for the virtual network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    /// Availability zones to spread subnets across
    pub az_count: u32,
    /// NAT egress for private subnets. Cost-bearing; opting out removes
    /// internet egress from private subnets.
    pub nat_egress: bool,
}

impl NetworkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            az_count: 2,
            nat_egress: true,
        }
    }

    pub fn az_count(mut self, count: u32) -> Self {
        self.az_count = count;
        self
    }

    pub fn without_nat(mut self) -> Self {
        self.nat_egress = false;
        self
    }
}

/// Allocates a virtual network with public/private subnets in each
/// availability zone.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    config: NetworkConfig,
}

impl NetworkTopology {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    /// Provision the network.
    ///
    /// Quota failures (NAT/EIP allocations) are not recoverable locally
    /// and propagate to the caller.
    pub async fn provision(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
    ) -> StackResult<NetworkHandle> {
        if self.config.az_count < 1 {
            return Err(StackError::InvalidConfig(format!(
                "network '{}' requires at least one availability zone",
                self.config.name
            )));
        }

        let mut spec = NetworkSpec::new(&self.config.name)
            .az_count(self.config.az_count)
            .tags(ctx.tags.clone());
        if !self.config.nat_egress {
            spec = spec.without_nat();
        }

        let network = engine.create_network(&spec).await?;
        info!(
            "Provisioned network {} ({}) across {} availability zones",
            network.name, network.network_id, network.az_count
        );
        Ok(network)
    }
}
