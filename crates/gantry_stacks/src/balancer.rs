//! Load balancer topology.
//!
//! Two balancers are provisioned on the same network: a network-layer one
//! for the low-latency layer-4 path, and an application-layer one for the
//! layer-7 path with path-based routing and health-aware target
//! management. Both stay internal; public reachability belongs to the
//! external gateway bridged onto the network-layer balancer through a
//! routing link.

use gantry_cloud::{
    BalancerHandle, BalancerKind, BalancerSpec, CloudEngine, NetworkHandle, RoutingLink,
};
use gantry_core::DeployContext;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StackResult;

/// Configuration for the balancer pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    pub network_balancer_name: String,
    pub application_balancer_name: String,
    /// Both balancers stay internal unless explicitly switched.
    pub internet_facing: bool,
}

impl BalancerConfig {
    pub fn new(
        network_balancer_name: impl Into<String>,
        application_balancer_name: impl Into<String>,
    ) -> Self {
        Self {
            network_balancer_name: network_balancer_name.into(),
            application_balancer_name: application_balancer_name.into(),
            internet_facing: false,
        }
    }
}

/// The provisioned balancer pair with its gateway bridge.
#[derive(Debug, Clone)]
pub struct Balancers {
    pub network: BalancerHandle,
    pub application: BalancerHandle,
    pub routing_link: RoutingLink,
}

/// Provisions both balancers and the gateway routing link.
#[derive(Debug, Clone)]
pub struct BalancerTopology {
    config: BalancerConfig,
}

impl BalancerTopology {
    pub fn new(config: BalancerConfig) -> Self {
        Self { config }
    }

    /// Provision the network-layer balancer.
    pub async fn provision_network_balancer(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
        network: &NetworkHandle,
    ) -> StackResult<BalancerHandle> {
        self.provision_balancer(
            engine,
            ctx,
            network,
            &self.config.network_balancer_name,
            BalancerKind::NetworkLayer,
        )
        .await
    }

    /// Provision the application-layer balancer.
    pub async fn provision_application_balancer(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
        network: &NetworkHandle,
    ) -> StackResult<BalancerHandle> {
        self.provision_balancer(
            engine,
            ctx,
            network,
            &self.config.application_balancer_name,
            BalancerKind::ApplicationLayer,
        )
        .await
    }

    /// Bridge the network-layer balancer to the external gateway.
    ///
    /// The link lets layer-7 systems outside the network boundary reach
    /// the internal layer-4 balancer without exposing it publicly.
    pub async fn bridge(
        &self,
        engine: &dyn CloudEngine,
        network_balancer: &BalancerHandle,
    ) -> StackResult<RoutingLink> {
        let link = engine.create_routing_link(network_balancer).await?;
        info!(
            "Bridged balancer {} to gateway via {}",
            network_balancer.name, link.link_id
        );
        Ok(link)
    }

    /// Provision the full balancer topology: both balancers plus the
    /// gateway bridge.
    pub async fn provision(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
        network: &NetworkHandle,
    ) -> StackResult<Balancers> {
        let network_balancer = self.provision_network_balancer(engine, ctx, network).await?;
        let routing_link = self.bridge(engine, &network_balancer).await?;
        let application_balancer = self
            .provision_application_balancer(engine, ctx, network)
            .await?;

        Ok(Balancers {
            network: network_balancer,
            application: application_balancer,
            routing_link,
        })
    }

    async fn provision_balancer(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
        network: &NetworkHandle,
        name: &str,
        kind: BalancerKind,
    ) -> StackResult<BalancerHandle> {
        let mut spec = BalancerSpec::new(name, kind, network).tags(ctx.tags.clone());
        if self.config.internet_facing {
            spec = spec.internet_facing();
        }
        let balancer = engine.create_load_balancer(&spec).await?;
        info!(
            "Provisioned {} balancer {} on network {}",
            balancer.kind, balancer.name, balancer.network_id
        );
        Ok(balancer)
    }
}
