//! Composition root.
//!
//! The single place where the dependency graph is assembled and
//! provisioning is triggered. Expensive resources (NAT gateways, the
//! balancer pair, the service itself) are enabled or disabled through one
//! feature flag set instead of duplicated entry points.

use std::collections::BTreeMap;

use gantry_cloud::{
    CloudEngine, IdentityProvider, ResourceKind, ResourceRef,
};
use gantry_core::{DeployContext, ProvisionRecord, ResourceGraph, TagSet};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::balancer::{BalancerConfig, BalancerTopology, Balancers};
use crate::cluster::ClusterProvisioner;
use crate::error::{StackError, StackResult};
use crate::network::{NetworkConfig, NetworkTopology};
use crate::registry::RegistryProvisioner;
use crate::service::{ComposedService, ServiceComposer, ServiceConfig};

/// Graph node names, one per topology component.
pub const NETWORK: &str = "network";
pub const CLUSTER: &str = "cluster";
pub const REGISTRY: &str = "registry";
pub const LOAD_BALANCERS: &str = "load-balancers";
pub const SERVICE: &str = "service";

/// Which components this run provisions.
///
/// The registry is always provisioned: it is account-scoped, cheap, and
/// required before any image can be pushed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopologyFeatures {
    pub network: bool,
    pub cluster: bool,
    pub load_balancers: bool,
    pub service: bool,
}

impl Default for TopologyFeatures {
    fn default() -> Self {
        Self::all()
    }
}

impl TopologyFeatures {
    /// The full topology.
    pub fn all() -> Self {
        Self {
            network: true,
            cluster: true,
            load_balancers: true,
            service: true,
        }
    }

    /// Registry only; nothing network-bound is created.
    pub fn registry_only() -> Self {
        Self {
            network: false,
            cluster: false,
            load_balancers: false,
            service: false,
        }
    }

    /// Everything except the running service.
    pub fn without_service() -> Self {
        Self {
            service: false,
            ..Self::all()
        }
    }
}

/// Full configuration for one topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub app_name: String,
    /// Image tag the service is deployed at
    pub version: String,
    pub tags: TagSet,
    pub network: NetworkConfig,
    pub cluster_name: String,
    pub balancers: BalancerConfig,
    pub service: ServiceConfig,
    pub features: TopologyFeatures,
}

impl TopologyConfig {
    pub fn new(app_name: impl Into<String>, version: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            network: NetworkConfig::new(format!("{}-vpc", app_name)),
            cluster_name: app_name.clone(),
            balancers: BalancerConfig::new(
                format!("{}-nlb", app_name),
                format!("{}-alb", app_name),
            ),
            service: ServiceConfig::new(format!("{}-service", app_name)),
            app_name,
            version: version.into(),
            tags: TagSet::new(),
            features: TopologyFeatures::all(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.service = service;
        self
    }

    pub fn features(mut self, features: TopologyFeatures) -> Self {
        self.features = features;
        self
    }
}

/// Everything one provisioning run produced.
#[derive(Debug, Clone)]
pub struct Topology {
    pub run_id: Uuid,
    pub network: Option<gantry_cloud::NetworkHandle>,
    pub cluster: Option<gantry_cloud::ClusterHandle>,
    pub registries: BTreeMap<String, gantry_cloud::RegistryHandle>,
    pub balancers: Option<Balancers>,
    pub service: Option<ComposedService>,
    pub records: Vec<ProvisionRecord>,
}

/// Assembles the graph and drives provisioning in dependency order.
#[derive(Debug, Clone)]
pub struct CompositionRoot {
    config: TopologyConfig,
}

impl CompositionRoot {
    pub fn new(config: TopologyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// The declared dependency graph for the enabled features.
    ///
    /// The engine must never create a dependent before its inputs exist;
    /// these edges are that contract.
    pub fn graph(&self) -> ResourceGraph {
        let features = &self.config.features;
        let mut graph = ResourceGraph::new();
        graph.add(REGISTRY);
        if features.network {
            graph.add(NETWORK);
        }
        if features.cluster {
            graph.depends_on(CLUSTER, NETWORK);
        }
        if features.load_balancers {
            graph.depends_on(LOAD_BALANCERS, NETWORK);
        }
        if features.service {
            graph.depends_on(SERVICE, CLUSTER);
            graph.depends_on(SERVICE, LOAD_BALANCERS);
            graph.depends_on(SERVICE, REGISTRY);
        }
        graph
    }

    /// Construction-time validation: feature flags must not strand a
    /// dependent component without its producers.
    pub fn validate(&self) -> StackResult<()> {
        let features = &self.config.features;
        if features.cluster && !features.network {
            return Err(StackError::MissingDependency(
                "cluster requires the network".to_string(),
            ));
        }
        if features.load_balancers && !features.network {
            return Err(StackError::MissingDependency(
                "load balancers require the network".to_string(),
            ));
        }
        if features.service && !(features.cluster && features.load_balancers) {
            return Err(StackError::MissingDependency(
                "service requires the cluster and both load balancers".to_string(),
            ));
        }
        if features.service {
            self.config.service.validate()?;
        }
        self.graph().provision_order()?;
        Ok(())
    }

    /// Resolve identity, then provision every enabled component in
    /// dependency order. Identity failure halts before any declaration.
    pub async fn provision(
        &self,
        engine: &dyn CloudEngine,
        identity: &dyn IdentityProvider,
    ) -> StackResult<Topology> {
        let identity = identity.resolve()?;
        self.validate()?;

        let ctx = DeployContext::new(identity, &self.config.version)
            .with_tags(self.config.tags.clone());
        info!(
            "Provisioning {} (run {}) as {}",
            self.config.app_name, ctx.run_id, ctx.identity
        );

        let order = self.graph().provision_order()?;
        let mut topology = Topology {
            run_id: ctx.run_id,
            network: None,
            cluster: None,
            registries: BTreeMap::new(),
            balancers: None,
            service: None,
            records: Vec::new(),
        };

        for node in &order {
            let record = ProvisionRecord::start(node.clone());
            match node.as_str() {
                NETWORK => {
                    let network = NetworkTopology::new(self.config.network.clone())
                        .provision(engine, &ctx)
                        .await?;
                    topology
                        .records
                        .push(record.with_resource(&network.network_id).finish());
                    topology.network = Some(network);
                }
                REGISTRY => {
                    let registries =
                        RegistryProvisioner::new([self.config.service.name.clone()])
                            .provision(engine, &ctx)
                            .await?;
                    let mut record = record;
                    for registry in registries.values() {
                        record = record.with_resource(&registry.repository_arn);
                    }
                    topology.records.push(record.finish());
                    topology.registries = registries;
                }
                CLUSTER => {
                    let network = topology
                        .network
                        .as_ref()
                        .ok_or_else(|| StackError::MissingDependency(NETWORK.to_string()))?;
                    let cluster = ClusterProvisioner::new(&self.config.cluster_name)
                        .provision(engine, &ctx, network)
                        .await?;
                    topology
                        .records
                        .push(record.with_resource(&cluster.cluster_arn).finish());
                    topology.cluster = Some(cluster);
                }
                LOAD_BALANCERS => {
                    let network = topology
                        .network
                        .as_ref()
                        .ok_or_else(|| StackError::MissingDependency(NETWORK.to_string()))?;
                    let balancers = BalancerTopology::new(self.config.balancers.clone())
                        .provision(engine, &ctx, network)
                        .await?;
                    topology.records.push(
                        record
                            .with_resource(&balancers.network.balancer_arn)
                            .with_resource(&balancers.application.balancer_arn)
                            .with_resource(&balancers.routing_link.link_id)
                            .finish(),
                    );
                    topology.balancers = Some(balancers);
                }
                SERVICE => {
                    let registry = topology
                        .registries
                        .get(&self.config.service.name)
                        .ok_or_else(|| StackError::MissingDependency(REGISTRY.to_string()))?;
                    let cluster = topology
                        .cluster
                        .as_ref()
                        .ok_or_else(|| StackError::MissingDependency(CLUSTER.to_string()))?;
                    let balancers = topology
                        .balancers
                        .as_ref()
                        .ok_or_else(|| StackError::MissingDependency(LOAD_BALANCERS.to_string()))?;

                    let composed = ServiceComposer::new(self.config.service.clone())
                        .compose(engine, &ctx, registry, cluster, balancers)
                        .await?;
                    topology
                        .records
                        .push(record.with_resource(&composed.service.service_arn).finish());
                    topology.service = Some(composed);
                }
                other => {
                    return Err(StackError::InvalidConfig(format!(
                        "unknown graph node '{}'",
                        other
                    )))
                }
            }
        }

        info!(
            "Provisioned {} components for {}",
            order.len(),
            self.config.app_name
        );
        Ok(topology)
    }

    /// Destroy everything the run produced, in strict reverse of the
    /// provisioning order.
    pub async fn teardown(
        &self,
        engine: &dyn CloudEngine,
        topology: &Topology,
    ) -> StackResult<()> {
        let order = self.graph().teardown_order()?;
        for node in &order {
            match node.as_str() {
                SERVICE => {
                    if let Some(composed) = &topology.service {
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::Service,
                                &composed.service.service_arn,
                            ))
                            .await?;
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::TaskDefinition,
                                &composed.task.family,
                            ))
                            .await?;
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::LogGroup,
                                &composed.log_group.name,
                            ))
                            .await?;
                    }
                }
                LOAD_BALANCERS => {
                    if let Some(balancers) = &topology.balancers {
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::RoutingLink,
                                &balancers.routing_link.link_id,
                            ))
                            .await?;
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::LoadBalancer,
                                &balancers.network.balancer_arn,
                            ))
                            .await?;
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::LoadBalancer,
                                &balancers.application.balancer_arn,
                            ))
                            .await?;
                    }
                }
                CLUSTER => {
                    if let Some(cluster) = &topology.cluster {
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::Cluster,
                                &cluster.cluster_arn,
                            ))
                            .await?;
                    }
                }
                REGISTRY => {
                    for registry in topology.registries.values() {
                        engine
                            .destroy(&ResourceRef::new(ResourceKind::Repository, &registry.name))
                            .await?;
                    }
                }
                NETWORK => {
                    if let Some(network) = &topology.network {
                        engine
                            .destroy(&ResourceRef::new(
                                ResourceKind::Network,
                                &network.network_id,
                            ))
                            .await?;
                    }
                }
                _ => {}
            }
            info!("Tore down {}", node);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TopologyConfig {
        TopologyConfig::new("ecommerce", "1.0.0")
    }

    #[test]
    fn test_graph_orders_service_last() {
        let root = CompositionRoot::new(config());
        let order = root.graph().provision_order().unwrap();

        assert_eq!(order.last().map(String::as_str), Some(SERVICE));
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos(NETWORK) < pos(CLUSTER));
        assert!(pos(NETWORK) < pos(LOAD_BALANCERS));
        assert!(pos(REGISTRY) < pos(SERVICE));
    }

    #[test]
    fn test_service_reaches_network_transitively() {
        let root = CompositionRoot::new(config());
        let ancestors = root.graph().ancestors(SERVICE).unwrap();

        assert!(ancestors.contains(CLUSTER));
        assert!(ancestors.contains(LOAD_BALANCERS));
        assert!(ancestors.contains(REGISTRY));
        assert!(ancestors.contains(NETWORK));
    }

    #[test]
    fn test_stranded_service_rejected() {
        let root = CompositionRoot::new(config().features(TopologyFeatures {
            network: true,
            cluster: false,
            load_balancers: true,
            service: true,
        }));

        assert!(matches!(
            root.validate(),
            Err(StackError::MissingDependency(_))
        ));
    }

    #[test]
    fn test_registry_only_features() {
        let root = CompositionRoot::new(config().features(TopologyFeatures::registry_only()));
        root.validate().unwrap();

        let order = root.graph().provision_order().unwrap();
        assert_eq!(order, vec![REGISTRY.to_string()]);
    }
}
