//! In-memory cloud engine for tests and dry-runs.
//!
//! `MockCloud` implements the full [`CloudEngine`] contract without a cloud
//! account: deterministic identifiers, converge-idempotent creates, and
//! referential integrity on destroy. It captures every call so tests can
//! assert on exactly what was declared, and it backs the CLI's `plan`
//! command.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::Identity;
use parking_lot::RwLock;
use tracing::debug;

use crate::engine::CloudEngine;
use crate::error::{CloudError, CloudResult};
use crate::types::{
    BalancerHandle, BalancerKind, BalancerSpec, ClusterHandle, ClusterSpec, IngressRule,
    ListenerHandle, ListenerSpec, LogGroupHandle, LogGroupSpec, NetworkHandle, NetworkSpec,
    PullGrant, RegistryHandle, RepositorySpec, ResourceKind, ResourceRef, RoutingLink,
    ServiceHandle, ServiceSpec, SubnetHandle, SubnetTier, TargetGroupHandle, TargetSpec,
    TaskDefHandle, TaskSpec,
};

/// Captured engine call for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub resource: String,
}

#[derive(Default)]
struct MockState {
    counters: HashMap<String, u64>,
    calls: Vec<CapturedCall>,
    failures: HashMap<String, CloudError>,
    networks: BTreeMap<String, NetworkHandle>,
    clusters: BTreeMap<String, ClusterHandle>,
    repositories: BTreeMap<String, RegistryHandle>,
    balancers: BTreeMap<String, BalancerHandle>,
    routing_links: BTreeMap<String, RoutingLink>,
    log_groups: BTreeMap<String, LogGroupHandle>,
    task_definitions: BTreeMap<String, TaskDefHandle>,
    services: BTreeMap<String, ServiceHandle>,
    listeners: BTreeMap<(String, u16), ListenerHandle>,
    target_groups: BTreeMap<(String, String), TargetGroupHandle>,
    ingress: BTreeMap<String, Vec<IngressRule>>,
    pull_grants: BTreeSet<(String, String)>,
}

impl MockState {
    fn next(&mut self, prefix: &str) -> u64 {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn id(&mut self, prefix: &str) -> String {
        format!("{}-{:04}", prefix, self.next(prefix))
    }

    fn capture(&mut self, method: &str, resource: impl Into<String>) {
        self.calls.push(CapturedCall {
            method: method.to_string(),
            resource: resource.into(),
        });
    }

    fn check_failure(&self, method: &str) -> CloudResult<()> {
        match self.failures.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory capturing cloud engine.
#[derive(Clone)]
pub struct MockCloud {
    identity: Identity,
    state: Arc<RwLock<MockState>>,
}

impl Default for MockCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCloud {
    /// Create a mock engine with a placeholder identity.
    pub fn new() -> Self {
        Self::with_identity(Identity::new("000000000000", "us-east-1"))
    }

    /// Create a mock engine resolving ARNs against the given identity.
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity,
            state: Arc::new(RwLock::new(MockState::default())),
        }
    }

    /// Script a persistent failure for an engine method by name
    /// (e.g. `"create_network"`).
    pub fn fail_on(self, method: impl Into<String>, error: CloudError) -> Self {
        self.state.write().failures.insert(method.into(), error);
        self
    }

    /// Remove all scripted failures.
    pub fn clear_failures(&self) {
        self.state.write().failures.clear();
    }

    /// The identity this engine resolves ARNs against.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<CapturedCall> {
        self.state.read().calls.clone()
    }

    /// Number of calls to a given method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Live networks by name.
    pub fn networks(&self) -> Vec<NetworkHandle> {
        self.state.read().networks.values().cloned().collect()
    }

    /// Live services by name.
    pub fn services(&self) -> Vec<ServiceHandle> {
        self.state.read().services.values().cloned().collect()
    }

    /// Live clusters by name.
    pub fn clusters(&self) -> Vec<ClusterHandle> {
        self.state.read().clusters.values().cloned().collect()
    }

    /// Live repositories by name.
    pub fn repositories(&self) -> Vec<RegistryHandle> {
        self.state.read().repositories.values().cloned().collect()
    }

    /// Live balancers by name.
    pub fn balancers(&self) -> Vec<BalancerHandle> {
        self.state.read().balancers.values().cloned().collect()
    }

    /// Live log groups by name.
    pub fn log_groups(&self) -> Vec<LogGroupHandle> {
        self.state.read().log_groups.values().cloned().collect()
    }

    /// Registered task definitions by family.
    pub fn task_definitions(&self) -> Vec<TaskDefHandle> {
        self.state.read().task_definitions.values().cloned().collect()
    }

    /// Every ingress rule, paired with its security group.
    pub fn all_ingress_rules(&self) -> Vec<(String, IngressRule)> {
        self.state
            .read()
            .ingress
            .iter()
            .flat_map(|(sg, rules)| rules.iter().map(|r| (sg.clone(), r.clone())))
            .collect()
    }

    /// Live target registrations.
    pub fn target_registrations(&self) -> Vec<TargetGroupHandle> {
        self.state.read().target_groups.values().cloned().collect()
    }

    /// Live listeners.
    pub fn listeners(&self) -> Vec<ListenerHandle> {
        self.state.read().listeners.values().cloned().collect()
    }

    /// Live routing links.
    pub fn routing_links(&self) -> Vec<RoutingLink> {
        self.state.read().routing_links.values().cloned().collect()
    }

    /// Ingress rules attached to a security group.
    pub fn ingress_rules(&self, security_group_id: &str) -> Vec<IngressRule> {
        self.state
            .read()
            .ingress
            .get(security_group_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All pull grants.
    pub fn pull_grants(&self) -> Vec<PullGrant> {
        self.state
            .read()
            .pull_grants
            .iter()
            .map(|(repository, principal)| PullGrant {
                repository: repository.clone(),
                principal: principal.clone(),
            })
            .collect()
    }

    /// Number of live resources of a kind.
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        let state = self.state.read();
        match kind {
            ResourceKind::Network => state.networks.len(),
            ResourceKind::Cluster => state.clusters.len(),
            ResourceKind::Repository => state.repositories.len(),
            ResourceKind::LoadBalancer => state.balancers.len(),
            ResourceKind::RoutingLink => state.routing_links.len(),
            ResourceKind::LogGroup => state.log_groups.len(),
            ResourceKind::TaskDefinition => state.task_definitions.len(),
            ResourceKind::Service => state.services.len(),
            ResourceKind::Listener => state.listeners.len(),
            ResourceKind::TargetGroup => state.target_groups.len(),
        }
    }

    fn az_name(&self, index: u32) -> String {
        let letter = (b'a' + (index % 26) as u8) as char;
        format!("{}{}", self.identity.region, letter)
    }
}

#[async_trait]
impl CloudEngine for MockCloud {
    async fn create_network(&self, spec: &NetworkSpec) -> CloudResult<NetworkHandle> {
        spec.validate()?;
        let mut state = self.state.write();
        state.capture("create_network", &spec.name);
        state.check_failure("create_network")?;

        if let Some(existing) = state.networks.get(&spec.name) {
            debug!("Network {} already converged", spec.name);
            return Ok(existing.clone());
        }

        let network_id = state.id("vpc");
        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for az in 0..spec.az_count {
            public_subnets.push(SubnetHandle {
                subnet_id: state.id("subnet"),
                tier: SubnetTier::Public,
                availability_zone: self.az_name(az),
            });
            private_subnets.push(SubnetHandle {
                subnet_id: state.id("subnet"),
                tier: SubnetTier::Private,
                availability_zone: self.az_name(az),
            });
        }

        let handle = NetworkHandle {
            network_id,
            name: spec.name.clone(),
            az_count: spec.az_count,
            public_subnets,
            private_subnets,
            nat_egress: spec.nat_egress,
        };
        state.networks.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    async fn create_cluster(&self, spec: &ClusterSpec) -> CloudResult<ClusterHandle> {
        let mut state = self.state.write();
        state.capture("create_cluster", &spec.name);
        state.check_failure("create_cluster")?;

        if !state
            .networks
            .values()
            .any(|n| n.network_id == spec.network_id)
        {
            return Err(CloudError::NotFound(format!(
                "network {} for cluster {}",
                spec.network_id, spec.name
            )));
        }

        if let Some(existing) = state.clusters.get(&spec.name) {
            return Ok(existing.clone());
        }

        let handle = ClusterHandle {
            cluster_arn: format!(
                "arn:aws:ecs:{}:{}:cluster/{}",
                self.identity.region, self.identity.account_id, spec.name
            ),
            name: spec.name.clone(),
            network_id: spec.network_id.clone(),
        };
        state.clusters.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    async fn create_repository(&self, spec: &RepositorySpec) -> CloudResult<RegistryHandle> {
        let mut state = self.state.write();
        state.capture("create_repository", &spec.name);
        state.check_failure("create_repository")?;

        if let Some(existing) = state.repositories.get(&spec.name) {
            return Ok(existing.clone());
        }

        let handle = RegistryHandle {
            repository_arn: format!(
                "arn:aws:ecr:{}:{}:repository/{}",
                self.identity.region, self.identity.account_id, spec.name
            ),
            repository_uri: format!(
                "{}.dkr.ecr.{}.amazonaws.com/{}",
                self.identity.account_id, self.identity.region, spec.name
            ),
            name: spec.name.clone(),
        };
        state.repositories.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    async fn create_load_balancer(&self, spec: &BalancerSpec) -> CloudResult<BalancerHandle> {
        spec.validate()?;
        let mut state = self.state.write();
        state.capture("create_load_balancer", &spec.name);
        state.check_failure("create_load_balancer")?;

        if !state
            .networks
            .values()
            .any(|n| n.network_id == spec.network_id)
        {
            return Err(CloudError::NotFound(format!(
                "network {} for load balancer {}",
                spec.network_id, spec.name
            )));
        }

        if let Some(existing) = state.balancers.get(&spec.name) {
            return Ok(existing.clone());
        }

        let layer = match spec.kind {
            BalancerKind::NetworkLayer => "net",
            BalancerKind::ApplicationLayer => "app",
        };
        let sequence = state.next("balancer");
        let handle = BalancerHandle {
            balancer_arn: format!(
                "arn:aws:elasticloadbalancing:{}:{}:loadbalancer/{}/{}/{:04}",
                self.identity.region, self.identity.account_id, layer, spec.name, sequence
            ),
            name: spec.name.clone(),
            kind: spec.kind,
            scheme: spec.scheme,
            network_id: spec.network_id.clone(),
        };
        state.balancers.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    async fn create_routing_link(&self, balancer: &BalancerHandle) -> CloudResult<RoutingLink> {
        let mut state = self.state.write();
        state.capture("create_routing_link", &balancer.name);
        state.check_failure("create_routing_link")?;

        if balancer.kind != BalancerKind::NetworkLayer {
            return Err(CloudError::InvalidParameter(format!(
                "routing link requires a network-layer balancer, got {} ({})",
                balancer.name, balancer.kind
            )));
        }
        if !state.balancers.contains_key(&balancer.name) {
            return Err(CloudError::NotFound(format!(
                "load balancer {}",
                balancer.name
            )));
        }

        if let Some(existing) = state.routing_links.get(&balancer.balancer_arn) {
            return Ok(existing.clone());
        }

        let link = RoutingLink {
            link_id: state.id("vpclink"),
            balancer_arn: balancer.balancer_arn.clone(),
        };
        state
            .routing_links
            .insert(balancer.balancer_arn.clone(), link.clone());
        Ok(link)
    }

    async fn create_log_group(&self, spec: &LogGroupSpec) -> CloudResult<LogGroupHandle> {
        spec.validate()?;
        let mut state = self.state.write();
        state.capture("create_log_group", &spec.name);
        state.check_failure("create_log_group")?;

        if let Some(existing) = state.log_groups.get(&spec.name) {
            return Ok(existing.clone());
        }

        let handle = LogGroupHandle {
            name: spec.name.clone(),
            retention_days: spec.retention_days,
            destroy_on_teardown: spec.destroy_on_teardown,
        };
        state.log_groups.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    async fn register_task_definition(&self, spec: &TaskSpec) -> CloudResult<TaskDefHandle> {
        spec.validate()?;
        let mut state = self.state.write();
        state.capture("register_task_definition", &spec.family);
        state.check_failure("register_task_definition")?;

        if let Some(existing) = state.task_definitions.get(&spec.family) {
            return Ok(existing.clone());
        }

        let handle = TaskDefHandle {
            task_definition_arn: format!(
                "arn:aws:ecs:{}:{}:task-definition/{}:1",
                self.identity.region, self.identity.account_id, spec.family
            ),
            family: spec.family.clone(),
            container_name: spec.container_name.clone(),
            port: spec.port,
        };
        state
            .task_definitions
            .insert(spec.family.clone(), handle.clone());
        Ok(handle)
    }

    async fn create_service(&self, spec: &ServiceSpec) -> CloudResult<ServiceHandle> {
        let mut state = self.state.write();
        state.capture("create_service", &spec.name);
        state.check_failure("create_service")?;

        let cluster = state
            .clusters
            .values()
            .find(|c| c.cluster_arn == spec.cluster_arn)
            .cloned()
            .ok_or_else(|| {
                CloudError::NotFound(format!("cluster {} for service {}", spec.cluster_arn, spec.name))
            })?;
        let task = state
            .task_definitions
            .values()
            .find(|t| t.task_definition_arn == spec.task_definition_arn)
            .cloned()
            .ok_or_else(|| {
                CloudError::NotFound(format!(
                    "task definition {} for service {}",
                    spec.task_definition_arn, spec.name
                ))
            })?;

        if let Some(existing) = state.services.get(&spec.name) {
            return Ok(existing.clone());
        }

        let security_group_id = state.id("sg");
        let handle = ServiceHandle {
            service_arn: format!(
                "arn:aws:ecs:{}:{}:service/{}/{}",
                self.identity.region, self.identity.account_id, cluster.name, spec.name
            ),
            name: spec.name.clone(),
            cluster_arn: spec.cluster_arn.clone(),
            task_family: task.family,
            security_group_id,
            desired_count: spec.desired_count,
            execution_role_arn: format!(
                "arn:aws:iam::{}:role/{}-execution",
                self.identity.account_id, spec.name
            ),
        };
        state.services.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    async fn grant_pull(&self, registry: &RegistryHandle, principal: &str) -> CloudResult<()> {
        let mut state = self.state.write();
        state.capture("grant_pull", &registry.name);
        state.check_failure("grant_pull")?;

        if !state.repositories.contains_key(&registry.name) {
            return Err(CloudError::NotFound(format!("repository {}", registry.name)));
        }
        state
            .pull_grants
            .insert((registry.name.clone(), principal.to_string()));
        Ok(())
    }

    async fn authorize_ingress(
        &self,
        security_group_id: &str,
        rule: &IngressRule,
    ) -> CloudResult<()> {
        let mut state = self.state.write();
        state.capture("authorize_ingress", security_group_id);
        state.check_failure("authorize_ingress")?;

        if !state
            .services
            .values()
            .any(|s| s.security_group_id == security_group_id)
        {
            return Err(CloudError::NotFound(format!(
                "security group {}",
                security_group_id
            )));
        }

        let rules = state.ingress.entry(security_group_id.to_string()).or_default();
        if !rules.contains(rule) {
            rules.push(rule.clone());
        }
        Ok(())
    }

    async fn create_listener(&self, spec: &ListenerSpec) -> CloudResult<ListenerHandle> {
        let mut state = self.state.write();
        state.capture("create_listener", &spec.balancer_arn);
        state.check_failure("create_listener")?;

        if !state
            .balancers
            .values()
            .any(|b| b.balancer_arn == spec.balancer_arn)
        {
            return Err(CloudError::NotFound(format!(
                "load balancer {}",
                spec.balancer_arn
            )));
        }

        let key = (spec.balancer_arn.clone(), spec.port);
        if let Some(existing) = state.listeners.get(&key) {
            return Ok(existing.clone());
        }

        let handle = ListenerHandle {
            listener_arn: format!("{}/listener/{:04}", spec.balancer_arn, state.next("listener")),
            balancer_arn: spec.balancer_arn.clone(),
            port: spec.port,
            protocol: spec.protocol,
        };
        state.listeners.insert(key, handle.clone());
        Ok(handle)
    }

    async fn register_targets(
        &self,
        listener: &ListenerHandle,
        spec: &TargetSpec,
    ) -> CloudResult<TargetGroupHandle> {
        spec.validate()?;
        let mut state = self.state.write();
        state.capture("register_targets", &spec.target_group_name);
        state.check_failure("register_targets")?;

        if !state
            .listeners
            .values()
            .any(|l| l.listener_arn == listener.listener_arn)
        {
            return Err(CloudError::NotFound(format!(
                "listener {}",
                listener.listener_arn
            )));
        }
        if listener.port != spec.port {
            return Err(CloudError::InvalidParameter(format!(
                "target group '{}' port {} does not match listener port {}",
                spec.target_group_name, spec.port, listener.port
            )));
        }

        // Converge: at most one registration per (service, balancer) pair.
        let key = (spec.service_arn.clone(), listener.balancer_arn.clone());
        if let Some(existing) = state.target_groups.get(&key) {
            debug!(
                "Target registration for {} on {} already converged",
                spec.service_arn, listener.balancer_arn
            );
            return Ok(existing.clone());
        }

        let sequence = state.next("target-group");
        let handle = TargetGroupHandle {
            target_group_arn: format!(
                "arn:aws:elasticloadbalancing:{}:{}:targetgroup/{}/{:04}",
                self.identity.region, self.identity.account_id, spec.target_group_name, sequence
            ),
            name: spec.target_group_name.clone(),
            balancer_arn: listener.balancer_arn.clone(),
            service_arn: spec.service_arn.clone(),
            port: spec.port,
            health_check: spec.health_check.clone().unwrap_or_default(),
        };
        state.target_groups.insert(key, handle.clone());
        Ok(handle)
    }

    async fn destroy(&self, resource: &ResourceRef) -> CloudResult<()> {
        let mut state = self.state.write();
        state.capture("destroy", resource.to_string());
        state.check_failure("destroy")?;

        match resource.kind {
            ResourceKind::Network => {
                let dependents: Vec<String> = state
                    .clusters
                    .values()
                    .filter(|c| c.network_id == resource.id)
                    .map(|c| c.name.clone())
                    .chain(
                        state
                            .balancers
                            .values()
                            .filter(|b| b.network_id == resource.id)
                            .map(|b| b.name.clone()),
                    )
                    .collect();
                if !dependents.is_empty() {
                    return Err(CloudError::ResourceInUse {
                        resource: resource.to_string(),
                        dependents: dependents.join(", "),
                    });
                }
                let name = state
                    .networks
                    .values()
                    .find(|n| n.network_id == resource.id)
                    .map(|n| n.name.clone())
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.networks.remove(&name);
            }
            ResourceKind::Cluster => {
                let dependents: Vec<String> = state
                    .services
                    .values()
                    .filter(|s| s.cluster_arn == resource.id)
                    .map(|s| s.name.clone())
                    .collect();
                if !dependents.is_empty() {
                    return Err(CloudError::ResourceInUse {
                        resource: resource.to_string(),
                        dependents: dependents.join(", "),
                    });
                }
                let name = state
                    .clusters
                    .values()
                    .find(|c| c.cluster_arn == resource.id)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.clusters.remove(&name);
            }
            ResourceKind::Repository => {
                if !state.repositories.contains_key(&resource.id) {
                    return Err(CloudError::NotFound(resource.to_string()));
                }
                state.repositories.remove(&resource.id);
                state.pull_grants.retain(|(repo, _)| repo != &resource.id);
            }
            ResourceKind::LoadBalancer => {
                let dependents: Vec<String> = state
                    .target_groups
                    .values()
                    .filter(|t| t.balancer_arn == resource.id)
                    .map(|t| t.name.clone())
                    .chain(
                        state
                            .routing_links
                            .get(&resource.id)
                            .map(|l| l.link_id.clone()),
                    )
                    .collect();
                if !dependents.is_empty() {
                    return Err(CloudError::ResourceInUse {
                        resource: resource.to_string(),
                        dependents: dependents.join(", "),
                    });
                }
                let name = state
                    .balancers
                    .values()
                    .find(|b| b.balancer_arn == resource.id)
                    .map(|b| b.name.clone())
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.balancers.remove(&name);
                // Listeners die with their balancer.
                state.listeners.retain(|(arn, _), _| arn != &resource.id);
            }
            ResourceKind::RoutingLink => {
                let key = state
                    .routing_links
                    .iter()
                    .find(|(_, l)| l.link_id == resource.id)
                    .map(|(k, _)| k.clone())
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.routing_links.remove(&key);
            }
            ResourceKind::LogGroup => {
                let group = state
                    .log_groups
                    .get(&resource.id)
                    .cloned()
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                if group.destroy_on_teardown {
                    state.log_groups.remove(&resource.id);
                }
            }
            ResourceKind::TaskDefinition => {
                let task = state
                    .task_definitions
                    .get(&resource.id)
                    .cloned()
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                let dependents: Vec<String> = state
                    .services
                    .values()
                    .filter(|s| s.task_family == task.family)
                    .map(|s| s.name.clone())
                    .collect();
                if !dependents.is_empty() {
                    return Err(CloudError::ResourceInUse {
                        resource: resource.to_string(),
                        dependents: dependents.join(", "),
                    });
                }
                state.task_definitions.remove(&resource.id);
            }
            ResourceKind::Service => {
                let service = state
                    .services
                    .values()
                    .find(|s| s.service_arn == resource.id)
                    .cloned()
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.services.remove(&service.name);
                // Registrations and ingress rules die with their service.
                state
                    .target_groups
                    .retain(|(arn, _), _| arn != &service.service_arn);
                state.ingress.remove(&service.security_group_id);
            }
            ResourceKind::Listener => {
                let key = state
                    .listeners
                    .iter()
                    .find(|(_, l)| l.listener_arn == resource.id)
                    .map(|(k, _)| k.clone())
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.listeners.remove(&key);
            }
            ResourceKind::TargetGroup => {
                let key = state
                    .target_groups
                    .iter()
                    .find(|(_, t)| t.target_group_arn == resource.id)
                    .map(|(k, _)| k.clone())
                    .ok_or_else(|| CloudError::NotFound(resource.to_string()))?;
                state.target_groups.remove(&key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_spec() -> NetworkSpec {
        NetworkSpec::new("ecommerce").az_count(2)
    }

    #[tokio::test]
    async fn test_network_spans_requested_azs() {
        let cloud = MockCloud::new();
        let network = cloud.create_network(&network_spec()).await.unwrap();

        assert_eq!(network.az_count, 2);
        assert_eq!(network.public_subnets.len(), 2);
        assert_eq!(network.private_subnets.len(), 2);
        assert_eq!(network.public_subnets[0].availability_zone, "us-east-1a");
        assert_eq!(network.private_subnets[1].availability_zone, "us-east-1b");
    }

    #[tokio::test]
    async fn test_create_is_converge_idempotent() {
        let cloud = MockCloud::new();
        let first = cloud.create_network(&network_spec()).await.unwrap();
        let second = cloud.create_network(&network_spec()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cloud.live_count(ResourceKind::Network), 1);
        assert_eq!(cloud.call_count("create_network"), 2);
    }

    #[tokio::test]
    async fn test_scripted_quota_failure() {
        let cloud = MockCloud::new().fail_on(
            "create_network",
            CloudError::QuotaExceeded {
                resource: "nat-eip".to_string(),
            },
        );

        let err = cloud.create_network(&network_spec()).await.unwrap_err();
        assert!(matches!(err, CloudError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn test_cluster_requires_live_network() {
        let cloud = MockCloud::new();
        let network = cloud.create_network(&network_spec()).await.unwrap();

        let orphan = ClusterSpec {
            name: "orphan".to_string(),
            network_id: "vpc-9999".to_string(),
            tags: Default::default(),
        };
        assert!(matches!(
            cloud.create_cluster(&orphan).await,
            Err(CloudError::NotFound(_))
        ));

        let bound = ClusterSpec::new("ecommerce", &network);
        let cluster = cloud.create_cluster(&bound).await.unwrap();
        assert_eq!(cluster.network_id, network.network_id);
    }

    #[tokio::test]
    async fn test_routing_link_rejects_application_balancer() {
        let cloud = MockCloud::new();
        let network = cloud.create_network(&network_spec()).await.unwrap();
        let alb = cloud
            .create_load_balancer(&BalancerSpec::new(
                "ECommerceAlb",
                BalancerKind::ApplicationLayer,
                &network,
            ))
            .await
            .unwrap();

        assert!(matches!(
            cloud.create_routing_link(&alb).await,
            Err(CloudError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_destroy_network_in_use() {
        let cloud = MockCloud::new();
        let network = cloud.create_network(&network_spec()).await.unwrap();
        cloud
            .create_cluster(&ClusterSpec::new("ecommerce", &network))
            .await
            .unwrap();

        let err = cloud
            .destroy(&ResourceRef::new(ResourceKind::Network, &network.network_id))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ResourceInUse { .. }));
    }

    #[tokio::test]
    async fn test_destroy_in_reverse_order_succeeds() {
        let cloud = MockCloud::new();
        let network = cloud.create_network(&network_spec()).await.unwrap();
        let cluster = cloud
            .create_cluster(&ClusterSpec::new("ecommerce", &network))
            .await
            .unwrap();

        cloud
            .destroy(&ResourceRef::new(ResourceKind::Cluster, &cluster.cluster_arn))
            .await
            .unwrap();
        cloud
            .destroy(&ResourceRef::new(ResourceKind::Network, &network.network_id))
            .await
            .unwrap();

        assert_eq!(cloud.live_count(ResourceKind::Network), 0);
        assert_eq!(cloud.live_count(ResourceKind::Cluster), 0);
    }
}
