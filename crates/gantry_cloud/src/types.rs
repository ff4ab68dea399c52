//! Resource specs and handles.
//!
//! Specs describe desired state and are consumed by a [`CloudEngine`];
//! handles are the immutable value objects the engine returns. Handles are
//! the only way cross-component references travel: a dependent component
//! receives the producer's handle at call time, never ambient state.
//!
//! [`CloudEngine`]: crate::engine::CloudEngine

use std::collections::BTreeMap;
use std::sync::OnceLock;

use gantry_core::TagSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CloudError, CloudResult};

/// Load balancer and log group names share the cloud provider's naming
/// rule: start with a letter, then letters/digits/hyphens, at most 32 chars.
fn resource_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{0,31}$").expect("valid pattern"))
}

fn validate_resource_name(name: &str, what: &str) -> CloudResult<()> {
    if resource_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(CloudError::InvalidParameter(format!(
            "{} name '{}' must match [a-zA-Z][a-zA-Z0-9-]{{0,31}}",
            what, name
        )))
    }
}

/// Kinds of resource an engine can hold, used for teardown references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Cluster,
    Repository,
    LoadBalancer,
    RoutingLink,
    LogGroup,
    TaskDefinition,
    Service,
    Listener,
    TargetGroup,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Repository => "repository",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::RoutingLink => "routing_link",
            ResourceKind::LogGroup => "log_group",
            ResourceKind::TaskDefinition => "task_definition",
            ResourceKind::Service => "service",
            ResourceKind::Listener => "listener",
            ResourceKind::TargetGroup => "target_group",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a provisioned resource, used when destroying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Subnet reachability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    Public,
    Private,
}

/// A provisioned subnet within one availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetHandle {
    pub subnet_id: String,
    pub tier: SubnetTier,
    pub availability_zone: String,
}

/// Desired state of a virtual network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Number of availability zones to spread subnets across
    pub az_count: u32,
    /// NAT egress from private subnets. Cost-bearing; switching it off
    /// trades private-subnet internet egress for a smaller bill.
    pub nat_egress: bool,
    pub tags: TagSet,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            az_count: 2,
            nat_egress: true,
            tags: TagSet::new(),
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

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Validate the spec before any engine call.
    pub fn validate(&self) -> CloudResult<()> {
        validate_resource_name(&self.name, "network")?;
        if self.az_count < 1 {
            return Err(CloudError::InvalidParameter(format!(
                "network '{}' requires at least one availability zone",
                self.name
            )));
        }
        Ok(())
    }
}

/// A provisioned virtual network with its subnet set. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHandle {
    pub network_id: String,
    pub name: String,
    pub az_count: u32,
    pub public_subnets: Vec<SubnetHandle>,
    pub private_subnets: Vec<SubnetHandle>,
    pub nat_egress: bool,
}

/// Desired state of an orchestration cluster bound to one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub network_id: String,
    pub tags: TagSet,
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>, network: &NetworkHandle) -> Self {
        Self {
            name: name.into(),
            network_id: network.network_id.clone(),
            tags: TagSet::new(),
        }
    }

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }
}

/// A provisioned cluster. Immutable; consumed by the service composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHandle {
    pub cluster_arn: String,
    pub name: String,
    pub network_id: String,
}

/// Desired state of an image repository. Account-scoped: deliberately no
/// network reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub name: String,
    pub tags: TagSet,
}

impl RepositorySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: TagSet::new(),
        }
    }

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }
}

/// A provisioned image registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryHandle {
    pub repository_arn: String,
    pub repository_uri: String,
    pub name: String,
}

impl RegistryHandle {
    /// Resolve a concrete image reference from this registry by tag.
    pub fn image(&self, tag: &str) -> String {
        format!("{}:{}", self.repository_uri, tag)
    }
}

/// Traffic distribution layer of a balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerKind {
    NetworkLayer,
    ApplicationLayer,
}

impl BalancerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalancerKind::NetworkLayer => "network",
            BalancerKind::ApplicationLayer => "application",
        }
    }
}

impl std::fmt::Display for BalancerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reachability scope of a balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerScheme {
    Internal,
    InternetFacing,
}

/// Desired state of a load balancer attached to a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerSpec {
    pub name: String,
    pub kind: BalancerKind,
    pub scheme: BalancerScheme,
    pub network_id: String,
    pub tags: TagSet,
}

impl BalancerSpec {
    pub fn new(name: impl Into<String>, kind: BalancerKind, network: &NetworkHandle) -> Self {
        Self {
            name: name.into(),
            kind,
            scheme: BalancerScheme::Internal,
            network_id: network.network_id.clone(),
            tags: TagSet::new(),
        }
    }

    pub fn internet_facing(mut self) -> Self {
        self.scheme = BalancerScheme::InternetFacing;
        self
    }

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn validate(&self) -> CloudResult<()> {
        validate_resource_name(&self.name, "load balancer")
    }
}

/// A provisioned load balancer. Carries the network it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerHandle {
    pub balancer_arn: String,
    pub name: String,
    pub kind: BalancerKind,
    pub scheme: BalancerScheme,
    pub network_id: String,
}

/// Bridge from a network-layer balancer to an external gateway
/// integration point. Derived artifact; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingLink {
    pub link_id: String,
    pub balancer_arn: String,
}

/// Desired state of a log group acting as the service's logging sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogGroupSpec {
    pub name: String,
    /// Bounded retention window; logs age out after this many days
    pub retention_days: u32,
    /// Remove the group on teardown instead of orphaning it
    pub destroy_on_teardown: bool,
    pub tags: TagSet,
}

impl LogGroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retention_days: 30,
            destroy_on_teardown: true,
            tags: TagSet::new(),
        }
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn validate(&self) -> CloudResult<()> {
        validate_resource_name(&self.name, "log group")
    }
}

/// A provisioned log group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupHandle {
    pub name: String,
    pub retention_days: u32,
    pub destroy_on_teardown: bool,
}

/// Wire protocol for listeners and target registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Http => "http",
        }
    }
}

/// CPU/memory reservation tiers the task scheduler accepts.
const SIZING_TIERS: &[(u32, u32)] = &[(256, 512), (512, 1024), (1024, 2048), (2048, 4096)];

/// Desired state of a single task: image, port, sizing, environment and
/// logging sink. Built once by the service composer; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub family: String,
    pub container_name: String,
    /// Fully-resolved image reference (repository URI + tag)
    pub image: String,
    pub port: u16,
    pub cpu: u32,
    pub memory_mib: u32,
    pub env: BTreeMap<String, String>,
    pub log_group: LogGroupHandle,
    /// Log stream prefix within the group
    pub stream_prefix: String,
}

impl TaskSpec {
    pub fn new(
        family: impl Into<String>,
        image: impl Into<String>,
        log_group: LogGroupHandle,
    ) -> Self {
        let family = family.into();
        Self {
            container_name: family.clone(),
            stream_prefix: family.clone(),
            family,
            image: image.into(),
            port: 8080,
            cpu: 512,
            memory_mib: 1024,
            env: BTreeMap::new(),
            log_group,
        }
    }

    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn sizing(mut self, cpu: u32, memory_mib: u32) -> Self {
        self.cpu = cpu;
        self.memory_mib = memory_mib;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn stream_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.stream_prefix = prefix.into();
        self
    }

    /// Validate the spec before any engine call.
    pub fn validate(&self) -> CloudResult<()> {
        if self.port == 0 {
            return Err(CloudError::InvalidParameter(format!(
                "task family '{}' declares port 0",
                self.family
            )));
        }
        if !SIZING_TIERS.contains(&(self.cpu, self.memory_mib)) {
            return Err(CloudError::InvalidParameter(format!(
                "task family '{}' declares unsupported sizing {}cpu/{}MiB",
                self.family, self.cpu, self.memory_mib
            )));
        }
        Ok(())
    }
}

/// A registered task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefHandle {
    pub task_definition_arn: String,
    pub family: String,
    pub container_name: String,
    pub port: u16,
}

/// Desired state of a running service on a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub cluster_arn: String,
    pub task_definition_arn: String,
    pub desired_count: u32,
    pub tags: TagSet,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, cluster: &ClusterHandle, task: &TaskDefHandle) -> Self {
        Self {
            name: name.into(),
            cluster_arn: cluster.cluster_arn.clone(),
            task_definition_arn: task.task_definition_arn.clone(),
            desired_count: 2,
            tags: TagSet::new(),
        }
    }

    pub fn desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
        self
    }

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }
}

/// A running service instance with its network security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHandle {
    pub service_arn: String,
    pub name: String,
    pub cluster_arn: String,
    pub task_family: String,
    /// Security boundary ingress rules attach to
    pub security_group_id: String,
    pub desired_count: u32,
    /// Identity the scheduler uses to pull the image
    pub execution_role_arn: String,
}

/// Source of inbound traffic for an ingress rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngressSource {
    Anywhere,
    Cidr(String),
}

/// Inbound rule on a service's security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub port: u16,
    pub protocol: Protocol,
    pub source: IngressSource,
}

impl IngressRule {
    /// Allow inbound TCP on `port` from any source. Trust enforcement is
    /// pushed to the balancers and gateway in front of the service.
    pub fn anywhere(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Tcp,
            source: IngressSource::Anywhere,
        }
    }
}

/// Health-check policy attached to a target registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    /// Grace period so in-flight connections drain before a replaced task
    /// leaves rotation
    pub deregistration_delay_secs: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/actuator/health".to_string(),
            interval_secs: 30,
            timeout_secs: 10,
            deregistration_delay_secs: 30,
        }
    }
}

/// Desired state of a listener on a balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub balancer_arn: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl ListenerSpec {
    pub fn new(balancer: &BalancerHandle, port: u16, protocol: Protocol) -> Self {
        Self {
            balancer_arn: balancer.balancer_arn.clone(),
            port,
            protocol,
        }
    }
}

/// A provisioned listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerHandle {
    pub listener_arn: String,
    pub balancer_arn: String,
    pub port: u16,
    pub protocol: Protocol,
}

/// Binding of a service to a listener, targeted by container name/port so
/// membership survives task replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub target_group_name: String,
    pub service_arn: String,
    pub container_name: String,
    pub container_port: u16,
    pub port: u16,
    pub protocol: Protocol,
    pub health_check: Option<HealthCheck>,
}

impl TargetSpec {
    pub fn new(
        target_group_name: impl Into<String>,
        service: &ServiceHandle,
        container_name: impl Into<String>,
        port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            target_group_name: target_group_name.into(),
            service_arn: service.service_arn.clone(),
            container_name: container_name.into(),
            container_port: port,
            port,
            protocol,
            health_check: None,
        }
    }

    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = Some(check);
        self
    }

    pub fn validate(&self) -> CloudResult<()> {
        validate_resource_name(&self.target_group_name, "target group")?;
        if self.port != self.container_port {
            return Err(CloudError::InvalidParameter(format!(
                "target group '{}' port {} does not match container port {}",
                self.target_group_name, self.port, self.container_port
            )));
        }
        Ok(())
    }
}

/// A target group binding one service to one balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupHandle {
    pub target_group_arn: String,
    pub name: String,
    pub balancer_arn: String,
    pub service_arn: String,
    pub port: u16,
    pub health_check: HealthCheck,
}

/// A pull-permission grant from a service execution identity to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullGrant {
    pub repository: String,
    pub principal: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_group() -> LogGroupHandle {
        LogGroupHandle {
            name: "products-service".to_string(),
            retention_days: 30,
            destroy_on_teardown: true,
        }
    }

    #[test]
    fn test_network_spec_requires_an_az() {
        let spec = NetworkSpec::new("ecommerce").az_count(0);
        assert!(matches!(
            spec.validate(),
            Err(CloudError::InvalidParameter(_))
        ));

        assert!(NetworkSpec::new("ecommerce").az_count(1).validate().is_ok());
    }

    #[test]
    fn test_balancer_name_rules() {
        let network = NetworkHandle {
            network_id: "vpc-0001".to_string(),
            name: "ecommerce".to_string(),
            az_count: 2,
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
            nat_egress: true,
        };

        let ok = BalancerSpec::new("ECommerceNlb", BalancerKind::NetworkLayer, &network);
        assert!(ok.validate().is_ok());

        let bad = BalancerSpec::new("9starts-with-digit", BalancerKind::NetworkLayer, &network);
        assert!(bad.validate().is_err());

        let too_long = BalancerSpec::new(
            "a-very-long-name-that-exceeds-the-limit",
            BalancerKind::ApplicationLayer,
            &network,
        );
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_task_spec_defaults_and_sizing() {
        let spec = TaskSpec::new("products-service", "uri:1.0.0", log_group());
        assert_eq!(spec.port, 8080);
        assert_eq!(spec.cpu, 512);
        assert_eq!(spec.memory_mib, 1024);
        assert!(spec.validate().is_ok());

        let odd = TaskSpec::new("products-service", "uri:1.0.0", log_group()).sizing(300, 900);
        assert!(odd.validate().is_err());
    }

    #[test]
    fn test_registry_image_resolution() {
        let registry = RegistryHandle {
            repository_arn: "arn:aws:ecr:us-west-1:123:repository/products-service".to_string(),
            repository_uri: "123.dkr.ecr.us-west-1.amazonaws.com/products-service".to_string(),
            name: "products-service".to_string(),
        };
        assert_eq!(
            registry.image("1.0.0"),
            "123.dkr.ecr.us-west-1.amazonaws.com/products-service:1.0.0"
        );
    }

    #[test]
    fn test_target_spec_port_agreement() {
        let service = ServiceHandle {
            service_arn: "arn:svc".to_string(),
            name: "products".to_string(),
            cluster_arn: "arn:cluster".to_string(),
            task_family: "products-service".to_string(),
            security_group_id: "sg-0001".to_string(),
            desired_count: 2,
            execution_role_arn: "arn:role".to_string(),
        };

        let mut spec = TargetSpec::new("productServiceAlb", &service, "products", 8080, Protocol::Http);
        assert!(spec.validate().is_ok());

        spec.container_port = 9090;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_health_check_defaults() {
        let check = HealthCheck::default();
        assert_eq!(check.path, "/actuator/health");
        assert_eq!(check.interval_secs, 30);
        assert_eq!(check.timeout_secs, 10);
        assert_eq!(check.deregistration_delay_secs, 30);
    }
}
