//! Cloud engine trait.
//!
//! The engine is the external reconciliation collaborator: it converges
//! each declared spec to the desired state and hands back an immutable
//! handle. All operations are expected to be idempotent; re-declaring an
//! identically-named resource returns the existing handle. This system
//! never retries or polls; execution semantics belong to the engine.

use async_trait::async_trait;

use crate::error::CloudResult;
use crate::types::{
    BalancerHandle, BalancerSpec, ClusterHandle, ClusterSpec, IngressRule, ListenerHandle,
    ListenerSpec, LogGroupHandle, LogGroupSpec, NetworkHandle, NetworkSpec, RegistryHandle,
    RepositorySpec, ResourceRef, RoutingLink, ServiceHandle, ServiceSpec, TargetGroupHandle,
    TargetSpec, TaskDefHandle, TaskSpec,
};

/// Reconciliation engine for cloud resources.
#[async_trait]
pub trait CloudEngine: Send + Sync {
    /// Converge a virtual network with subnets across availability zones.
    async fn create_network(&self, spec: &NetworkSpec) -> CloudResult<NetworkHandle>;

    /// Converge an orchestration cluster bound to a network.
    async fn create_cluster(&self, spec: &ClusterSpec) -> CloudResult<ClusterHandle>;

    /// Converge an image repository. Account-scoped; no network required.
    async fn create_repository(&self, spec: &RepositorySpec) -> CloudResult<RegistryHandle>;

    /// Converge a load balancer attached to a network.
    async fn create_load_balancer(&self, spec: &BalancerSpec) -> CloudResult<BalancerHandle>;

    /// Bridge a network-layer balancer to the external gateway.
    ///
    /// Only network-layer balancers can be bridged; anything else is an
    /// invalid parameter.
    async fn create_routing_link(&self, balancer: &BalancerHandle) -> CloudResult<RoutingLink>;

    /// Converge a log group used as a service's logging sink.
    async fn create_log_group(&self, spec: &LogGroupSpec) -> CloudResult<LogGroupHandle>;

    /// Register a task definition from a task spec.
    async fn register_task_definition(&self, spec: &TaskSpec) -> CloudResult<TaskDefHandle>;

    /// Converge a running service from a registered task definition.
    async fn create_service(&self, spec: &ServiceSpec) -> CloudResult<ServiceHandle>;

    /// Grant the principal pull permission on a registry. One-directional
    /// trust; must land before the first task starts.
    async fn grant_pull(&self, registry: &RegistryHandle, principal: &str) -> CloudResult<()>;

    /// Open an inbound rule on a security boundary.
    async fn authorize_ingress(&self, security_group_id: &str, rule: &IngressRule)
        -> CloudResult<()>;

    /// Converge a listener on a balancer.
    async fn create_listener(&self, spec: &ListenerSpec) -> CloudResult<ListenerHandle>;

    /// Register a service as a health-checked target behind a listener.
    ///
    /// At most one registration exists per (service, balancer) pair;
    /// re-registering returns the existing target group.
    async fn register_targets(
        &self,
        listener: &ListenerHandle,
        spec: &TargetSpec,
    ) -> CloudResult<TargetGroupHandle>;

    /// Destroy a resource. Fails with `ResourceInUse` while dependents of
    /// the resource are still live; teardown must walk the reverse of the
    /// provisioning order.
    async fn destroy(&self, resource: &ResourceRef) -> CloudResult<()>;
}
