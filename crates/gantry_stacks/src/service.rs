//! Service composition.
//!
//! Composes a running service from a registry, a cluster, and the balancer
//! pair: task specification, application-layer listener, service instance,
//! image pull grant, ingress rule, and one health-checked target
//! registration per balancer. Each step is a precondition for the next;
//! any failure aborts the whole composition with no partial-success state.

use std::collections::BTreeMap;

use gantry_cloud::{
    BalancerKind, CloudEngine, ClusterHandle, HealthCheck, IngressRule, ListenerHandle,
    ListenerSpec, LogGroupHandle, LogGroupSpec, Protocol, RegistryHandle, ServiceHandle,
    ServiceSpec, TargetGroupHandle, TargetSpec, TaskDefHandle, TaskSpec,
};
use gantry_core::DeployContext;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::balancer::Balancers;
use crate::error::{StackError, StackResult};

/// Configuration for the composed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub container_name: String,
    /// The one port shared by the task definition, the ingress rule and
    /// both target registrations
    pub port: u16,
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
    pub env: BTreeMap<String, String>,
    pub health_check: HealthCheck,
    pub log_retention_days: u32,
    pub alb_target_group: String,
    pub nlb_target_group: String,
    /// Listener ports; `None` follows `port`. Setting one explicitly lets
    /// configuration drift be caught by validation instead of routed.
    pub alb_port: Option<u16>,
    pub nlb_port: Option<u16>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            container_name: name.clone(),
            alb_target_group: format!("{}-alb", name),
            nlb_target_group: format!("{}-nlb", name),
            name,
            port: 8080,
            cpu: 512,
            memory_mib: 1024,
            desired_count: 2,
            env: BTreeMap::new(),
            health_check: HealthCheck::default(),
            log_retention_days: 30,
            alb_port: None,
            nlb_port: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
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

    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = check;
        self
    }

    pub fn alb_port(mut self, port: u16) -> Self {
        self.alb_port = Some(port);
        self
    }

    pub fn nlb_port(mut self, port: u16) -> Self {
        self.nlb_port = Some(port);
        self
    }

    /// Reject invalid configurations: the task port, the ingress rule and
    /// both listener ports must agree before anything is declared.
    pub fn validate(&self) -> StackResult<()> {
        if self.port == 0 {
            return Err(StackError::InvalidConfig(format!(
                "service '{}' declares port 0",
                self.name
            )));
        }
        if self.desired_count < 1 {
            return Err(StackError::InvalidConfig(format!(
                "service '{}' declares a desired count of 0",
                self.name
            )));
        }

        let alb_port = self.alb_port.unwrap_or(self.port);
        if alb_port != self.port {
            return Err(StackError::PortMismatch {
                target: self.alb_target_group.clone(),
                declared: alb_port,
                expected: self.port,
            });
        }
        let nlb_port = self.nlb_port.unwrap_or(self.port);
        if nlb_port != self.port {
            return Err(StackError::PortMismatch {
                target: self.nlb_target_group.clone(),
                declared: nlb_port,
                expected: self.port,
            });
        }
        Ok(())
    }
}

/// Everything the composition produced, by handle.
#[derive(Debug, Clone)]
pub struct ComposedService {
    pub service: ServiceHandle,
    pub task: TaskDefHandle,
    pub log_group: LogGroupHandle,
    pub alb_listener: ListenerHandle,
    pub nlb_listener: ListenerHandle,
    pub alb_target: TargetGroupHandle,
    pub nlb_target: TargetGroupHandle,
    pub ingress: IngressRule,
}

/// Composes the service onto the cluster behind both balancers.
#[derive(Debug, Clone)]
pub struct ServiceComposer {
    config: ServiceConfig,
}

impl ServiceComposer {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Reject invalid configurations before any engine call is issued.
    fn validate(&self, balancers: &Balancers) -> StackResult<()> {
        self.config.validate()?;

        if balancers.application.kind != BalancerKind::ApplicationLayer {
            return Err(StackError::InvalidConfig(format!(
                "balancer {} is not application-layer",
                balancers.application.name
            )));
        }
        if balancers.network.kind != BalancerKind::NetworkLayer {
            return Err(StackError::InvalidConfig(format!(
                "balancer {} is not network-layer",
                balancers.network.name
            )));
        }
        Ok(())
    }

    /// Compose the service. Steps run in dependency order; the engine's
    /// rollback/retry contract governs what happens to earlier steps when
    /// a later one fails.
    pub async fn compose(
        &self,
        engine: &dyn CloudEngine,
        ctx: &DeployContext,
        registry: &RegistryHandle,
        cluster: &ClusterHandle,
        balancers: &Balancers,
    ) -> StackResult<ComposedService> {
        self.validate(balancers)?;
        let config = &self.config;
        let port = config.port;

        // 1. Logging sink with bounded retention, removed on teardown.
        let log_group = engine
            .create_log_group(
                &LogGroupSpec::new(&config.name)
                    .retention_days(config.log_retention_days)
                    .tags(ctx.tags.clone()),
            )
            .await?;

        // Task specification: image resolved by tag from the registry.
        let image = registry.image(&ctx.version);
        let mut task_spec = TaskSpec::new(&config.name, &image, log_group.clone())
            .container_name(&config.container_name)
            .port(port)
            .sizing(config.cpu, config.memory_mib)
            .env("SERVER_PORT", port.to_string());
        for (key, value) in &config.env {
            task_spec = task_spec.env(key, value);
        }
        let task = engine.register_task_definition(&task_spec).await?;
        info!("Registered task definition {} ({})", task.family, image);

        // 2. Application-layer listener, plaintext: TLS termination is the
        // external gateway's job.
        let alb_listener = engine
            .create_listener(&ListenerSpec::new(&balancers.application, port, Protocol::Http))
            .await?;

        // 3. Service instance with a fixed replica count.
        let service = engine
            .create_service(
                &ServiceSpec::new(&config.name, cluster, &task)
                    .desired_count(config.desired_count)
                    .tags(ctx.tags.clone()),
            )
            .await?;
        info!(
            "Provisioned service {} ({} replicas) on {}",
            service.name, service.desired_count, cluster.name
        );

        // 4. Pull grant must land before the first task starts.
        engine
            .grant_pull(registry, &service.execution_role_arn)
            .await?;

        // 5. Inbound access on the service port; trust enforcement lives
        // with the balancers and gateway in front.
        let ingress = IngressRule::anywhere(port);
        engine
            .authorize_ingress(&service.security_group_id, &ingress)
            .await?;

        // 6. Health-checked registration behind the application listener.
        let alb_target = engine
            .register_targets(
                &alb_listener,
                &TargetSpec::new(
                    &config.alb_target_group,
                    &service,
                    &config.container_name,
                    port,
                    Protocol::Http,
                )
                .health_check(config.health_check.clone()),
            )
            .await?;

        // 7. Independent layer-4 registration, targeted by container
        // name/port so membership survives task replacement.
        let nlb_listener = engine
            .create_listener(&ListenerSpec::new(&balancers.network, port, Protocol::Tcp))
            .await?;
        let nlb_target = engine
            .register_targets(
                &nlb_listener,
                &TargetSpec::new(
                    &config.nlb_target_group,
                    &service,
                    &config.container_name,
                    port,
                    Protocol::Tcp,
                ),
            )
            .await?;

        info!(
            "Composed service {} behind {} and {}",
            service.name, balancers.application.name, balancers.network.name
        );

        Ok(ComposedService {
            service,
            task,
            log_group,
            alb_listener,
            nlb_listener,
            alb_target,
            nlb_target,
            ingress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::{BalancerConfig, BalancerTopology};
    use gantry_cloud::{MockCloud, NetworkSpec, RepositorySpec};
    use gantry_core::Identity;

    async fn fixtures(cloud: &MockCloud, ctx: &DeployContext) -> (RegistryHandle, ClusterHandle, Balancers) {
        let network = cloud
            .create_network(&NetworkSpec::new("ecommerce").az_count(2))
            .await
            .unwrap();
        let cluster = cloud
            .create_cluster(&gantry_cloud::ClusterSpec::new("ecommerce", &network))
            .await
            .unwrap();
        let registry = cloud
            .create_repository(&RepositorySpec::new("products-service"))
            .await
            .unwrap();
        let balancers = BalancerTopology::new(BalancerConfig::new("ECommerceNlb", "ECommerceAlb"))
            .provision(cloud, ctx, &network)
            .await
            .unwrap();
        (registry, cluster, balancers)
    }

    fn ctx() -> DeployContext {
        DeployContext::new(Identity::new("218821328974", "us-west-1"), "1.0.0")
            .with_tag("team", "project")
    }

    #[tokio::test]
    async fn test_compose_wires_the_full_service() {
        let cloud = MockCloud::new();
        let ctx = ctx();
        let (registry, cluster, balancers) = fixtures(&cloud, &ctx).await;

        let composer = ServiceComposer::new(ServiceConfig::new("products-service"));
        let composed = composer
            .compose(&cloud, &ctx, &registry, &cluster, &balancers)
            .await
            .unwrap();

        assert_eq!(composed.service.desired_count, 2);
        assert_eq!(composed.task.port, 8080);
        assert!(composed.task.task_definition_arn.contains("products-service"));

        // image resolved by tag from the registry
        let grants = cloud.pull_grants();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].principal, composed.service.execution_role_arn);

        // ingress on the service port from anywhere
        let rules = cloud.ingress_rules(&composed.service.security_group_id);
        assert_eq!(rules, vec![IngressRule::anywhere(8080)]);

        // one registration per balancer, both health-checked
        assert_eq!(composed.alb_target.health_check.path, "/actuator/health");
        assert_eq!(composed.alb_target.balancer_arn, balancers.application.balancer_arn);
        assert_eq!(composed.nlb_target.balancer_arn, balancers.network.balancer_arn);
    }

    #[tokio::test]
    async fn test_port_mismatch_rejected_before_any_call() {
        let cloud = MockCloud::new();
        let ctx = ctx();
        let (registry, cluster, balancers) = fixtures(&cloud, &ctx).await;
        let calls_before = cloud.calls().len();

        let composer =
            ServiceComposer::new(ServiceConfig::new("products-service").alb_port(9090));
        let err = composer
            .compose(&cloud, &ctx, &registry, &cluster, &balancers)
            .await
            .unwrap_err();

        assert!(matches!(err, StackError::PortMismatch { declared: 9090, .. }));
        assert_eq!(cloud.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_grant_failure_aborts_composition() {
        let ctx = ctx();
        let cloud = MockCloud::new().fail_on(
            "grant_pull",
            gantry_cloud::CloudError::PermissionDenied {
                resource: "products-service".to_string(),
            },
        );
        let (registry, cluster, balancers) = fixtures(&cloud, &ctx).await;

        let composer = ServiceComposer::new(ServiceConfig::new("products-service"));
        let err = composer
            .compose(&cloud, &ctx, &registry, &cluster, &balancers)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StackError::Cloud(gantry_cloud::CloudError::PermissionDenied { .. })
        ));
        // composition aborted: no target registration was attempted
        assert!(cloud.target_registrations().is_empty());
    }

    #[tokio::test]
    async fn test_server_port_env_follows_port() {
        let cloud = MockCloud::new();
        let ctx = ctx();
        let (registry, cluster, balancers) = fixtures(&cloud, &ctx).await;

        let composer = ServiceComposer::new(ServiceConfig::new("products-service"));
        composer
            .compose(&cloud, &ctx, &registry, &cluster, &balancers)
            .await
            .unwrap();

        // the registered task definition carries the service port
        let task = &cloud.task_definitions()[0];
        assert_eq!(task.port, 8080);
    }
}
