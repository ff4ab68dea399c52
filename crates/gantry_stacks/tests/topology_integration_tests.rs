//! Integration tests for the full topology composition.

use gantry_cloud::{
    BalancerKind, CloudEngine, CloudError, CloudResult, IdentityProvider, IngressRule,
    IngressSource, MockCloud, ResourceKind, ResourceRef, StaticIdentity,
};
use gantry_core::Identity;
use gantry_stacks::{
    CompositionRoot, ServiceConfig, StackError, TopologyConfig, TopologyFeatures, SERVICE,
};

fn config() -> TopologyConfig {
    TopologyConfig::new("ecommerce", "1.0.0")
        .tag("team", "project")
        .tag("cost", "ECommerceInfra")
        .service(ServiceConfig::new("products-service"))
}

fn identity() -> StaticIdentity {
    StaticIdentity::new("218821328974", "us-west-1")
}

#[tokio::test]
async fn end_to_end_topology() {
    let cloud = MockCloud::with_identity(Identity::new("218821328974", "us-west-1"));
    let root = CompositionRoot::new(config());

    let topology = root.provision(&cloud, &identity()).await.unwrap();

    // one network spanning both requested zones
    let network = topology.network.as_ref().unwrap();
    assert_eq!(network.az_count, 2);
    assert_eq!(network.private_subnets.len(), 2);

    // exactly one service with two replicas
    let composed = topology.service.as_ref().unwrap();
    assert_eq!(cloud.services().len(), 1);
    assert_eq!(composed.service.desired_count, 2);

    // two registrations, one per balancer kind
    let registrations = cloud.target_registrations();
    assert_eq!(registrations.len(), 2);
    let balancers = topology.balancers.as_ref().unwrap();
    assert!(registrations
        .iter()
        .any(|t| t.balancer_arn == balancers.application.balancer_arn));
    assert!(registrations
        .iter()
        .any(|t| t.balancer_arn == balancers.network.balancer_arn));
    assert_eq!(balancers.application.kind, BalancerKind::ApplicationLayer);
    assert_eq!(balancers.network.kind, BalancerKind::NetworkLayer);

    // one ingress rule: port 8080 from any source
    let rules = cloud.ingress_rules(&composed.service.security_group_id);
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].port, 8080);
    assert_eq!(rules[0].source, IngressSource::Anywhere);

    // one pull grant, from the execution identity to the registry
    let grants = cloud.pull_grants();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].repository, "products-service");
    assert_eq!(grants[0].principal, composed.service.execution_role_arn);

    // image resolved by tag through the registry
    assert!(composed.task.task_definition_arn.contains("products-service"));
}

#[tokio::test]
async fn composing_twice_registers_nothing_extra() {
    let cloud = MockCloud::new();
    let root = CompositionRoot::new(config());

    let first = root.provision(&cloud, &identity()).await.unwrap();
    let second = root.provision(&cloud, &identity()).await.unwrap();

    // converge: same handles, no duplicate registrations
    assert_eq!(cloud.target_registrations().len(), 2);
    assert_eq!(cloud.services().len(), 1);
    assert_eq!(cloud.networks().len(), 1);
    assert_eq!(
        first.service.unwrap().service.service_arn,
        second.service.unwrap().service.service_arn
    );
}

#[tokio::test]
async fn port_mismatch_issues_no_engine_call() {
    let cloud = MockCloud::new();
    let root = CompositionRoot::new(
        config().service(ServiceConfig::new("products-service").nlb_port(9090)),
    );

    let err = root.provision(&cloud, &identity()).await.unwrap_err();

    assert!(matches!(err, StackError::PortMismatch { .. }));
    // nothing was declared: the mismatch is a build-time defect
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn dependency_graph_is_acyclic_and_ordered() {
    let root = CompositionRoot::new(config());
    let graph = root.graph();

    let order = graph.provision_order().unwrap();
    let service_pos = order.iter().position(|n| n == SERVICE).unwrap();
    for dependency in graph.dependencies_of(SERVICE).unwrap() {
        let dep_pos = order.iter().position(|n| n == &dependency).unwrap();
        assert!(dep_pos < service_pos, "{} must precede service", dependency);
    }

    // transitive reach down to the network
    let ancestors = graph.ancestors(SERVICE).unwrap();
    assert!(ancestors.contains("network"));
}

#[tokio::test]
async fn teardown_follows_strict_reverse_order() {
    let cloud = MockCloud::new();
    let root = CompositionRoot::new(config());
    let topology = root.provision(&cloud, &identity()).await.unwrap();

    // destroying the network first is rejected while dependents live
    let network_id = topology.network.as_ref().unwrap().network_id.clone();
    let err = cloud
        .destroy(&ResourceRef::new(ResourceKind::Network, &network_id))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::ResourceInUse { .. }));

    // reverse-order teardown drains everything
    root.teardown(&cloud, &topology).await.unwrap();
    assert_eq!(cloud.live_count(ResourceKind::Network), 0);
    assert_eq!(cloud.live_count(ResourceKind::Cluster), 0);
    assert_eq!(cloud.live_count(ResourceKind::LoadBalancer), 0);
    assert_eq!(cloud.live_count(ResourceKind::Service), 0);
    assert_eq!(cloud.live_count(ResourceKind::TargetGroup), 0);
    assert_eq!(cloud.live_count(ResourceKind::Repository), 0);
}

#[tokio::test]
async fn identity_failure_halts_before_any_declaration() {
    struct NoCredentials;

    impl IdentityProvider for NoCredentials {
        fn resolve(&self) -> CloudResult<Identity> {
            Err(CloudError::Identity("no credential source".to_string()))
        }
    }

    let cloud = MockCloud::new();
    let root = CompositionRoot::new(config());

    let err = root.provision(&cloud, &NoCredentials).await.unwrap_err();
    assert!(matches!(err, StackError::Cloud(CloudError::Identity(_))));
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn quota_failure_surfaces_with_resource_identity() {
    let cloud = MockCloud::new().fail_on(
        "create_network",
        CloudError::QuotaExceeded {
            resource: "nat-eip".to_string(),
        },
    );
    let root = CompositionRoot::new(config());

    let err = root.provision(&cloud, &identity()).await.unwrap_err();
    match err {
        StackError::Cloud(CloudError::QuotaExceeded { resource }) => {
            assert_eq!(resource, "nat-eip");
        }
        other => panic!("expected quota failure, got {}", other),
    }
    // no component past the network was attempted
    assert_eq!(cloud.call_count("create_cluster"), 0);
    assert_eq!(cloud.call_count("create_service"), 0);
}

#[tokio::test]
async fn disabled_service_leaves_core_infrastructure() {
    let cloud = MockCloud::new();
    let root = CompositionRoot::new(config().features(TopologyFeatures::without_service()));

    let topology = root.provision(&cloud, &identity()).await.unwrap();

    assert!(topology.network.is_some());
    assert!(topology.cluster.is_some());
    assert!(topology.balancers.is_some());
    assert!(topology.service.is_none());
    assert!(cloud.services().is_empty());
    // registry is always provisioned
    assert_eq!(topology.registries.len(), 1);
}

#[tokio::test]
async fn ingress_rule_agrees_with_task_port() {
    let cloud = MockCloud::new();
    let root = CompositionRoot::new(config());
    let topology = root.provision(&cloud, &identity()).await.unwrap();

    let composed = topology.service.unwrap();
    let rules = cloud.ingress_rules(&composed.service.security_group_id);

    assert_eq!(rules, vec![IngressRule::anywhere(composed.task.port)]);
    for target in cloud.target_registrations() {
        assert_eq!(target.port, composed.task.port);
    }
}
