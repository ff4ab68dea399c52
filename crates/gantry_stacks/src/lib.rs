//! # gantry_stacks
//!
//! Topology components and composition root for gantry.
//!
//! This crate turns a configuration into a converged cloud topology for a
//! containerized service: a virtual network, an orchestration cluster, an
//! image registry, an internal balancer pair bridged to an external
//! gateway, and the service itself registered as a health-checked target
//! behind both balancers.
//!
//! # Architecture
//!
//! - **Components**: each owns one slice of the topology and returns
//!   immutable handles its dependents consume
//! - **CompositionRoot**: declares the dependency graph, validates it, and
//!   drives provisioning in topological order (teardown in strict reverse)
//! - **Engine**: all cloud effects go through the `CloudEngine` seam from
//!   `gantry_cloud`
//!
//! # Example
//!
//! ```rust,no_run
//! use gantry_cloud::{MockCloud, StaticIdentity};
//! use gantry_stacks::{CompositionRoot, TopologyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TopologyConfig::new("ecommerce", "1.0.0")
//!         .tag("team", "project")
//!         .tag("cost", "ECommerceInfra");
//!
//!     let cloud = MockCloud::new();
//!     let identity = StaticIdentity::new("218821328974", "us-west-1");
//!     let topology = CompositionRoot::new(config)
//!         .provision(&cloud, &identity)
//!         .await?;
//!     assert!(topology.service.is_some());
//!     Ok(())
//! }
//! ```

pub mod balancer;
pub mod cluster;
pub mod error;
pub mod network;
pub mod registry;
pub mod root;
pub mod service;

pub use balancer::{BalancerConfig, BalancerTopology, Balancers};
pub use cluster::ClusterProvisioner;
pub use error::{StackError, StackResult};
pub use network::{NetworkConfig, NetworkTopology};
pub use registry::RegistryProvisioner;
pub use root::{
    CompositionRoot, Topology, TopologyConfig, TopologyFeatures, CLUSTER, LOAD_BALANCERS,
    NETWORK, REGISTRY, SERVICE,
};
pub use service::{ComposedService, ServiceComposer, ServiceConfig};
