//! # gantry_cloud
//!
//! Cloud engine seam and resource model for gantry.
//!
//! The real reconciliation engine (the cloud provider's converge loop) is
//! an external collaborator reached through the [`CloudEngine`] trait.
//! This crate defines that seam, the spec/handle value types that travel
//! across it, and an in-memory implementation used by tests and dry-runs.
//!
//! # Architecture
//!
//! - **Engine**: `CloudEngine` trait with converge-idempotent operations
//! - **Types**: immutable handle value objects returned by the engine and
//!   passed by reference between topology components
//! - **Identity**: `IdentityProvider` seam for account/region resolution
//! - **Mock**: capturing in-memory engine with referential integrity
//! - **Manifest**: serializable snapshot of a converged topology
//!
//! # Example
//!
//! ```rust,no_run
//! use gantry_cloud::{CloudEngine, MockCloud, NetworkSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cloud = MockCloud::new();
//!     let network = cloud
//!         .create_network(&NetworkSpec::new("ecommerce").az_count(2))
//!         .await?;
//!     assert_eq!(network.private_subnets.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod mock;
pub mod types;

pub use engine::CloudEngine;
pub use error::{CloudError, CloudResult};
pub use identity::{EnvIdentity, IdentityProvider, StaticIdentity, ACCOUNT_VAR, REGION_VAR};
pub use manifest::{IngressEntry, Manifest, ManifestFormat, ManifestResources};
pub use mock::{CapturedCall, MockCloud};
pub use types::{
    BalancerHandle, BalancerKind, BalancerScheme, BalancerSpec, ClusterHandle, ClusterSpec,
    HealthCheck, IngressRule, IngressSource, ListenerHandle, ListenerSpec, LogGroupHandle,
    LogGroupSpec, NetworkHandle, NetworkSpec, Protocol, PullGrant, RegistryHandle, RepositorySpec,
    ResourceKind, ResourceRef, RoutingLink, ServiceHandle, ServiceSpec, SubnetHandle, SubnetTier,
    TargetGroupHandle, TargetSpec, TaskDefHandle, TaskSpec,
};
