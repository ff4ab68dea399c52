//! # gantry_core
//!
//! Dependency graph and deployment context for gantry.
//!
//! This crate provides the resource graph, deployment context, and
//! provisioning records that the topology components build on.
//!
//! # Architecture
//!
//! - **Graph**: Declared dependency edges between named resources, with
//!   deterministic provisioning order and strict-reverse teardown order
//! - **Context**: Resolved deployer identity, cost-attribution tags, and
//!   the image version threaded through every component
//! - **Records**: Per-component provisioning outcomes for reporting
//!
//! # Example
//!
//! ```rust
//! use gantry_core::ResourceGraph;
//!
//! let mut graph = ResourceGraph::new();
//! graph.add("network");
//! graph.add("cluster");
//! graph.depends_on("cluster", "network");
//!
//! let order = graph.provision_order().unwrap();
//! assert_eq!(order, vec!["network".to_string(), "cluster".to_string()]);
//! ```

pub mod context;
pub mod error;
pub mod graph;
pub mod result;

// Re-export main types for convenience
pub use context::{DeployContext, Identity, TagSet};
pub use error::{CoreError, CoreResult};
pub use graph::ResourceGraph;
pub use result::ProvisionRecord;
