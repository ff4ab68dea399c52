//! Serializable snapshot of a converged topology.
//!
//! A manifest is what a dry-run leaves behind: every resource the engine
//! holds, in a stable order, renderable as JSON or YAML and writable to
//! disk for inspection or diffing between runs.

use std::path::Path;

use chrono::{DateTime, Utc};
use gantry_core::Identity;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::CloudResult;
use crate::mock::MockCloud;
use crate::types::{
    BalancerHandle, ClusterHandle, IngressRule, ListenerHandle, LogGroupHandle, NetworkHandle,
    PullGrant, RegistryHandle, RoutingLink, ServiceHandle, TargetGroupHandle, TaskDefHandle,
};

/// Output format for rendered manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    Json,
    Yaml,
}

/// An ingress rule paired with the security group it is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressEntry {
    pub security_group_id: String,
    pub rule: IngressRule,
}

/// All resources held by an engine at snapshot time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestResources {
    pub networks: Vec<NetworkHandle>,
    pub clusters: Vec<ClusterHandle>,
    pub repositories: Vec<RegistryHandle>,
    pub load_balancers: Vec<BalancerHandle>,
    pub routing_links: Vec<RoutingLink>,
    pub log_groups: Vec<LogGroupHandle>,
    pub task_definitions: Vec<TaskDefHandle>,
    pub services: Vec<ServiceHandle>,
    pub listeners: Vec<ListenerHandle>,
    pub target_groups: Vec<TargetGroupHandle>,
    pub ingress: Vec<IngressEntry>,
    pub pull_grants: Vec<PullGrant>,
}

/// Snapshot of a converged topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub identity: Identity,
    pub resources: ManifestResources,
}

impl Manifest {
    /// Snapshot everything an in-memory engine currently holds.
    pub fn from_engine(cloud: &MockCloud, run_id: Uuid) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            identity: cloud.identity().clone(),
            resources: ManifestResources {
                networks: cloud.networks(),
                clusters: cloud.clusters(),
                repositories: cloud.repositories(),
                load_balancers: cloud.balancers(),
                routing_links: cloud.routing_links(),
                log_groups: cloud.log_groups(),
                task_definitions: cloud.task_definitions(),
                services: cloud.services(),
                listeners: cloud.listeners(),
                target_groups: cloud.target_registrations(),
                ingress: cloud
                    .all_ingress_rules()
                    .into_iter()
                    .map(|(security_group_id, rule)| IngressEntry {
                        security_group_id,
                        rule,
                    })
                    .collect(),
                pull_grants: cloud.pull_grants(),
            },
        }
    }

    /// Total number of resources in the snapshot.
    pub fn resource_count(&self) -> usize {
        let r = &self.resources;
        r.networks.len()
            + r.clusters.len()
            + r.repositories.len()
            + r.load_balancers.len()
            + r.routing_links.len()
            + r.log_groups.len()
            + r.task_definitions.len()
            + r.services.len()
            + r.listeners.len()
            + r.target_groups.len()
            + r.ingress.len()
            + r.pull_grants.len()
    }

    /// Render the manifest in the requested format.
    pub fn render(&self, format: ManifestFormat) -> CloudResult<String> {
        match format {
            ManifestFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ManifestFormat::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }

    /// Write the manifest to a file.
    pub fn write(&self, path: &Path, format: ManifestFormat) -> CloudResult<()> {
        std::fs::write(path, self.render(format)?)?;
        info!(
            "Wrote manifest with {} resources to {}",
            self.resource_count(),
            path.display()
        );
        Ok(())
    }
}
