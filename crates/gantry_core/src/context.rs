//! Deployment context threaded through every topology component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved deployer identity: cloud account and region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: String,
    pub region: String,
}

impl Identity {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account_id, self.region)
    }
}

/// Cost-attribution tags applied to every provisioned resource.
///
/// Ordered so that rendered manifests are stable across runs.
pub type TagSet = BTreeMap<String, String>;

/// Deployment context containing all execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployContext {
    /// Unique id for this convergence run
    pub run_id: Uuid,
    /// Resolved deployer identity
    pub identity: Identity,
    /// Tags merged onto every resource
    pub tags: TagSet,
    /// Image tag/version the service is deployed at
    pub version: String,
}

impl DeployContext {
    /// Create a new deployment context.
    pub fn new(identity: Identity, version: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            identity,
            tags: TagSet::new(),
            version: version.into(),
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merge a set of tags. Existing keys are overwritten.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Look up a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }
}
