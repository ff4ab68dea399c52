//! Provisioning outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of provisioning one topology component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRecord {
    /// Component name, matching its graph node
    pub component: String,
    /// Identifiers of the resources the component produced
    pub resource_ids: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ProvisionRecord {
    /// Start a record for a component; completion time is stamped by `finish`.
    pub fn start(component: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            component: component.into(),
            resource_ids: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    /// Record a produced resource identifier.
    pub fn with_resource(mut self, id: impl Into<String>) -> Self {
        self.resource_ids.push(id.into());
        self
    }

    /// Stamp the completion time.
    pub fn finish(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_collects_resources() {
        let record = ProvisionRecord::start("network")
            .with_resource("vpc-0001")
            .with_resource("subnet-0001")
            .finish();

        assert_eq!(record.component, "network");
        assert_eq!(record.resource_ids, vec!["vpc-0001", "subnet-0001"]);
        assert!(record.completed_at >= record.started_at);
    }
}
