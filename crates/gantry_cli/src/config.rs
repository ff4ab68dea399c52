//! Deployment configuration file.
//!
//! `gantry.toml` carries the knobs an operator actually turns between
//! runs; everything else keeps its topology default. CLI arguments and
//! environment variables override file values.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gantry_cloud::HealthCheck;
use gantry_stacks::{NetworkConfig, ServiceConfig, TopologyConfig, TopologyFeatures};

/// Feature toggles as written in the config file; unset means enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub network: Option<bool>,
    pub cluster: Option<bool>,
    pub load_balancers: Option<bool>,
    pub service: Option<bool>,
}

impl FeatureToggles {
    fn resolve(&self) -> TopologyFeatures {
        let all = TopologyFeatures::all();
        TopologyFeatures {
            network: self.network.unwrap_or(all.network),
            cluster: self.cluster.unwrap_or(all.cluster),
            load_balancers: self.load_balancers.unwrap_or(all.load_balancers),
            service: self.service.unwrap_or(all.service),
        }
    }
}

/// Deployment configuration loaded from `gantry.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub app_name: String,
    pub service_name: Option<String>,
    /// Image tag to deploy; overridable with `--version`
    pub version: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub az_count: Option<u32>,
    pub nat_egress: Option<bool>,
    pub port: Option<u16>,
    pub desired_count: Option<u32>,
    pub health_check_path: Option<String>,
    #[serde(default)]
    pub features: FeatureToggles,
}

impl DeployConfig {
    /// Defaults for an app with no config file.
    pub fn default_for(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            service_name: None,
            version: None,
            tags: BTreeMap::new(),
            az_count: None,
            nat_egress: None,
            port: None,
            desired_count: None,
            health_check_path: None,
            features: FeatureToggles::default(),
        }
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: DeployConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Resolve into the full topology configuration.
    pub fn into_topology(self, version_override: Option<String>) -> Result<TopologyConfig> {
        let version = version_override
            .or(self.version)
            .context("no image version: set `version` in gantry.toml or pass --version")?;

        let mut network = NetworkConfig::new(format!("{}-vpc", self.app_name));
        if let Some(az_count) = self.az_count {
            network = network.az_count(az_count);
        }
        if self.nat_egress == Some(false) {
            network = network.without_nat();
        }

        let service_name = self
            .service_name
            .unwrap_or_else(|| format!("{}-service", self.app_name));
        let mut service = ServiceConfig::new(service_name);
        if let Some(port) = self.port {
            service = service.port(port);
        }
        if let Some(count) = self.desired_count {
            service = service.desired_count(count);
        }
        if let Some(path) = self.health_check_path {
            service = service.health_check(HealthCheck {
                path,
                ..HealthCheck::default()
            });
        }

        let mut topology = TopologyConfig::new(self.app_name, version)
            .network(network)
            .service(service)
            .features(self.features.resolve());
        for (key, value) in self.tags {
            topology = topology.tag(key, value);
        }
        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            app_name = "ecommerce"
            service_name = "products-service"
            version = "1.0.0"
            az_count = 2
            port = 8080
            desired_count = 2
            health_check_path = "/actuator/health"

            [tags]
            team = "project"
            cost = "ECommerceInfra"

            [features]
            service = false
        "#;

        let config: DeployConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.app_name, "ecommerce");
        assert_eq!(config.tags.get("team").map(String::as_str), Some("project"));

        let topology = config.into_topology(None).unwrap();
        assert_eq!(topology.version, "1.0.0");
        assert_eq!(topology.service.name, "products-service");
        assert!(!topology.features.service);
        assert!(topology.features.network);
    }

    #[test]
    fn test_version_override_wins() {
        let config = DeployConfig {
            version: Some("1.0.0".to_string()),
            ..DeployConfig::default_for("ecommerce")
        };
        let topology = config.into_topology(Some("2.0.0".to_string())).unwrap();
        assert_eq!(topology.version, "2.0.0");
    }

    #[test]
    fn test_missing_version_is_an_error() {
        let config = DeployConfig::default_for("ecommerce");
        assert!(config.into_topology(None).is_err());
    }

    #[test]
    fn test_nat_opt_out() {
        let config = DeployConfig {
            version: Some("1.0.0".to_string()),
            nat_egress: Some(false),
            ..DeployConfig::default_for("ecommerce")
        };
        let topology = config.into_topology(None).unwrap();
        assert!(!topology.network.nat_egress);
    }
}
