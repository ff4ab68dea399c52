//! Plan command - dry-run the composition and emit a manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use gantry_cloud::{
    EnvIdentity, IdentityProvider, Manifest, ManifestFormat, MockCloud, StaticIdentity,
};
use gantry_core::Identity;
use gantry_stacks::CompositionRoot;

use crate::config::DeployConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl From<OutputFormat> for ManifestFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ManifestFormat::Json,
            OutputFormat::Yaml => ManifestFormat::Yaml,
        }
    }
}

#[derive(Args)]
pub struct PlanArgs {
    /// Path to the deployment config file
    #[arg(short, long, default_value = "gantry.toml")]
    pub config: PathBuf,

    /// Application name, used when no config file exists
    #[arg(long)]
    pub app: Option<String>,

    /// Image tag to deploy (overrides the config file)
    #[arg(long)]
    pub version: Option<String>,

    /// Cloud account id
    #[arg(long, env = "GANTRY_ACCOUNT_ID")]
    pub account: Option<String>,

    /// Cloud region
    #[arg(long, env = "GANTRY_REGION")]
    pub region: Option<String>,

    /// Write the manifest to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Manifest output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

fn resolve_identity(account: Option<String>, region: Option<String>) -> Result<Identity> {
    match (account, region) {
        (Some(account), Some(region)) => Ok(Identity::new(account, region)),
        _ => Ok(EnvIdentity::new().resolve()?),
    }
}

pub async fn execute(args: PlanArgs) -> Result<()> {
    let config = if args.config.exists() {
        DeployConfig::load(&args.config)?
    } else {
        let app = args.app.clone().with_context(|| {
            format!("{} not found and no --app given", args.config.display())
        })?;
        DeployConfig::default_for(app)
    };

    let topology_config = config.into_topology(args.version.clone())?;
    let identity = resolve_identity(args.account.clone(), args.region.clone())?;
    info!("Planning {} as {}", topology_config.app_name, identity);

    let cloud = MockCloud::with_identity(identity.clone());
    let provider = StaticIdentity::new(identity.account_id, identity.region);
    let root = CompositionRoot::new(topology_config);

    let topology = root.provision(&cloud, &provider).await?;
    let manifest = Manifest::from_engine(&cloud, topology.run_id);

    println!(
        "📦 Planned {} resources across {} components",
        manifest.resource_count(),
        topology.records.len()
    );
    for record in &topology.records {
        println!("   ✅ {} ({} resources)", record.component, record.resource_ids.len());
    }

    match &args.output {
        Some(path) => {
            manifest.write(path, args.format.into())?;
            println!("   📄 Manifest written to {}", path.display());
        }
        None => println!("{}", manifest.render(args.format.into())?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_plan_writes_manifest() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("plan.json");

        let args = PlanArgs {
            config: dir.path().join("gantry.toml"),
            app: Some("ecommerce".to_string()),
            version: Some("1.0.0".to_string()),
            account: Some("218821328974".to_string()),
            region: Some("us-west-1".to_string()),
            output: Some(output.clone()),
            format: OutputFormat::Json,
        };
        execute(args).await.unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("ecommerce-service"));
        assert!(content.contains("218821328974"));
    }

    #[tokio::test]
    async fn test_plan_requires_identity() {
        std::env::remove_var(gantry_cloud::ACCOUNT_VAR);
        let dir = tempdir().unwrap();

        let args = PlanArgs {
            config: dir.path().join("gantry.toml"),
            app: Some("ecommerce".to_string()),
            version: Some("1.0.0".to_string()),
            account: None,
            region: None,
            output: None,
            format: OutputFormat::Json,
        };
        assert!(execute(args).await.is_err());
    }
}
