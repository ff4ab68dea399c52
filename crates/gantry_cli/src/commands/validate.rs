//! Validate command - construction-time checks without declaring anything.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gantry_stacks::CompositionRoot;

use crate::config::DeployConfig;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the deployment config file
    #[arg(short, long, default_value = "gantry.toml")]
    pub config: PathBuf,

    /// Application name, used when no config file exists
    #[arg(long)]
    pub app: Option<String>,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    let config = if args.config.exists() {
        DeployConfig::load(&args.config)?
    } else {
        let app = args.app.clone().with_context(|| {
            format!("{} not found and no --app given", args.config.display())
        })?;
        DeployConfig::default_for(app)
    };

    let topology_config = config.into_topology(Some("0.0.0".to_string()))?;
    let root = CompositionRoot::new(topology_config);

    println!("🔍 Validating topology for {}...", root.config().app_name);

    root.config().service.validate()?;
    println!("   ✅ Service ports agree across task, ingress and both targets");

    root.validate()?;
    println!("   ✅ Dependency graph is acyclic and fully satisfied");

    let order = root.graph().provision_order()?;
    println!("   ✅ {} components ordered: {}", order.len(), order.join(" → "));
    Ok(())
}
