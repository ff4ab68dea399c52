//! Graph command - print the dependency graph in provisioning order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gantry_stacks::CompositionRoot;

use crate::config::DeployConfig;

#[derive(Args)]
pub struct GraphArgs {
    /// Path to the deployment config file
    #[arg(short, long, default_value = "gantry.toml")]
    pub config: PathBuf,

    /// Application name, used when no config file exists
    #[arg(long)]
    pub app: Option<String>,
}

pub async fn execute(args: GraphArgs) -> Result<()> {
    let config = if args.config.exists() {
        DeployConfig::load(&args.config)?
    } else {
        let app = args.app.clone().with_context(|| {
            format!("{} not found and no --app given", args.config.display())
        })?;
        DeployConfig::default_for(app)
    };

    // the graph does not depend on the image version
    let topology_config = config.into_topology(Some("0.0.0".to_string()))?;
    let root = CompositionRoot::new(topology_config);
    let graph = root.graph();
    let order = graph.provision_order()?;

    println!("🗺  Provisioning order for {}:", root.config().app_name);
    for (index, node) in order.iter().enumerate() {
        let dependencies = graph.dependencies_of(node)?;
        if dependencies.is_empty() {
            println!("   {}. {}", index + 1, node);
        } else {
            println!("   {}. {} (after: {})", index + 1, node, dependencies.join(", "));
        }
    }
    println!("Teardown walks this order in strict reverse.");
    Ok(())
}
