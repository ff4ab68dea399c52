//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod graph;
pub mod plan;
pub mod validate;

/// gantry - cloud topology provisioning for containerized services
#[derive(Parser)]
#[command(name = "gantry")]
#[command(version, about = "gantry - cloud topology provisioning for containerized services")]
#[command(long_about = r#"
gantry declares a small cloud topology for a containerized service (a
virtual network, an orchestration cluster, an image registry, an internal
balancer pair bridged to an external gateway, and the service itself)
and converges it in dependency order.

COMMANDS:
  plan      → Dry-run the full composition and write the resulting manifest
  graph     → Print the declared dependency graph in provisioning order
  validate  → Run construction-time checks without declaring anything

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Provisioning error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dry-run the composition and write the manifest
    Plan(plan::PlanArgs),

    /// Print the dependency graph in provisioning order
    Graph(graph::GraphArgs),

    /// Run construction-time validation only
    Validate(validate::ValidateArgs),
}
