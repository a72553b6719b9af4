//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use splitter_core::{LabelSelector, ObjectKey};

/// Split-and-aggregate reconciler for multi-cluster policies
#[derive(Parser, Debug)]
#[command(name = "policy-splitter")]
#[command(version)]
#[command(about = "Fan policies out to clusters and fold their compliance back in")]
#[command(
    long_about = "Runs the split-and-aggregate reconciler offline against an in-memory store seeded from a fixture, or classifies a single policy document."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile a fixture until it converges and print the result
    Simulate {
        /// Fixture file (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Reconciler config file (TOML, or JSON with a .json extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Upper bound on reconcile passes per phase
        #[arg(long, default_value_t = 10)]
        max_passes: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,

        /// Only print final objects matching this `key=value` label selector
        #[arg(short = 'l', long)]
        selector: Option<LabelSelector>,
    },

    /// Print whether a policy is a root or a leaf
    #[command(group(ArgGroup::new("source").required(true).args(["policy", "fixture"])))]
    Classify {
        /// Policy file (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        policy: Option<PathBuf>,

        /// Fixture to look the policy up in, by `--key`
        #[arg(long, requires = "key")]
        fixture: Option<PathBuf>,

        /// Policy key within the fixture, as `namespace/name`
        #[arg(short, long, requires = "fixture")]
        key: Option<ObjectKey>,

        /// Reconciler config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Rendering of the simulation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}
