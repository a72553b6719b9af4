//! # policy-splitter
//!
//! Command-line entry point.
//!
//! - `simulate` seeds an in-memory store from a fixture and reconciles it
//!   until it converges, then prints the final objects and per-pass summary
//! - `classify` prints the role of a single policy, read from its own
//!   document or looked up by key in a fixture
//!
//! Logs go to stderr so the report on stdout stays machine-readable.
//! Ctrl+C cancels in-flight reconciles; the simulation then stops early.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use policy_splitter::cli::{Cli, Commands, OutputFormat};
use policy_splitter::fixture::{Fixture, load_document};
use policy_splitter::simulate::{SimulationReport, Simulator};
use splitter_core::{LabelSelector, ObjectKey, Policy};
use splitter_reconciler::{CancellationSource, ReconcilerConfig, Role, classify};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            fixture,
            config,
            max_passes,
            output,
            selector,
        } => {
            simulate(
                &fixture,
                config.as_deref(),
                max_passes,
                output,
                selector.as_ref(),
            )
            .await
        }
        Commands::Classify {
            policy,
            fixture,
            key,
            config,
        } => {
            let policy = read_policy(policy, fixture, key)?;
            classify_policy(&policy, config.as_deref())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// File config (if any) overlaid with `SPLITTER_*` environment variables.
fn load_config(path: Option<&Path>) -> Result<ReconcilerConfig> {
    let config = match path {
        Some(path) => ReconcilerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
            .with_env_overrides(|name| std::env::var(name).ok()),
        None => ReconcilerConfig::from_env(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn simulate(
    fixture_path: &Path,
    config_path: Option<&Path>,
    max_passes: usize,
    output: OutputFormat,
    selector: Option<&LabelSelector>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let fixture = Fixture::from_file(fixture_path)?;
    info!(
        clusters = fixture.clusters.len(),
        policies = fixture.policies.len(),
        reports = fixture.reports.len(),
        deletions = fixture.deletions.len(),
        "Loaded fixture"
    );

    let source = CancellationSource::new();
    let cancel = source.token();
    let simulator = Simulator::new(config, max_passes)?;

    tokio::spawn(async move {
        wait_for_shutdown().await;
        source.cancel();
    });

    let mut report = simulator.run(fixture, &cancel).await?;

    if !report.converged {
        warn!(passes = report.passes.len(), "Simulation did not converge");
    }

    if let Some(selector) = selector {
        report.retain_matching(selector);
    }

    print_report(&report, output)
}

fn print_report(report: &SimulationReport, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Yaml => serde_yaml::to_string(report).context("Failed to render YAML")?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to render JSON")?
        }
    };
    println!("{rendered}");
    Ok(())
}

/// The policy named on the command line: a document of its own, or a key
/// looked up in a fixture.
fn read_policy(
    policy: Option<PathBuf>,
    fixture: Option<PathBuf>,
    key: Option<ObjectKey>,
) -> Result<Policy> {
    match (policy, fixture, key) {
        (Some(path), _, _) => load_document(&path),
        (None, Some(path), Some(key)) => Fixture::from_file(&path)?
            .policy(&key)
            .cloned()
            .with_context(|| format!("No policy {key} in {}", path.display())),
        _ => bail!("Either --policy or --fixture with --key is required"),
    }
}

fn classify_policy(policy: &Policy, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    match classify(policy, &config) {
        Role::Root => println!("{}: root", policy.key()),
        Role::Leaf { owner } if owner.is_empty() => {
            if !policy.metadata.owner_references.is_empty() {
                bail!(
                    "{} is a leaf without the {} label",
                    policy.key(),
                    config.owned_by_label
                );
            }
            println!(
                "{}: root placed on {}",
                policy.key(),
                policy.label(&config.cluster_label).unwrap_or_default()
            );
        }
        Role::Leaf { owner } => println!("{}: leaf of {owner}", policy.key()),
    }
    Ok(())
}

/// Wait for Ctrl+C.
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, cancelling"),
        Err(err) => {
            error!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
