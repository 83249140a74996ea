use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use parrot_engine::{DrainFailurePolicy, SessionOptions, run};
use parrot_plugins::{BuiltinHandlerFactory, builtin_plugins};
use parrot_registry::{HandlerRegistry, PluginLoader};
use parrot_util::{TerminalPrompter, expand_tilde, load_env_files};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const BANNER: &str = "\
┌──────────────────────────────────────────────────────────────────┐
│                                                                  │
│                            Parrot CLI                            │
│                                                                  │
└──────────────────────────────────────────────────────────────────┘";

/// Collects test results from sources and hands them to drains.
#[derive(Debug, Parser)]
#[command(name = "parrot", version, about)]
struct Args {
    /// Path to a saved Parrot configuration file
    #[arg(short = 'c', long, value_name = "CONFIG_FILE")]
    config_file: Option<String>,

    /// One or more .env files to load environment variables from
    #[arg(short = 'e', long, value_name = "ENV_FILE", num_args = 1..)]
    env_file: Vec<PathBuf>,

    /// One or more Parrot plugin files to load
    #[arg(short = 'p', long, value_name = "PLUGIN_FILE", num_args = 1..)]
    plugin_file: Vec<PathBuf>,

    /// Keep writing to the remaining outlets when one of them fails
    #[arg(long)]
    isolate_drain_failures: bool,
}

impl Args {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            config_file: self.config_file.as_deref().map(expand_tilde),
            drain_failure_policy: if self.isolate_drain_failures {
                DrainFailurePolicy::Isolate
            } else {
                DrainFailurePolicy::Abort
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();
    println!("{BANNER}");

    load_env_files(&args.env_file).context("failed to load environment files")?;

    let mut registry = HandlerRegistry::new();
    PluginLoader::new(Arc::new(BuiltinHandlerFactory))
        .load_all(&mut registry, &builtin_plugins(), &args.plugin_file)
        .context("failed to load plugins")?;
    debug!(
        sources = ?registry.sources().keys().collect::<Vec<_>>(),
        drains = ?registry.drains().keys().collect::<Vec<_>>(),
        "registered handlers"
    );

    let prompter = TerminalPrompter::new();
    let report = run(&registry, &prompter, &args.session_options()).await?;
    if !report.is_success() {
        for failure in &report.failures {
            warn!(drain = %failure.drain, outlet = %failure.outlet, "not delivered");
        }
        bail!(
            "{} of {} drain writes failed",
            report.failures.len(),
            report.failures.len() + report.outputs.len()
        );
    }
    Ok(())
}

/// Logs go to stderr so the stdout drain's report stays clean.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
