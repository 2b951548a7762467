//! Command-line interface for ctrlkit.
//!
//! Provides commands for running a workflow once through the reconcile
//! driver, printing its assembled step tree, validating it, and showing the
//! resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::ReconcilerConfig;
use crate::core::{Context, EmptyHook, LifecycleHook, TracingHook};
use crate::domain::Verdict;
use crate::driver::Reconciler;
use crate::workflow::Workflow;

/// ctrlkit - Composable reconciliation steps
#[derive(Parser, Debug)]
#[command(name = "ctrlkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .ctrlkit/config.yaml in this or a parent directory)
    #[arg(short, long, global = true, env = "CTRLKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a workflow once and print the verdict
    Run {
        /// Workflow name (looks for workflows/<name>.yaml) or path
        workflow: String,

        /// Override the reconcile deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the assembled step tree
    Describe {
        /// Workflow name or path
        workflow: String,
    },

    /// Check that a workflow parses and assembles
    Validate {
        /// Workflow name or path
        workflow: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = ReconcilerConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Run {
                workflow,
                timeout_ms,
                json,
            } => {
                if let Some(timeout_ms) = timeout_ms {
                    config.reconcile_timeout_ms = timeout_ms;
                    config.validate()?;
                }
                run_workflow(&workflow, config, json).await
            }
            Commands::Describe { workflow } => describe_workflow(&workflow),
            Commands::Validate { workflow } => validate_workflow(&workflow),
            Commands::Config => show_config(&config),
        }
    }
}

/// Run a workflow once through the reconcile driver
async fn run_workflow(name: &str, config: ReconcilerConfig, json: bool) -> Result<()> {
    let workflow = load_workflow(name)?;

    let hook: Arc<dyn LifecycleHook> = if config.trace_steps {
        Arc::new(TracingHook)
    } else {
        Arc::new(EmptyHook)
    };
    let root = workflow
        .build(hook)
        .with_context(|| format!("Workflow '{}' cannot be assembled", workflow.name))?;

    // Ctrl-C cancels the reconcile context; the root sees it as a cancelled context.
    let (ctx, guard) = Context::background().with_cancel();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling reconcile");
            guard.cancel();
        }
    });

    let reconciler = Reconciler::new(config);
    let report = reconciler.reconcile_in(&ctx, &root).await;
    interrupt.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Workflow: {}", workflow.name);
        println!("Report ID: {}", report.id);
        println!("Duration: {}ms", report.duration_ms);
        println!("Verdict: {}", report.verdict);
        if let Verdict::Failed { causes, .. } = &report.verdict {
            for cause in causes {
                println!("  - {}", cause);
            }
        }
    }

    if report.verdict.is_failed() {
        std::process::exit(1);
    }

    Ok(())
}

/// Print the step tree a workflow assembles into
fn describe_workflow(name: &str) -> Result<()> {
    let workflow = load_workflow(name)?;
    let root = workflow.build(Arc::new(EmptyHook))?;

    println!("{}", workflow.name);
    if !workflow.description.is_empty() {
        println!("  {}", workflow.description);
    }
    println!("{}", root.description());

    Ok(())
}

fn validate_workflow(name: &str) -> Result<()> {
    let workflow = load_workflow(name)?;
    workflow.validate()?;
    println!("Workflow '{}' is valid", workflow.name);
    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ReconcilerConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

/// Load a workflow by path, or by name from the workflows/ directory
fn load_workflow(name: &str) -> Result<Workflow> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Workflow::from_file(&direct);
    }

    let workflow_path = PathBuf::from("workflows").join(format!("{}.yaml", name));
    if workflow_path.exists() {
        return Workflow::from_file(&workflow_path);
    }

    anyhow::bail!(
        "Workflow '{}' not found. Looked for:\n  - {}\n  - {}",
        name,
        direct.display(),
        workflow_path.display()
    )
}
