//! ownerchain - resolve the top-level controller of a Kubernetes workload
//!
//! Follows controlling owner references from a starting object up to the
//! root controller, e.g. Pod -> ReplicaSet -> Deployment.

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cli::{ConfigSubcommand, OutputFormat, Session};
use ownerchain::config::ConfigLoader;
use ownerchain::kube;
use ownerchain::models::ControllerKeyWithApiVersion;

/// Resolve the top-level controller that owns a Kubernetes workload object
#[derive(Parser, Debug)]
#[command(name = "ownerchain", version)]
#[command(
    about = "Resolve the top-level controller that owns a Kubernetes workload object",
    long_about = None
)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    context: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the top-level controller of a controller object
    Resolve {
        /// Namespace of the object
        #[arg(long, short = 'n')]
        namespace: String,
        /// Kind of the object (e.g. ReplicaSet, Rollout)
        #[arg(long)]
        kind: String,
        /// Name of the object
        #[arg(long)]
        name: String,
        /// apiVersion of the object; defaults to the well-known one for built-in kinds
        #[arg(long)]
        api_version: Option<String>,
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Resolve the top-level controller of a Pod
    Pod {
        /// Name of the Pod
        name: String,
        /// Namespace of the Pod
        #[arg(long, short = 'n')]
        namespace: String,
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

/// What a cluster command resolves, validated before connecting
enum Target {
    Controller {
        start: ControllerKeyWithApiVersion,
        output: OutputFormat,
    },
    Pod {
        namespace: String,
        name: String,
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let context = args.context.clone().or_else(kube::current_context);

    let command = match args.command {
        Command::Config { subcommand } => {
            return cli::handle_config_command(subcommand, context.as_deref());
        }
        Command::Version => {
            cli::display_version();
            return Ok(());
        }
        command => command,
    };

    let config = ConfigLoader::load(context.as_deref()).context("Failed to load configuration")?;
    cli::init_logging(args.debug, &config.logger.level);

    tracing::debug!(
        context = context.as_deref().unwrap_or("<inferred>"),
        namespace = config.watch_namespace().unwrap_or("<all>"),
        kinds = config.well_known_kinds.len(),
        "Configuration loaded"
    );

    let target = match command {
        Command::Resolve {
            namespace,
            kind,
            name,
            api_version,
            output,
        } => Target::Controller {
            start: cli::start_key(namespace, kind, name, api_version)?,
            output,
        },
        Command::Pod {
            name,
            namespace,
            output,
        } => Target::Pod {
            namespace,
            name,
            output,
        },
        Command::Config { .. } | Command::Version => return Ok(()),
    };

    let client = match args.context.as_deref() {
        Some(ctx) => kube::create_client_for_context(ctx).await?,
        None => kube::create_client().await?,
    };
    let session = Session::start(client, &config).await?;

    let result = match target {
        Target::Controller { start, output } => cli::resolve(&session, start, output).await,
        Target::Pod {
            namespace,
            name,
            output,
        } => cli::resolve_pod(&session, &namespace, &name, output).await,
    };

    session.shutdown().await;
    result
}
