//! Chartlift CLI - import Helm chart repositories into the KubeSphere app store

use std::path::PathBuf;

use chartlift_repo::{ImportConfig, MirrorRule};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;
mod settings;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "chartlift")]
#[command(version)]
#[command(about = "Import Helm chart repositories into the KubeSphere app store", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (default: ~/.config/chartlift/config.yaml)
    #[arg(long, global = true, env = "CHARTLIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Category label value marking imported applications
    #[arg(long, global = true, env = "CHARTLIFT_MARKER")]
    marker: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every chart of a repository, then publish the applications
    Import {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        server: ServerArgs,

        #[command(flatten)]
        cluster: ClusterArgs,

        /// Upload only, leave the applications unpublished
        #[arg(long)]
        skip_publish: bool,
    },

    /// Show which versions an import would upload
    Plan {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Publish previously uploaded applications
    Publish {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
}

/// Chart repository and retention options
#[derive(Args)]
struct SourceArgs {
    /// Helm repository URL (the directory holding index.yaml)
    #[arg(long, env = "CHARTLIFT_REPO")]
    repo: Option<String>,

    /// Keep only the latest patch of each minor version
    #[arg(long, env = "CHARTLIFT_LATEST_PATCH_ONLY")]
    latest_patch_only: bool,

    /// Upload at most this many versions per chart
    #[arg(long, env = "CHARTLIFT_MAX_VERSIONS")]
    max_versions: Option<usize>,

    /// Compare minor versions for equality instead of substring containment
    #[arg(long, env = "CHARTLIFT_STRICT_MINOR_GROUPS")]
    strict_minor_groups: bool,

    /// Rewrite download URLs matching PATTERN through a mirror (PATTERN=URL)
    #[arg(long = "mirror", value_name = "PATTERN=URL", value_parser = settings::parse_mirror)]
    mirrors: Vec<MirrorRule>,
}

/// App store options
#[derive(Args)]
struct ServerArgs {
    /// KubeSphere API gateway URL
    #[arg(long, env = "CHARTLIFT_SERVER")]
    server: Option<String>,

    /// Username for basic authentication
    #[arg(long, env = "CHARTLIFT_USERNAME")]
    username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "CHARTLIFT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Bearer token
    #[arg(long, env = "CHARTLIFT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// File holding the bearer token (default: the pod service-account token)
    #[arg(long, env = "CHARTLIFT_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Delay between two uploads, in milliseconds
    #[arg(long = "pace-ms", env = "CHARTLIFT_PACE_MS")]
    pace_millis: Option<u64>,
}

/// Cluster options
#[derive(Args)]
struct ClusterArgs {
    /// Kubeconfig file (default: $KUBECONFIG, ~/.kube/config or in-cluster)
    #[arg(long, env = "CHARTLIFT_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,
}

impl SourceArgs {
    fn apply(&self, config: &mut ImportConfig) {
        settings::override_with(&mut config.repo, &self.repo);
        settings::override_with(&mut config.retention.max_versions, &self.max_versions);
        if self.latest_patch_only {
            config.retention.latest_patch_only = true;
        }
        if self.strict_minor_groups {
            config.retention.strict_minor_groups = true;
        }
        config.mirrors.extend(self.mirrors.iter().cloned());
    }
}

impl ServerArgs {
    fn apply(&self, config: &mut ImportConfig) {
        settings::override_with(&mut config.server, &self.server);
        settings::override_with(&mut config.username, &self.username);
        settings::override_with(&mut config.password, &self.password);
        settings::override_with(&mut config.token, &self.token);
        settings::override_with(&mut config.token_file, &self.token_file);
        if let Some(pace) = self.pace_millis {
            config.pace_millis = pace;
        }
    }
}

impl ClusterArgs {
    fn apply(&self, config: &mut ImportConfig) {
        settings::override_with(&mut config.kubeconfig, &self.kubeconfig);
    }
}

/// Log to stderr, `RUST_LOG` wins over `--debug`
fn init_tracing(debug: bool) {
    let default = if debug {
        "chartlift=debug,chartlift_repo=debug,chartlift_kube=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = settings::load(cli.config.as_deref())?;
    if let Some(marker) = cli.marker {
        config.marker = marker;
    }

    match cli.command {
        Commands::Import {
            source,
            server,
            cluster,
            skip_publish,
        } => {
            source.apply(&mut config);
            server.apply(&mut config);
            cluster.apply(&mut config);
            commands::import::run(&config, skip_publish).await
        }

        Commands::Plan { source } => {
            source.apply(&mut config);
            commands::plan::run(&config).await
        }

        Commands::Publish { cluster } => {
            cluster.apply(&mut config);
            commands::publish::run(&config).await
        }
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Other {
            message: format!("failed to start async runtime: {}", e),
        })
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(err) = result {
        tracing::error!(error = %err, "chartlift failed");
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
