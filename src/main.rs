/// Clusterdeck - EKS cluster browser
///
/// Connects to Amazon EKS clusters with AWS credentials and exposes their
/// pods, deployments, services and nodes through a small HTTP API.
mod aws;
mod config;
mod connector;
mod error;
mod k8s;
mod server;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::aws::CredentialParams;
use crate::config::ServiceConfig;
use crate::connector::{Connector, ConnectorSettings};

#[derive(Parser)]
#[command(name = "clusterdeck")]
#[command(about = "Connect to EKS clusters and browse their resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "clusterdeck.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,

    /// Generate example configuration file
    Init,

    /// List EKS clusters available in a region
    Available {
        /// AWS region (defaults to aws.default_region from the config)
        #[arg(long)]
        region: Option<String>,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Connect to a cluster and print one resource kind as JSON
    Resources {
        /// EKS cluster name
        #[arg(long)]
        cluster: String,

        /// AWS region (defaults to aws.default_region from the config)
        #[arg(long)]
        region: Option<String>,

        /// pods, deployments, services or nodes
        #[arg(long, default_value = "pods")]
        kind: String,

        #[command(flatten)]
        auth: AuthArgs,
    },
}

/// AWS credential flags; a profile wins over keys, no flags means the default profile
#[derive(Args)]
struct AuthArgs {
    /// Named AWS profile
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// AWS session token for temporary credentials
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,
}

impl AuthArgs {
    fn params(&self) -> CredentialParams {
        if self.profile.is_none() && self.access_key_id.is_some() {
            CredentialParams {
                auth_type: Some("credentials".to_string()),
                aws_access_key_id: self.access_key_id.clone(),
                aws_secret_access_key: self.secret_access_key.clone(),
                aws_session_token: self.session_token.clone(),
                profile_name: None,
            }
        } else {
            CredentialParams {
                auth_type: Some("profile".to_string()),
                profile_name: self.profile.clone(),
                ..Default::default()
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clusterdeck={0},tower_http={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Serve => serve(&cli).await,
        Commands::Init => init_config(&cli).await,
        Commands::Available {
            ref region,
            ref auth,
        } => list_available(&cli, region.as_deref(), auth).await,
        Commands::Resources {
            ref cluster,
            ref region,
            ref kind,
            ref auth,
        } => show_resources(&cli, cluster, region.as_deref(), kind, auth).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    ServiceConfig::load(&cli.config).context("Failed to load configuration")
}

fn resolve_region(config: &ServiceConfig, region: Option<&str>) -> Result<String> {
    region
        .map(str::to_string)
        .or_else(|| config.aws.default_region.clone())
        .context("No region given. Pass --region or set aws.default_region in the config")
}

/// Run the HTTP API
async fn serve(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let addr = config.listen_addr()?;

    // Generated kubeconfigs shell out to this command for every API call
    if let Err(e) = utils::command::check_token_command(&config.aws.token_command).await {
        warn!("{:#}; cluster connections will fail until it is installed", e);
    }

    let connector = Connector::with_aws(ConnectorSettings::from(&config));
    info!(
        "Timeouts: connect {}s, list {}s",
        config.timeouts.connect_secs, config.timeouts.list_secs
    );

    server::serve(addr, connector).await
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let example_config = ServiceConfig::example();
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration file to match your requirements");
    info!("  2. Make sure the AWS CLI is installed and credentials are configured");
    info!("  3. Start the API:");
    info!("     clusterdeck serve");

    Ok(())
}

/// List EKS clusters in a region
async fn list_available(cli: &Cli, region: Option<&str>, auth: &AuthArgs) -> Result<()> {
    let config = load_config(cli)?;
    let region = resolve_region(&config, region)?;
    let connector = Connector::with_aws(ConnectorSettings::from(&config));

    let available = connector.list_available(&region, &auth.params()).await?;

    if available.clusters.is_empty() {
        info!("No clusters found in {}", region);
        return Ok(());
    }

    info!("Clusters in {} ({}):", available.region, available.count);
    for cluster in &available.clusters {
        info!(
            "  - {} (Status: {}, Version: {}, Created: {})",
            cluster.name,
            cluster.status.as_deref().unwrap_or("N/A"),
            cluster.version.as_deref().unwrap_or("N/A"),
            cluster.created_at.as_deref().unwrap_or("N/A")
        );
    }

    Ok(())
}

/// Connect to a cluster and print one resource kind
async fn show_resources(
    cli: &Cli,
    cluster: &str,
    region: Option<&str>,
    kind: &str,
    auth: &AuthArgs,
) -> Result<()> {
    let config = load_config(cli)?;
    let region = resolve_region(&config, region)?;
    let connector = Connector::with_aws(ConnectorSettings::from(&config));

    let connected = connector.connect(cluster, &region, &auth.params()).await?;
    info!("{}", connected.message);

    let resources = connector
        .get_resources(&connected.connection_id, kind)
        .await?;
    info!("Found {} {}", resources.count, resources.resource_type);

    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}
