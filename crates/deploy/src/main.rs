//! Gitship CLI.
//!
//! Deploys a public HTTPS git repository to an EKS cluster and lists past
//! deployments. All cluster and registry settings come from the environment;
//! see [`DeployConfig::from_env`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gitship_deploy::auth::StaticTokenStore;
use gitship_deploy::orchestrator::DeployRequest;
use gitship_deploy::{
    DeployConfig, DeploymentOrchestrator, JsonlStore, ProgressSink, ProgressStep, RecordSink,
};
use gitship_exec::{CommandRunner, ProcessRunner};

/// Gitship - deploy a git repository to EKS.
#[derive(Parser)]
#[command(
    name = "gitship",
    version,
    about = "Deploy a public git repository to an EKS cluster",
    long_about = "Clone a public HTTPS git repository, containerize it (synthesizing a\n\
                  Dockerfile when the project has none), push the image to Docker Hub,\n\
                  and deploy it to an EKS cluster behind an AWS load balancer.\n\n\
                  Cluster, region, and registry credentials are read from\n\
                  EKS_CLUSTER_NAME, AWS_REGION, DOCKER_USERNAME, and DOCKER_PASSWORD."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bearer credential identifying the caller.
    #[arg(long, global = true, env = "GITSHIP_TOKEN", default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a repository to the cluster.
    Deploy(DeployArgs),

    /// List your past deployments, newest first.
    List,
}

#[derive(clap::Args)]
struct DeployArgs {
    /// HTTPS URL of the repository to deploy.
    #[arg(long)]
    repo_url: String,

    /// Environment variable for the container, as KEY=VALUE. Repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Prints each pipeline step to stdout as it starts.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn notify(&self, step: ProgressStep) {
        println!("{}", step.message());
    }
}

fn records_path() -> PathBuf {
    std::env::var("GITSHIP_RECORDS").map_or_else(
        |_| std::env::temp_dir().join("gitship-deployments.jsonl"),
        PathBuf::from,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info,gitship_deploy=debug,gitship_exec=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = DeployConfig::from_env();
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());

    // Single-user CLI: the token maps to the local user identity.
    let user = std::env::var("GITSHIP_USER").unwrap_or_else(|_| "local".to_string());
    let credentials = Arc::new(StaticTokenStore::new().with_token(cli.token.clone(), user));
    let records: Arc<dyn RecordSink> = Arc::new(JsonlStore::new(records_path()));

    let orchestrator = DeploymentOrchestrator::new(
        config,
        runner,
        credentials,
        records,
        Arc::new(ConsoleProgress),
    );

    match cli.command {
        Commands::Deploy(args) => {
            let request = DeployRequest {
                repo_url: args.repo_url,
                env_variables: args.env.into_iter().collect::<BTreeMap<_, _>>(),
            };
            match orchestrator.deploy(&cli.token, request).await {
                Ok(outcome) => {
                    println!();
                    println!("Service URL:   {}", outcome.service_url);
                    println!("Image:         {}", outcome.image_url);
                    println!("Deployment ID: {}", outcome.deployment_id);
                    println!("AWS console:   {}", outcome.aws_console_url);
                    Ok(())
                }
                Err(failure) => {
                    eprintln!("{failure}");
                    std::process::exit(1);
                }
            }
        }
        Commands::List => {
            let records = orchestrator
                .list(&cli.token)
                .await
                .map_err(anyhow::Error::new)?;
            if records.is_empty() {
                println!("No deployments yet.");
                return Ok(());
            }
            for record in records {
                println!(
                    "{}  {:<9} {}  {}",
                    record.deployed_at, record.status, record.repo_url, record.service_url
                );
            }
            Ok(())
        }
    }
}
