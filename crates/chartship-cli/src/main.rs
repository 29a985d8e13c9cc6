mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chartship", about = "Build chart images and publish Helm charts")]
#[command(version)]
struct Cli {
    /// Registry/namespace prefix for image names [default: from chartship.toml, else jupyterhub/k8s-]
    #[arg(long, global = true)]
    image_prefix: Option<String>,

    /// Project root (git work tree containing the chart)
    #[arg(long, short = 'C', global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build & push images, stamp chart manifests, and publish the chart
    Build {
        /// Range of commits to consider when building images
        #[arg(long)]
        commit_range: Option<String>,
        /// Push images and publish the chart
        #[arg(long)]
        push: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { commit_range, push } => {
            commands::build(
                &cli.project_dir,
                cli.image_prefix.as_deref(),
                commit_range,
                push,
            )
            .await?
        }
    }

    Ok(())
}
