use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chartshift::cli::{self, Commands, GlobalOptions};

#[derive(Parser)]
#[command(name = "chartshift")]
#[command(about = "Migrate a legacy application store into Kubernetes resources", long_about = None)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "./chartshift.toml")]
    config: PathBuf,

    /// Kubeconfig used to reach the cluster
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Address of the Kubernetes API server, overrides the kubeconfig
    #[arg(long, global = true)]
    master: Option<String>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "chartshift=debug"
    } else {
        "chartshift=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let options = GlobalOptions {
        config: cli.config,
        kubeconfig: cli.kubeconfig,
        master: cli.master,
    };

    let report = cli::run(cli.command, &options)?;
    info!("{} resources created", report.created());
    println!("{report}");

    Ok(())
}
