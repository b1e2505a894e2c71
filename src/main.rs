use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hostgate::lifecycle;
use hostgate::observability::logging::init_tracing;

#[derive(Parser)]
#[command(name = "hostgate")]
#[command(about = "Host-based HTTPS reverse proxy", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Reload routes automatically when the config file changes
    #[arg(short, long)]
    watch: bool,

    /// Debug-level logging (ignored when RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "hostgate starting"
    );

    match lifecycle::run(&cli.config, cli.watch).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
