use benchtarget_api::{run_server, telemetry, BenchTargetConfig, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match BenchTargetConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = telemetry::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        available_parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        "Runtime parallelism"
    );

    if let Err(err) = run_server(config).await {
        tracing::error!(error = %err, "Server terminated with error");
        std::process::exit(1);
    }
}
