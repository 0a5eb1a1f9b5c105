use clap::Parser;
use tracing::{error, info, warn};

use vouch_node::{app, logging, Cli, Config};
use vouch_validator::StopHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_file = cli.load_env_file()?;

    logging::init(cli.log_format)?;

    match env_file {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => warn!(
            "Env file {} not found, using process environment",
            cli.env_file_path().display()
        ),
    }

    let mut config = Config::load(&cli.config)?;
    config.apply_secrets(|key| std::env::var(key).ok());

    if let Err(e) = config.validate() {
        error!("Configuration error: {:#}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Vouch Validator");
    info!("======================================");
    info!("Network: {}", cli.network.as_str());
    info!("Network id: {}", config.validator.network_id);
    info!("Validator key: {}", config.validator.validator_key);
    info!("Ledger gateway: {}", config.ledger.url);
    info!("Interval: {}s", config.validator.iteration_interval_secs);
    info!("Max weights: {}", config.validator.max_allowed_weights);
    info!("Sentiment model: {}", config.sentiment.model);
    info!("======================================");

    let validator = app::build_validator(&config).await?;
    let scheduler = app::build_scheduler(&config, validator);

    tokio::spawn(stop_on_signal(scheduler.stop_handle()));

    scheduler.run().await;

    info!("Validator stopped");
    Ok(())
}

async fn stop_on_signal(stop: StopHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = term.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
    }

    info!("Stopping after the current iteration");
    stop.stop();
}
