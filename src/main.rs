use alarm_feed::{
    cli::Args,
    client::ReconnectingClient,
    config::Config,
    events::EventBridge,
    monitoring::setup_metrics,
    tracing_setup::setup_tracing,
    ui::{DashboardController, UIOptions, spawn_command_reader},
};
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_tracing(&args.log_level, args.json_logs)?;

    info!("Starting alarm feed v{}", env!("CARGO_PKG_VERSION"));

    // tokio-tungstenite builds its TLS config from the process-wide provider.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("TLS crypto provider was already installed");
    }

    let config = Arc::new(Config::from_args(&args)?);

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
    }

    let client = ReconnectingClient::new(config.clone());
    let (bridge, events) = EventBridge::attach(&client);
    let mut dashboard = DashboardController::new(
        events,
        UIOptions {
            format: config.display.format,
            colored: config.display.colored,
            quiet: config.display.quiet,
        },
    );
    if config.display.interactive {
        dashboard = dashboard.with_commands(spawn_command_reader());
    }

    client.connect()?;
    info!("Client started. Press Ctrl+C to shutdown...");

    tokio::select! {
        _ = dashboard.run() => {
            warn!("Event stream ended");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
        }
    }

    client.disconnect();
    bridge.detach(&client);
    client.shutdown().await;

    info!(
        unread = dashboard.store().unread_count(),
        "Client stopped successfully"
    );
    Ok(())
}
