use anyhow::Result;
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod controller;
mod metrics;
mod server;

use config::{ControllerConfig, LogFormat};
use controller::MySQLController;
use metrics::ControllerMetrics;
use server::Readiness;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting mysql-controller...");

    let client = Client::try_default().await?;
    let metrics = ControllerMetrics::new()?;
    let readiness = Readiness::default();

    let controller = MySQLController::new(client, config.clone(), metrics.clone());
    controller.check_crd_installed().await?;

    let server_readiness = readiness.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(config.metrics_addr, metrics, server_readiness).await {
            error!("Metrics server error: {}", e);
        }
    });

    controller.run(readiness).await?;
    info!("Shutdown signal received, exiting...");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
