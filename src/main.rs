use std::path::PathBuf;

use contact_relay::config::Configuration;
use contact_relay::{app, initialize_state, telemetry};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const CONFIG_PATH_VAR: &str = "CONFIG_PATH";

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Read configuration with a temporary logger, the final one depends on it.
    let config = tracing::subscriber::with_default(
        tracing_subscriber::fmt().finish(),
        || {
            Configuration::default()
                .path(
                    std::env::var(CONFIG_PATH_VAR)
                        .map(PathBuf::from)
                        .unwrap_or_default(),
                )
                .read()
                .map(|config| config.env(|key| std::env::var(key).ok()))
        },
    )?;

    let otlp_logs = config
        .telemetry
        .otlp_endpoint
        .as_deref()
        .map(telemetry::setup_logging)
        .transpose()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(otlp_logs)
        .init();

    if let Some(endpoint) = &config.telemetry.otlp_endpoint {
        let provider = telemetry::setup_tracer(endpoint)?;
        opentelemetry::global::set_tracer_provider(provider);
        tracing::info!(%endpoint, "exporting traces");
    }

    let address = config.address.clone();
    let version = config.version().to_owned();
    let state = initialize_state(config)?;

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, %version, "relay listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
