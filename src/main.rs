//! # Sensor Sim
//!
//! Synthetic ballistic sensor telemetry generator.
//!
//! One process simulates one sensor channel: it models a ballistic
//! trajectory, samples noisy readings from it, and either broadcasts them
//! periodically or serves them on demand over Zenoh, gated on a launch
//! trigger.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load and validate configuration (fail fast on any problem)
//!    - Open the Zenoh session
//!
//! 2. **Serving**
//!    - Broadcast mode: publish a reading every period until the
//!      trajectory completes
//!    - Query/reply mode: answer reading queries, arming the launch gate
//!      from the trigger topic
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C (or stream closure) leaves the serving loop
//!    - The Zenoh session is closed on every exit path

use anyhow::Result;
use tracing::info;
use tracing_subscriber;

use sensor_sim::config::{Config, Mode};
use sensor_sim::server::RequestServer;
use sensor_sim::transport::{Transport, ZenohTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("sensor-sim v{} starting...", env!("CARGO_PKG_VERSION"));

    // Configuration problems are fatal here, before any transport activity
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path)?
        }
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    info!(
        "Simulating {} on {} in {:?} mode",
        config.sensor.kind,
        config.data_topic(),
        config.sensor.mode
    );

    let server = RequestServer::from_config(&config)?;
    let transport = ZenohTransport::connect().await?;

    let outcome = tokio::select! {
        result = run(&server, &transport, config.sensor.mode) => result,

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    };

    // Close the session on every exit path, interrupted or not
    let closed = transport.close().await;
    outcome?;
    closed?;

    info!("Shutdown complete");
    Ok(())
}

/// Dispatch to the serving loop for the configured mode
async fn run(
    server: &RequestServer,
    transport: &ZenohTransport,
    mode: Mode,
) -> sensor_sim::error::Result<()> {
    match mode {
        Mode::Broadcast => server.run_broadcast(transport).await,
        Mode::QueryReply => server.run_query_reply(transport).await,
    }
}
