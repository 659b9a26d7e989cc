//! PulseWatch - Uptime Monitoring Engine
//!
//! Continuously probes configured resources, classifies their health, and
//! raises deduplicated alerts on status transitions.

mod alert;
mod classify;
mod config;
mod mirror;
mod probe;
mod scheduler;
mod store;
mod web;

use alert::AlertDispatcher;
use config::ServerConfig;
use mirror::MirrorPublisher;
use scheduler::Scheduler;
use store::Store;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("pulsewatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting PulseWatch on port {}...", cfg.http_port);
    tracing::info!("Using data directory {}", cfg.data_dir);

    // Initialize the resource store
    let store = Arc::new(Store::new(&cfg.data_dir)?);
    tracing::info!("Store initialized with {} resources", store.get_resources().len());

    // Shared HTTP client for probes, notifications and mirror uploads
    let client = probe::build_client()?;

    let dispatcher = Arc::new(AlertDispatcher::new(store.clone(), client.clone()));
    let mirror = Arc::new(MirrorPublisher::new(store.clone(), client.clone()));

    // Start the monitoring engine
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        dispatcher.clone(),
        mirror.clone(),
        client,
    ));
    scheduler.start_all().await;
    mirror.start_periodic();

    // Start web server
    let server = Server::new(cfg, store, scheduler, dispatcher, mirror);
    server.start().await?;

    Ok(())
}
