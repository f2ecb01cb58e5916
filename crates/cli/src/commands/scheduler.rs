//! `pawline scheduler`: serve the scheduling tool to assistants.

use pawline_config::AppConfig;
use pawline_tools::{ToolServer, default_registry};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(port) = port_override {
        config.scheduler.port = port;
    }

    let (registry, book) = default_registry(config.scheduler.pickup_delay_days)?;
    let server = Arc::new(ToolServer::new(registry));
    let addr = format!("{}:{}", config.scheduler.host, config.scheduler.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Cannot listen on {addr}: {e}"))?;

    println!("Pawline scheduler");
    println!("  Listening:   {}", listener.local_addr()?);
    println!("  Tools:       {}", server.registry().names().join(", "));
    println!(
        "  Pickup in:   {} day(s)",
        config.scheduler.pickup_delay_days
    );

    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => {
            let booked = book.all().await;
            info!(appointments = booked.len(), "Scheduler shutting down");
        }
    }

    Ok(())
}
