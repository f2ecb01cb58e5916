//! `pawline tools`: connect to the tool provider and print its catalog.

use pawline_config::AppConfig;
use pawline_core::tool::ToolInvoker;
use pawline_gateway::{GatewayOptions, ToolGateway};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let addr = config.tools.provider_addr.clone();

    let gateway = ToolGateway::connect(addr.clone(), GatewayOptions::from_config(&config.tools))
        .await
        .map_err(|e| format!("Tool provider at {addr} is unavailable: {e}"))?;
    let rtt = gateway.ping().await?;
    let info = gateway.server_info();

    println!("Tool provider {} {} at {addr}", info.name, info.version);
    println!("  State:  {}", gateway.state());
    println!("  Ping:   {} ms", rtt.as_millis());
    println!();

    let catalog = gateway.catalog();
    if catalog.is_empty() {
        println!("  (no tools offered)");
    }
    for tool in catalog.definitions() {
        println!("  {}  {}", tool.name, tool.description);
        for param in &tool.parameters {
            let presence = if param.required { "required" } else { "optional" };
            println!(
                "      {:<12} {:<8} {:<9} {}",
                param.name,
                param.kind.as_str(),
                presence,
                param.description
            );
        }
    }

    gateway.close().await;
    Ok(())
}
