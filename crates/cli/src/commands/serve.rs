//! `codecoach serve`: Start the HTTP relay.

use std::path::Path;

use codecoach_config::AppConfig;
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(host) = host_override {
        info!(host = %host, "Bind host overridden from command line");
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        info!(port, "Port overridden from command line");
        config.gateway.port = port;
    }

    println!("Code Coach relay");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} (temperature {})", config.model, config.temperature);

    codecoach_gateway::start(config).await?;

    Ok(())
}
