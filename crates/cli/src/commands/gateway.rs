//! `chatwright gateway`: Start the HTTP API server.

use chatwright_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() && config.providers.values().all(|p| p.api_key.is_none()) {
        tracing::warn!("No API key configured; replies will fail until one is set");
    }

    println!("Chatwright Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);
    println!(
        "   Market:    {}",
        if config.market.enabled {
            config.market.provider.as_str()
        } else {
            "disabled"
        }
    );

    chatwright_gateway::start(config).await?;

    Ok(())
}
