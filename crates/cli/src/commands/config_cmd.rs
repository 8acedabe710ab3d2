//! `chatwright config`: Configuration management commands.

use chatwright_config::AppConfig;

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();

            if !config.has_api_key() && config.providers.values().all(|p| p.api_key.is_none()) {
                warnings.push("No API key set (set CHATWRIGHT_API_KEY or OPENROUTER_API_KEY)");
            }

            if config.gateway.host == "0.0.0.0" {
                warnings.push("Gateway bound to 0.0.0.0; put it behind the platform adapters' network");
            }

            if config.market.enabled && config.market.provider != "coingecko" {
                warnings.push("Unknown market provider; market context will be disabled");
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!(
                "   Budgets:   {} / {} chars, {}s per attempt",
                config.generation.primary_knowledge_budget,
                config.generation.fallback_knowledge_budget,
                config.generation.attempt_timeout_secs
            );
            println!(
                "   Gateway:   {}:{}",
                config.gateway.host, config.gateway.port
            );
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&without_secrets(config))?);
    Ok(())
}

pub fn path() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
}

fn without_secrets(mut config: AppConfig) -> AppConfig {
    config.api_key = None;
    config.market.api_key = None;
    for provider in config.providers.values_mut() {
        provider.api_key = None;
    }
    config
}
