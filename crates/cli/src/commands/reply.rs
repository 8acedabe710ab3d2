//! `chatwright reply`: Generate one reply from the command line.

use chatwright_config::AppConfig;
use chatwright_core::Error;
use chatwright_core::profile::Platform;
use chatwright_engine::GenerationRequest;
use std::path::Path;

pub async fn run(
    profile_path: &Path,
    message: &str,
    platform: Platform,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let profile = super::load_profile(profile_path)?;
    let generator = chatwright_gateway::build_generator(&config)?;

    let request = GenerationRequest {
        profile,
        message: message.to_string(),
        platform,
    };

    match generator.generate(&request).await {
        Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
        Ok(result) => println!("{}", result.reply),
        Err(e) => {
            eprintln!("Reply failed [{}]: {e}", e.kind());
            if e.is_retryable() {
                eprintln!("The provider may recover; try again shortly.");
            }
            return Err(Error::Generation(e).into());
        }
    }

    Ok(())
}
