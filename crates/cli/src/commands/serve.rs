//! `prepwire serve`: start the HTTP gateway.

use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("Prepwire gateway");
    println!("   Listening:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:       {}", config.model);
    println!(
        "   Speech:      {}",
        if config.has_speech_key() { "enabled" } else { "disabled (no OPENAI_API_KEY)" }
    );
    println!(
        "   Shared secret required: {}",
        config.gateway.shared_secret.is_some()
    );

    prepwire_gateway::start(config).await?;

    Ok(())
}
