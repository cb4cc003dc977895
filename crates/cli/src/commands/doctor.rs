//! `prepwire doctor`: diagnose configuration and credentials.

use std::path::Path;

use prepwire_core::Provider as _;

use super::{config_file, load_config};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Prepwire doctor");
    println!("===============\n");

    let mut issues = 0;

    let path = config_file(config_path);
    if path.exists() {
        println!("  ok    Config file found: {}", path.display());
    } else {
        println!("  info  No config file at {} (defaults + env in use)", path.display());
    }

    match load_config(config_path) {
        Ok(config) => {
            println!("  ok    Configuration valid");

            if config.has_chat_key() {
                println!("  ok    Anthropic API key configured");
                match prepwire_providers::build_from_config(&config) {
                    Ok(upstreams) => println!("  ok    Chat upstream ready ({})", upstreams.chat.name()),
                    Err(e) => {
                        println!("  err   Chat upstream could not be built: {e}");
                        issues += 1;
                    }
                }
            } else {
                println!("  err   No Anthropic API key: set ANTHROPIC_API_KEY");
                issues += 1;
            }

            if config.has_speech_key() {
                println!("  ok    OpenAI API key configured (audio enabled)");
            } else {
                println!("  warn  No OpenAI API key: audio responses and /api/tts are disabled");
            }

            if config.gateway.shared_secret.is_none() {
                println!("  warn  No shared secret: the API is open to anyone who can reach it");
            }
        }
        Err(e) => {
            println!("  err   Configuration invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
