//! `prepwire config`: configuration management commands.

use std::path::Path;

use prepwire_config::AppConfig;
use prepwire_security::{REDACTED, contains_secret};

use super::{config_file, load_config};

/// Copy of `config` with every credential replaced, safe to print.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut copy = config.clone();
    for secret in [
        &mut copy.upstream.anthropic_api_key,
        &mut copy.upstream.openai_api_key,
        &mut copy.gateway.shared_secret,
    ] {
        if secret.is_some() {
            *secret = Some(REDACTED.into());
        }
    }
    copy
}

/// Human-readable warnings for a config that loads but may not serve well.
pub fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if !config.has_chat_key() {
        warnings.push("No Anthropic API key (set ANTHROPIC_API_KEY): the gateway will not start");
    }
    if !config.has_speech_key() {
        warnings.push("No OpenAI API key (set OPENAI_API_KEY): audio is disabled");
    }
    if config.gateway.host == "0.0.0.0" && config.gateway.shared_secret.is_none() {
        warnings.push("Gateway bound to 0.0.0.0 without a shared secret");
    }
    if config.gateway.expose_error_details {
        warnings.push("Error details are exposed to clients (development mode)");
    }

    warnings
}

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match load_config(config_path) {
        Ok(config) => {
            println!("   ok   Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ok   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warn {w}");
                }
            }

            println!();
            println!("   Model:     {}", config.model);
            println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
            println!(
                "   Interview: feedback after {} answers",
                config.interview.final_after
            );
        }
        Err(e) => {
            println!("   err  Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Redacted TOML for `config show`. Refuses to render if a credential
/// still appears anywhere in the output, e.g. when a key was pasted into a
/// non-secret field.
pub fn render(config: &AppConfig) -> Result<String, Box<dyn std::error::Error>> {
    let rendered = toml::to_string_pretty(&redacted(config))?;
    if contains_secret(&rendered, &config.secrets()) {
        return Err("A credential appears in a non-secret config field; refusing to print".into());
    }
    Ok(rendered)
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render(&config)?);
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_file(config_path).display());
    Ok(())
}

pub async fn init(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_file(config_path);
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Created {}", path.display());
    println!("Set ANTHROPIC_API_KEY (and OPENAI_API_KEY for audio), then run `prepwire serve`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = config_file(None);
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = config_file(Some(Path::new("/etc/prepwire.toml")));
        assert_eq!(path, Path::new("/etc/prepwire.toml"));
    }

    #[test]
    fn redacted_hides_every_secret() {
        let mut config = AppConfig::default();
        config.upstream.anthropic_api_key = Some("sk-ant-real".into());
        config.upstream.openai_api_key = Some("sk-openai-real".into());
        config.gateway.shared_secret = Some("hunter2".into());

        let shown = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!shown.contains("sk-ant-real"));
        assert!(!shown.contains("sk-openai-real"));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn render_hides_secrets() {
        let mut config = AppConfig::default();
        config.upstream.anthropic_api_key = Some("sk-ant-render-test".into());
        config.gateway.shared_secret = Some("open-sesame".into());

        let shown = render(&config).unwrap();
        assert!(!shown.contains("sk-ant-render-test"));
        assert!(!shown.contains("open-sesame"));
        assert!(shown.contains("[gateway]"));
    }

    #[test]
    fn render_refuses_leaked_credential() {
        let mut config = AppConfig::default();
        config.upstream.anthropic_api_key = Some("sk-ant-pasted-twice".into());
        config.model = "sk-ant-pasted-twice".into();
        assert!(render(&config).is_err());
    }

    #[test]
    fn warnings_flag_missing_keys() {
        let config = AppConfig::default();
        let warnings = warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("ANTHROPIC_API_KEY")));
        assert!(warnings.iter().any(|w| w.contains("OPENAI_API_KEY")));
    }

    #[tokio::test]
    async fn init_writes_loadable_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        init(Some(&path)).await.unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 3000);
    }
}
