//! `rolelog serve`: start the mock chat-completions server.

use std::path::PathBuf;

use rolelog_config::AppConfig;
use tracing::info;

pub async fn run(
    port_override: Option<u16>,
    logs_dir_override: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Flags override the environment, so validation waits until both are applied.
    let config_path = AppConfig::config_dir().join("config.toml");
    let mut config = AppConfig::load_from(&config_path)
        .map_err(|e| format!("Failed to load config: {e}"))?;
    config.apply_overrides(|name| std::env::var(name).ok())?;

    if let Some(port) = port_override {
        info!(port, "Port set from the command line");
        config.gateway.port = port;
    }
    if let Some(dir) = logs_dir_override {
        info!(dir = %dir.display(), "Logs directory set from the command line");
        config.logs.dir = dir;
    }
    config.validate()?;

    println!("rolelog mock server");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Logs:      {}", config.logs.dir.display());
    println!("   Model:     {}", config.mock.model);
    println!("   API keys:  {}", config.gateway.api_keys.len());

    rolelog_gateway::start(config).await?;

    Ok(())
}
