//! `rolelog onboard`: first-time setup.

use rolelog_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("rolelog: First-Time Setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.logs.dir.exists() {
        std::fs::create_dir_all(&config.logs.dir)?;
        println!("✅ Created logs directory: {}", config.logs.dir.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Set gateway.api_keys in {}", config_path.display());
    println!("   2. Run: rolelog serve");
    println!(
        "   3. Point your chat client at http://{}:{}/v1\n",
        config.gateway.host, config.gateway.port
    );

    Ok(())
}
