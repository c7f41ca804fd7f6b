//! `rolelog doctor`: diagnose setup.

use rolelog_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("rolelog Doctor: System Diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `rolelog onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration and re-run doctor.");
            return Ok(());
        }
    };

    if config.gateway.api_keys.iter().any(|k| k == "custom-key") {
        println!("  ⚠️  Default API key `custom-key` in use");
        issues += 1;
    } else {
        println!("  ✅ Custom API key configured");
    }

    // Probe the log directory with a throwaway file
    let logs_dir = &config.logs.dir;
    let marker = logs_dir.join(".rolelog-doctor");
    let writable = std::fs::create_dir_all(logs_dir)
        .and_then(|_| std::fs::write(&marker, b"ok"))
        .and_then(|_| std::fs::remove_file(&marker));
    match writable {
        Ok(()) => println!("  ✅ Log directory writable: {}", logs_dir.display()),
        Err(e) => {
            println!("  ❌ Log directory not writable ({}): {e}", logs_dir.display());
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
