//! `crmpilot init` — write a starter config file.

use crmpilot_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");

    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("Wrote starter config to {}", path.display());
    println!("Fill in provider.api_key and the [crm] credentials, then run `crmpilot doctor`.");
    Ok(())
}
