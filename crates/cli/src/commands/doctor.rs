//! `crmpilot doctor` — diagnose configuration and connectivity.

use crmpilot_config::AppConfig;
use crmpilot_core::crm::CrmClient;
use crmpilot_memory::SqliteStore;

pub async fn run() -> anyhow::Result<()> {
    println!("CRMPilot Doctor");
    println!("===============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [x] No config file at {} — run `crmpilot init`", config_path.display());
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok] Config loaded");
            config
        }
        Err(e) => {
            println!("  [x] Config invalid: {e}");
            println!("\n  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    match config.validate() {
        Ok(()) => println!("  [ok] Config values valid"),
        Err(e) => {
            println!("  [x] Config validation failed: {e}");
            issues += 1;
        }
    }

    if config.provider.api_key.is_some() {
        println!("  [ok] Provider API key configured");
    } else {
        println!("  [!] No provider API key — set OPENROUTER_API_KEY");
        issues += 1;
    }

    match SqliteStore::new(&config.store.database_path).await {
        Ok(_) => println!("  [ok] Conversation database reachable"),
        Err(e) => {
            println!("  [x] Conversation database: {e}");
            issues += 1;
        }
    }

    if config.has_credentials() {
        match super::crm_client(&config) {
            Ok(crm) => match crm.health_check().await {
                Ok(()) => println!("  [ok] CRM API reachable"),
                Err(e) => {
                    println!("  [x] CRM health check failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  [x] CRM client: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  [!] CRM credentials missing — set CRM_CLIENT_ID / CRM_CLIENT_SECRET / CRM_REFRESH_TOKEN");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
    Ok(())
}
