//! `crmpilot chat` — interactive or single-message chat.
//!
//! This is the transport layer for the CLI: it prints the reply with the
//! file markers stripped, moves generated report files into the working
//! directory, and removes the originals after delivery.

use std::io::Write;
use std::path::Path;

use crmpilot_agent::AgentRunner;
use crmpilot_config::AppConfig;
use crmpilot_core::markers;
use crmpilot_core::store::UserId;

use super::build_runner;

pub async fn run(user: &str, message: Option<String>) -> anyhow::Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
    config.validate()?;

    let (runner, _store) = build_runner(&config).await?;
    let user = UserId::new(user);

    if let Some(msg) = message {
        deliver(&runner, &user, &msg).await;
        return Ok(());
    }

    println!();
    println!("  CRMPilot — Interactive Chat");
    println!("  Model: {}", config.provider.model);
    println!("  Type your message and press Enter. Type 'exit' to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        deliver(&runner, &user, line).await;
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

async fn deliver(runner: &AgentRunner, user: &UserId, message: &str) {
    let reply = runner.process_turn(user, message).await;

    println!();
    for line in markers::strip_send_files(&reply.text).lines() {
        println!("  Assistant > {line}");
    }
    for path in &reply.attachments {
        match deliver_file(path) {
            Ok(dest) => println!("  [saved report: {dest}]"),
            Err(e) => println!("  [could not deliver {}: {e}]", path.display()),
        }
    }
    println!();
}

/// Move a generated artifact into the working directory, then remove the
/// original. Delivery owns the file once the marker reaches the transport.
fn deliver_file(path: &Path) -> anyhow::Result<String> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("attachment has no file name"))?;
    let dest = std::env::current_dir()?.join(name);
    std::fs::copy(path, &dest)?;
    std::fs::remove_file(path)?;
    Ok(dest.display().to_string())
}
