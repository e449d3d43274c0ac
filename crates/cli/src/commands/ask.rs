//! `responder ask` — Produce one reply through the full pipeline.

use super::{CmdResult, ConversationArgs, build_engine, load_config};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    conversation: &ConversationArgs,
    message: &str,
) -> CmdResult {
    let config = load_config(config_path)?;

    if config.api_key_for(&conversation.identity).is_none() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  WARNING: No API key configured for '{}'.", conversation.identity);
        eprintln!("  Set OPENAI_API_KEY (or OPENAI_API_{}) or add api_key to:", conversation.identity.to_uppercase());
        eprintln!("    {}", responder_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!("  The fallback reply will be returned.");
        eprintln!();
    }

    let engine = build_engine(&config, &conversation.identity).await?;
    let reply = engine.respond(&conversation.key(), message).await;

    println!("{}", reply.text);
    Ok(())
}
