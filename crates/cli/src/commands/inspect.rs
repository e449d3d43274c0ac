//! `responder intent`, `responder persona`, `responder prompt` — look at the
//! pipeline's intermediate results without calling the provider.

use super::{CmdResult, ConversationArgs, build_engine, load_config};
use responder_agent::prompt::token;
use responder_agent::{IntentClassifier, PersonaRegistry, PersonaResolver};
use std::path::Path;
use std::sync::Arc;

pub fn intent(message: &str) -> CmdResult {
    let intents = IntentClassifier::new().detect(message);

    println!("🏷️  Intents for: \"{message}\"");
    for (label, score) in intents.iter() {
        println!("   {label:<22} {score}");
    }
    println!("   primary: {}", intents.primary());
    Ok(())
}

pub fn persona(config_path: Option<&Path>, identity: &str) -> CmdResult {
    let config = load_config(config_path)?;
    let resolver = PersonaResolver::new(Arc::new(PersonaRegistry::from_config(&config.persona)));

    let persona = resolver.resolve(identity);
    println!("{}", serde_json::to_string_pretty(&persona)?);
    Ok(())
}

pub async fn prompt(
    config_path: Option<&Path>,
    conversation: &ConversationArgs,
    message: &str,
) -> CmdResult {
    let config = load_config(config_path)?;
    let engine = build_engine(&config, &conversation.identity).await?;

    let prepared = engine.prepare(&conversation.key(), message).await;
    let prompt = prepared.prompt();

    println!("---[ Prompt Start ]---");
    println!("{prompt}");
    println!("---[ Prompt End ]---");
    println!(
        "Intents: {} | Token estimate: ~{} (chars) / ~{} (words)",
        prepared.intents,
        prepared.context.estimated_tokens(),
        token::estimate_tokens_by_words(&prompt)
    );
    Ok(())
}
