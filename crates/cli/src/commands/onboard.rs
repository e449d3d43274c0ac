//! `responder onboard` — First-time setup.

use super::{CmdResult, load_config};
use responder_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> CmdResult {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("JTRADE Responder — First-Time Setup");
    println!("===================================\n");

    if config_path.exists() {
        println!("  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config at: {}", config_path.display());
    }

    let config = load_config(Some(&config_path))?;

    for dir in [
        &config.knowledge.dir,
        &config.history.dir,
        &config.persona.profiles_dir,
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created directory: {}", dir.display());
        }
    }

    let kb_path = config
        .knowledge
        .dir
        .join(format!("{}.json", responder_knowledge::store::PRIMARY_BASE));
    if kb_path.exists() {
        println!("  Knowledge base exists: {}", kb_path.display());
    } else {
        let path = responder_knowledge::create_default_kb(&config.knowledge.dir)?;
        println!("✅ Created default knowledge base: {}", path.display());
    }

    println!("\nNext steps:");
    println!("  1. Set your API key:  export OPENAI_API_KEY=\"sk-...\"");
    println!("     (per account:      export OPENAI_API_<IDENTITY>=\"sk-...\")");
    println!("  2. Build the index:   responder index");
    println!("  3. Try a message:     responder ask \"Halo, berapa minimum deposit?\"");

    Ok(())
}
