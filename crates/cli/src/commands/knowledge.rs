//! `responder create-kb`, `responder index`, `responder search`.

use super::{CmdResult, load_config};
use responder_agent::engine::index_from_config;
use responder_knowledge::{KnowledgeBaseFactory, default_factory};
use std::path::Path;

pub async fn create_kb(
    config_path: Option<&Path>,
    name: &str,
    sources: &[String],
    from: Option<&Path>,
) -> CmdResult {
    let config = load_config(config_path)?;

    let factory = match from {
        Some(dir) => KnowledgeBaseFactory::from_dir(dir)?,
        None => default_factory(),
    };
    if factory.is_empty() {
        return Err("No knowledge sources found".into());
    }

    let selected: Vec<&str> = sources.iter().map(String::as_str).collect();
    let selected = (!selected.is_empty()).then_some(selected.as_slice());

    let path = factory.build_kb(&config.knowledge.dir, name, selected)?;
    println!("✅ Knowledge base written: {}", path.display());
    println!("   Sources: {}", factory.source_names().join(", "));
    println!("   Run `responder index` to refresh the embedding index.");
    Ok(())
}

pub async fn index(config_path: Option<&Path>) -> CmdResult {
    let config = load_config(config_path)?;
    let index = index_from_config(&config);

    let count = index.build().await?;
    let store = index.store().await;

    println!("📚 Knowledge index rebuilt");
    println!("   Bases:    {}", store.len());
    println!("   Entries:  {}", store.entry_count());
    println!("   Indexed:  {count}");
    println!("   Embedder: {}", index.embedder().name());
    println!("   Cache:    {}", config.knowledge.embedding_cache.display());
    Ok(())
}

pub async fn search(config_path: Option<&Path>, query: &str, top_k: usize) -> CmdResult {
    let config = load_config(config_path)?;
    let index = index_from_config(&config);

    println!("🔍 Searching knowledge for: \"{query}\"\n");

    let hits = index.retrieve(query, top_k).await?;
    if hits.is_empty() {
        println!("   No entries indexed. Run `responder create-kb` and `responder index`.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("  {:>2}. [score: {:.3}] {}", i + 1, hit.score, hit.key);
        let preview: String = hit.text.chars().take(100).collect();
        println!("      {preview}");
    }
    Ok(())
}
