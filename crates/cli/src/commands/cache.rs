//! `responder cache` — Response cache maintenance.

use super::{CmdResult, load_config, open_cache};
use std::path::Path;

pub async fn stats(config_path: Option<&Path>) -> CmdResult {
    let config = load_config(config_path)?;
    let cache = open_cache(&config.cache).await?;
    let stats = cache.stats().await?;

    println!("🗄️  Response Cache");
    println!("==================");
    println!("  Backend:    {}", cache.name());
    println!("  TTL:        {}h", config.cache.ttl_hours);
    println!("  Retention:  {} days", config.cache.retention_days);
    println!("  Entries:    {}", stats.entries);
    println!("  Total uses: {}", stats.total_uses);

    if cache.name() == "sqlite" && config.cache.path.exists() {
        let size_kb = std::fs::metadata(&config.cache.path)?.len() as f64 / 1024.0;
        println!("  DB file:    {} ({size_kb:.1} KB)", config.cache.path.display());
    }
    Ok(())
}

pub async fn clean(config_path: Option<&Path>, days: Option<u32>) -> CmdResult {
    let config = load_config(config_path)?;
    let cache = open_cache(&config.cache).await?;

    let days = days.unwrap_or(config.cache.retention_days);
    let removed = cache.clean(chrono::Duration::days(i64::from(days))).await?;

    println!("🧹 Removed {removed} cache entries unused for more than {days} days");
    Ok(())
}
