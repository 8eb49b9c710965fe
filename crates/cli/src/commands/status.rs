//! `mailgate status`: show configuration and store status.

use mailgate_config::AppConfig;
use mailgate_memory::RunRepository;
use std::path::Path;

use super::runtime::{load_config, open_store};

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let file = config_path.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path);

    println!("mailgate status");
    println!("===============");
    println!("  Config file:  {}", file.display());
    println!("  Endpoint:     {}", config.api_url);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Model:        {}", config.default_model);
    println!("  Extraction:   {}", config.extraction_model());
    println!("  Temperature:  {}", config.default_temperature);
    println!("  Iterations:   {}", config.agent.max_iterations);
    println!("  Reviewable:   {}", config.review.reviewable_actions.join(", "));
    println!("  Store:        {:?} at {}", config.store.backend, config.store.resolved_path().display());

    let runs = RunRepository::new(open_store(&config.store).await?);
    match runs.suspended().await {
        Ok(pending) => println!("  Suspended:    {}", pending.len()),
        Err(e) => println!("  Suspended:    unavailable ({e})"),
    }

    if !file.exists() {
        println!("\n  No config file; run `mailgate init` to write one");
    }
    Ok(())
}
