//! `mailgate pending`: list suspended runs, or show one review request.

use anyhow::{Context, bail};
use mailgate_core::run::RunId;
use mailgate_memory::RunRepository;
use std::path::Path;

use super::runtime::{load_config, open_store};

pub async fn run(config_path: Option<&Path>, run_id: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let runs = RunRepository::new(open_store(&config.store).await?);

    let Some(run_id) = run_id else {
        let suspended = runs.suspended().await.context("Failed to list runs")?;
        if suspended.is_empty() {
            println!("No runs awaiting review.");
        }
        for state in suspended {
            let action = state
                .pending_review()
                .map(|r| r.action_request.action.as_str())
                .unwrap_or("-");
            println!("{}  {}  {}", state.id, action, state.message.subject);
        }
        return Ok(());
    };

    let id = RunId(run_id.to_string());
    let Some(state) = runs.load(&id).await.context("Failed to load run")? else {
        bail!("Run {run_id} not found");
    };
    match state.pending_review() {
        Some(request) => println!("{}", serde_json::to_string_pretty(request)?),
        None => println!("Run {run_id} is {:?}; nothing to review.", state.status),
    }
    Ok(())
}
