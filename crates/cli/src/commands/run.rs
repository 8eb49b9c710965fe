//! `mailgate run`: start a run for one email.

use anyhow::Context;
use mailgate_core::inbound::InboundMessage;
use std::path::Path;

use super::runtime::Runtime;

pub async fn run(config_path: Option<&Path>, message: &Path) -> anyhow::Result<()> {
    let message = read_message(message)?;
    let runtime = Runtime::build(config_path).await?;

    let outcome = runtime.controller.start(message).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn read_message(path: &Path) -> anyhow::Result<InboundMessage> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a valid email JSON", path.display()))
}
