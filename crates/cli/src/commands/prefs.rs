//! `mailgate prefs`: show or reset a preference namespace.

use mailgate_memory::PreferenceNamespace;
use std::path::Path;

use super::runtime::Runtime;

pub async fn run(config_path: Option<&Path>, namespace: &str, reset: bool) -> anyhow::Result<()> {
    let namespace: PreferenceNamespace = namespace.parse()?;
    let runtime = Runtime::build(config_path).await?;

    if reset {
        let removed = runtime.prefs.reset(namespace).await?;
        eprintln!("Reset {namespace} ({removed} item(s) removed)");
    }
    println!("{}", runtime.prefs.read(namespace).await?);
    Ok(())
}
