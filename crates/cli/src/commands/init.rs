//! `mailgate init`: write a default config file.

use anyhow::{Context, bail};
use mailgate_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path);
    write_default(&path, force)?;
    println!("Wrote {}", path.display());
    println!("Set api_key there or export MAILGATE_API_KEY before `mailgate run`.");
    Ok(())
}

fn write_default(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_config_that_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailgate").join("config.toml");
        write_default(&path, false).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, AppConfig::default().default_model);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = \"custom\"\n").unwrap();

        assert!(write_default(&path, false).is_err());
        write_default(&path, true).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_ne!(config.default_model, "custom");
    }
}
