//! `llmbind config`: Configuration management commands.

use anyhow::Context;
use llmbind_config::AppConfig;

pub fn show() -> anyhow::Result<()> {
    let config = super::load_config()?;
    println!("{config:#?}");
    Ok(())
}

pub fn path() {
    println!("{}", config_path().display());
}

pub fn init() -> anyhow::Result<()> {
    let path = config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(AppConfig::config_dir()).context("Failed to create config directory")?;
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}
