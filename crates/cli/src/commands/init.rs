use anyhow::{Context, Result};
use std::{env, path::Path};
use swiftmock_core::{Config, config::CONFIG_FILE_NAMES};
use tracing::info;

pub fn init_command(cwd: Option<&Path>, force: bool) -> Result<()> {
    // Determine the project root
    let project_root = match cwd {
        Some(cwd) => cwd.to_path_buf(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let project_root = project_root
        .canonicalize()
        .context("Failed to canonicalize project root")?;

    let config_path = project_root.join(CONFIG_FILE_NAMES[0]);
    if config_path.exists() && !force {
        println!("❌ Config already exists at: {}", config_path.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    let config = Config::starter();
    config
        .save_validated(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    info!("Created config: {}", config_path.display());

    println!("✅ Created config: {}", config_path.display());
    println!("\n📌 Edit source_dirs and destination, then run:");
    println!("   swiftmock generate");
    Ok(())
}
