use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use swiftmock_core::{Config, Generator};
use tracing::debug;

use crate::cli::GenerateArgs;
use crate::display::print_summary;
use crate::logging;

/// Config file (explicit or discovered from `cwd`) with the flags layered on top
pub fn load_config(args: &GenerateArgs, cwd: &Path) -> Result<Config> {
    let file = match &args.config {
        Some(path) => Some(path.clone()),
        None => Config::find_config_file(cwd),
    };

    let base = match file {
        Some(path) => {
            let config = Config::load_from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(cwd);
            config.rebase(dir)
        }
        None => Config::default(),
    };

    Ok(base.merge(args.to_overrides()))
}

pub fn generate_command(args: &GenerateArgs) -> Result<()> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let config = load_config(args, &cwd)?;
    logging::init(config.logging_level);
    debug!("Effective configuration: {config:?}");

    let generator = Generator::new(config).context("Invalid configuration")?;
    let report = generator.run().context("Failed to generate mocks")?;
    print_summary(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_flags_without_config_file() {
        let dir = TempDir::new().unwrap();
        let args = GenerateArgs {
            source_files: vec![PathBuf::from("A.swift")],
            destination: Some(PathBuf::from("Out.swift")),
            ..Default::default()
        };
        let config = load_config(&args, dir.path()).unwrap();
        assert_eq!(config.source_files, vec![PathBuf::from("A.swift")]);
        assert_eq!(config.destination, Some(PathBuf::from("Out.swift")));
    }

    #[test]
    fn test_discovered_config_is_rebased_and_overridden() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("App/Sources");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(".swiftmock.json"),
            r#"{ "source_dirs": ["App"], "destination": "Mocks.swift", "header": "// mocks" }"#,
        )
        .unwrap();

        let args = GenerateArgs {
            destination: Some(PathBuf::from("/elsewhere/Out.swift")),
            ..Default::default()
        };
        let config = load_config(&args, &nested).unwrap();
        assert_eq!(config.source_dirs, vec![dir.path().join("App")]);
        assert_eq!(config.destination, Some(PathBuf::from("/elsewhere/Out.swift")));
        assert_eq!(config.header.as_deref(), Some("// mocks"));
    }

    #[test]
    fn test_broken_explicit_config_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, "{ not json").unwrap();
        let args = GenerateArgs {
            config: Some(path),
            ..Default::default()
        };
        let error = load_config(&args, dir.path()).unwrap_err();
        assert!(error.to_string().contains("Failed to load config"));
    }
}
