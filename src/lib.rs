//! Fixture helpers shared by the workspace integration tests

use std::fs;
use std::path::{Path, PathBuf};
use swiftmock_core::{Config, GenerationReport, Generator, Result};
use tempfile::TempDir;

/// A throwaway project directory with a `Sources/` folder
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("Sources"))?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `text` to `relative`, creating parent directories
    pub fn write(&self, relative: &str, text: &str) -> std::io::Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        Ok(path)
    }

    /// Write `text` as `Sources/<name>`
    pub fn source(&self, name: &str, text: &str) -> std::io::Result<PathBuf> {
        self.write(&format!("Sources/{name}"), text)
    }

    /// Configuration scanning `Sources/` and writing `destination`
    pub fn config(&self, destination: &str, limit: usize) -> Config {
        Config {
            source_dirs: vec![self.root().join("Sources")],
            destination: Some(self.root().join(destination)),
            concurrency_limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn generate(&self, config: Config) -> Result<GenerationReport> {
        Generator::new(config)?.run()
    }
}

/// Text of the mock class named `mock` inside generated output
pub fn mock_body<'a>(output: &'a str, mock: &str) -> Option<&'a str> {
    let start = output.find(&format!("class {mock}:"))?;
    let rest = &output[start..];
    let end = rest.find("\n}").map(|i| i + 2).unwrap_or(rest.len());
    Some(&rest[..end])
}
