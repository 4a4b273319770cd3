//! Checks run before any file is scanned

use crate::{
    config::Config,
    error::{Error, Result},
};
use std::path::Path;

impl Config {
    /// Reject configurations a run could not start from
    pub fn validate(&self) -> Result<()> {
        if self.destination.is_none() {
            return Err(Error::ConfigError(
                "no destination given; pass --destination or set `destination`".to_string(),
            ));
        }
        if !self.has_sources() {
            return Err(Error::ConfigError(
                "no sources given; pass --sourcedirs, --sourcefiles or --filelist".to_string(),
            ));
        }
        let has_files = !self.source_files.is_empty() || self.file_list.is_some();
        if !self.source_dirs.is_empty() && has_files {
            return Err(Error::ConfigError(
                "source directories and source files are mutually exclusive".to_string(),
            ));
        }
        if let Some(annotation) = &self.annotation {
            if annotation.is_empty() || annotation.chars().any(char::is_whitespace) {
                return Err(Error::ConfigError(format!(
                    "annotation {annotation:?} must be a single non-empty word"
                )));
            }
        }
        if self.concurrency_limit == Some(0) {
            return Err(Error::ConfigError(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if let Some(level) = self.logging_level {
            if level > 3 {
                return Err(Error::ConfigError(format!(
                    "logging level {level} is out of range 0-3"
                )));
            }
        }
        Ok(())
    }

    /// Save with validation
    pub fn save_validated(&self, path: &Path) -> Result<()> {
        self.validate()?;
        self.save_to_file(path)
    }
}
