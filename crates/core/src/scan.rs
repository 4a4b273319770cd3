//! Source and mock file discovery

use crate::{
    config::Config,
    error::{Error, Result},
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

const SWIFT_EXTENSION: &str = "swift";

/// Files a run works on, both lists sorted and free of duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFiles {
    pub sources: Vec<PathBuf>,
    pub mocks: Vec<PathBuf>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// True for `.swift` files whose stem does not end in one of `exclude_suffixes`
pub fn is_candidate(path: &Path, exclude_suffixes: &[String]) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some(SWIFT_EXTENSION) {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    !exclude_suffixes
        .iter()
        .any(|suffix| !suffix.is_empty() && stem.ends_with(suffix.as_str()))
}

/// Recursively collect Swift files under `dirs`, skipping hidden entries
pub fn scan_dirs(dirs: &[PathBuf], exclude_suffixes: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            return Err(Error::ConfigError(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = entry.map_err(|e| Error::Other(format!("failed to walk {}: {e}", dir.display())))?;
            if entry.file_type().is_file() && is_candidate(entry.path(), exclude_suffixes) {
                files.push(entry.into_path());
            } else {
                trace!("Skipping {}", entry.path().display());
            }
        }
    }
    Ok(sorted(files))
}

/// Read a newline-separated list of paths
pub fn read_file_list(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Explicit file inputs are filtered the same way as scanned ones
fn filter_files(files: Vec<PathBuf>, exclude_suffixes: &[String]) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|p| is_candidate(p, exclude_suffixes))
        .collect()
}

fn sorted(mut files: Vec<PathBuf>) -> Vec<PathBuf> {
    files.sort();
    files.dedup();
    files
}

/// Resolve every input named by `config` to concrete file paths
pub fn collect(config: &Config) -> Result<ScannedFiles> {
    let excludes = &config.exclude_suffixes;

    let sources = if config.source_dirs.is_empty() {
        let mut files = config.source_files.clone();
        if let Some(list) = &config.file_list {
            files.extend(read_file_list(list)?);
        }
        sorted(filter_files(files, excludes))
    } else {
        scan_dirs(&config.source_dirs, excludes)?
    };

    let mut mocks = config.mock_files.clone();
    if let Some(list) = &config.dep_file_list {
        mocks.extend(read_file_list(list)?);
    }
    if !config.mock_dirs.is_empty() {
        mocks.extend(scan_dirs(&config.mock_dirs, &[])?);
    }
    let mocks = sorted(filter_files(mocks, &[]));

    debug!(
        "Found {} source file(s) and {} mock file(s)",
        sources.len(),
        mocks.len()
    );
    Ok(ScannedFiles { sources, mocks })
}
