use crate::{
    error::{Error, Result},
    pipeline::default_limit,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ANNOTATION: &str = "@mockable";

/// Looked up in this order in every directory from the start path upwards
pub const CONFIG_FILE_NAMES: [&str; 2] = [".swiftmock.json", "swiftmock.json"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    // Inputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_dirs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_list: Option<PathBuf>,

    // Previously generated mocks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mock_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mock_dirs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dep_file_list: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_suffixes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    // Output decoration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub testable_imports: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,
    /// 0 info, 1 debug, 2 warning, 3 error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging_level: Option<u8>,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Starter configuration written by `swiftmock init`
    pub fn starter() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("Sources")],
            destination: Some(PathBuf::from("Tests/Mocks/GeneratedMocks.swift")),
            exclude_suffixes: vec!["Tests".to_string(), "Mocks".to_string()],
            annotation: Some(DEFAULT_ANNOTATION.to_string()),
            ..Default::default()
        }
    }

    /// Layer `overrides` (usually command-line flags) on top of this config.
    ///
    /// Any source given in `overrides` replaces all sources from the file, so
    /// a file's `source_dirs` never clashes with `--sourcefiles`.
    pub fn merge(mut self, overrides: Config) -> Config {
        let overrides_sources = !overrides.source_dirs.is_empty()
            || !overrides.source_files.is_empty()
            || overrides.file_list.is_some();
        if overrides_sources {
            self.source_dirs = overrides.source_dirs;
            self.source_files = overrides.source_files;
            self.file_list = overrides.file_list;
        }

        replace_if_set(&mut self.mock_files, overrides.mock_files);
        replace_if_set(&mut self.mock_dirs, overrides.mock_dirs);
        replace_if_set(&mut self.exclude_suffixes, overrides.exclude_suffixes);
        replace_if_set(&mut self.testable_imports, overrides.testable_imports);

        self.dep_file_list = overrides.dep_file_list.or(self.dep_file_list);
        self.destination = overrides.destination.or(self.destination);
        self.annotation = overrides.annotation.or(self.annotation);
        self.header = overrides.header.or(self.header);
        self.macro_name = overrides.macro_name.or(self.macro_name);
        self.concurrency_limit = overrides.concurrency_limit.or(self.concurrency_limit);
        self.logging_level = overrides.logging_level.or(self.logging_level);
        self
    }

    /// Resolve relative paths against `base`, normally the directory holding
    /// the config file
    pub fn rebase(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.source_dirs = self.source_dirs.into_iter().map(join).collect();
        self.source_files = self.source_files.into_iter().map(join).collect();
        self.mock_files = self.mock_files.into_iter().map(join).collect();
        self.mock_dirs = self.mock_dirs.into_iter().map(join).collect();
        self.file_list = self.file_list.map(join);
        self.dep_file_list = self.dep_file_list.map(join);
        self.destination = self.destination.map(join);
        self
    }

    pub fn annotation(&self) -> &str {
        self.annotation.as_deref().unwrap_or(DEFAULT_ANNOTATION)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency_limit.unwrap_or_else(default_limit)
    }

    pub fn has_sources(&self) -> bool {
        !self.source_dirs.is_empty() || !self.source_files.is_empty() || self.file_list.is_some()
    }
}

fn replace_if_set<T>(target: &mut Vec<T>, value: Vec<T>) {
    if !value.is_empty() {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            source_dirs: vec![PathBuf::from("Sources/App")],
            destination: Some(PathBuf::from("Mocks.swift")),
            testable_imports: vec!["App".to_string()],
            concurrency_limit: Some(4),
            ..Default::default()
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"source_dirs\""));
        assert!(json.contains("\"testable_imports\""));
        assert!(!json.contains("\"header\""));

        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let parsed: Config = serde_json::from_str(r#"{ "destination": "Out.swift" }"#).unwrap();
        assert_eq!(parsed.destination, Some(PathBuf::from("Out.swift")));
        assert_eq!(parsed.annotation(), DEFAULT_ANNOTATION);
        assert!(!parsed.has_sources());
        assert!(parsed.concurrency() >= 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".swiftmock.json");
        let config = Config::starter();
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("swiftmock.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("swiftmock.json"), "{}").unwrap();
        assert_eq!(
            Config::find_config_file(&nested),
            Some(dir.path().join("swiftmock.json"))
        );

        fs::write(dir.path().join("a/.swiftmock.json"), "{}").unwrap();
        assert_eq!(
            Config::find_config_file(&nested),
            Some(dir.path().join("a/.swiftmock.json"))
        );
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = Config {
            source_dirs: vec![PathBuf::from("Sources")],
            destination: Some(PathBuf::from("A.swift")),
            header: Some("// file".to_string()),
            exclude_suffixes: vec!["Tests".to_string()],
            ..Default::default()
        };
        let flags = Config {
            source_files: vec![PathBuf::from("One.swift")],
            destination: Some(PathBuf::from("B.swift")),
            ..Default::default()
        };
        let merged = file.merge(flags);
        assert!(merged.source_dirs.is_empty());
        assert_eq!(merged.source_files, vec![PathBuf::from("One.swift")]);
        assert_eq!(merged.destination, Some(PathBuf::from("B.swift")));
        assert_eq!(merged.header.as_deref(), Some("// file"));
        assert_eq!(merged.exclude_suffixes, vec!["Tests".to_string()]);
    }

    #[test]
    fn test_rebase_only_touches_relative_paths() {
        let config = Config {
            source_dirs: vec![PathBuf::from("Sources"), PathBuf::from("/abs/Other")],
            destination: Some(PathBuf::from("Mocks.swift")),
            ..Default::default()
        }
        .rebase(Path::new("/project"));
        assert_eq!(
            config.source_dirs,
            vec![PathBuf::from("/project/Sources"), PathBuf::from("/abs/Other")]
        );
        assert_eq!(config.destination, Some(PathBuf::from("/project/Mocks.swift")));
    }
}
