//! Configuration management for swiftmock

mod settings;
mod validation;

// Re-export main types
pub use settings::{CONFIG_FILE_NAMES, Config, DEFAULT_ANNOTATION};
