//! Swift source parsing using tree-sitter

pub mod signature;
pub mod swift_parser;

use crate::{error::Result, types::SourceTree};
use std::path::Path;

// Re-export commonly used items
pub use signature::TypeHeader;
pub use swift_parser::SwiftParser;

/// Turns source text into the declaration tree the extractor walks.
///
/// Implementations must be shareable across the worker pool; a provider that
/// needs mutable parser state should create it per call.
pub trait SyntaxProvider: Send + Sync {
    fn parse_source(&self, source: &str) -> Result<SourceTree>;

    fn parse_file(&self, path: &Path) -> Result<SourceTree> {
        let source = std::fs::read_to_string(path)?;
        self.parse_source(&source)
    }
}
