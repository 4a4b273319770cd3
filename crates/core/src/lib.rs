//! swiftmock - Mock class generation for annotated Swift protocols and classes
//!
//! This crate provides functionality to:
//! - Parse Swift source files and find declarations marked with an annotation
//! - Merge inherited members into one override-correct model per declaration
//! - Render call-counting, handler-driven mock classes
//! - Assemble deterministic output regardless of how work was scheduled
pub mod annotation;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod scan;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use config::Config;
pub use extractor::{ExtractMode, Extraction};
pub use generator::{GenerationReport, Generator};
pub use parser::{SwiftParser, SyntaxProvider};
pub use pipeline::{Executor, Task, TaskFailure};
pub use render::{RenderContext, RenderedEntity};
pub use resolver::{Resolver, TypeKeys};
pub use scan::ScannedFiles;
