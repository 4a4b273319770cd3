//! Swift text templates for mock classes.
//!
//! Rendering is pure apart from one shared flag: a template that needs an
//! import the sources never mention (RxSwift for subject-backed variables)
//! sets [`RenderContext::custom_imports`] and the output assembler picks it up.

pub mod defaults;
mod entity;
mod method;
mod type_alias;
mod variable;

use crate::resolver::TypeKeys;
use crate::types::AccessLevel;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

pub use defaults::default_value;
pub use entity::render_entity;
pub use method::{OverloadIds, overload_ids};

/// One level of indentation in generated code
pub(crate) const TAB: &str = "    ";

/// Shared, read-only state every render unit sees
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub type_keys: &'a TypeKeys,
    pub custom_imports: &'a AtomicBool,
}

impl<'a> RenderContext<'a> {
    pub fn new(type_keys: &'a TypeKeys, custom_imports: &'a AtomicBool) -> Self {
        Self {
            type_keys,
            custom_imports,
        }
    }
}

/// Text of one mock class plus what the assembler needs to order it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntity {
    pub name: String,
    pub text: String,
    /// Byte offset of the mocked declaration in its source file
    pub offset: usize,
    pub path: PathBuf,
}

/// Per-member facts the templates branch on
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot<'a> {
    pub acl: &'static str,
    pub is_static: bool,
    pub overrides: bool,
    pub mock_name: &'a str,
}

impl Slot<'_> {
    pub fn static_prefix(&self) -> &'static str {
        if self.is_static { "static " } else { "" }
    }

    pub fn override_prefix(&self) -> &'static str {
        if self.overrides { "override " } else { "" }
    }
}

/// Access modifier written on generated declarations. Mocks never go below
/// internal and never need `open`.
pub(crate) fn mock_acl(access: AccessLevel) -> &'static str {
    match access {
        AccessLevel::Public | AccessLevel::Open => "public ",
        AccessLevel::Package => "package ",
        AccessLevel::Internal | AccessLevel::FilePrivate | AccessLevel::Private => "",
    }
}

pub(crate) fn indent(level: usize, line: &str) -> String {
    format!("{}{line}", TAB.repeat(level))
}
