//! Output assembly: ordering, import block and file layout

use crate::{
    error::Result,
    render::RenderedEntity,
    types::ImportDecl,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

const RX_IMPORT: &str = "import RxSwift";

/// Decoration applied around the generated mocks
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions<'a> {
    pub header: Option<&'a str>,
    pub macro_name: Option<&'a str>,
    pub testable_imports: &'a [String],
    /// A template needed an import no source file provides
    pub custom_imports: bool,
}

/// Order mocks by the offset of the declaration they mock. Ties fall back to
/// the file path so the result never depends on which unit finished first.
pub fn order_entities(entities: &mut [RenderedEntity]) {
    entities.sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.path.cmp(&b.path)));
}

/// Build the import section: plain imports first, then one `#if` block per
/// distinct guard
pub fn import_block(imports: &[ImportDecl], options: &OutputOptions<'_>) -> String {
    let testable: BTreeSet<&str> = options.testable_imports.iter().map(String::as_str).collect();
    let rewrite = |import: &ImportDecl| -> String {
        match import.module() {
            Some(module) if testable.contains(module) => format!("@testable import {module}"),
            _ => import.statement.clone(),
        }
    };

    let mut plain: BTreeSet<String> = BTreeSet::new();
    let mut guarded: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for import in imports {
        match import.guard.as_deref() {
            None => {
                plain.insert(rewrite(import));
            }
            Some(guard) => {
                guarded.entry(guard).or_default().insert(rewrite(import));
            }
        }
    }
    for module in &testable {
        plain.insert(format!("@testable import {module}"));
    }
    if options.custom_imports {
        plain.insert(RX_IMPORT.to_string());
    }

    // A testable import supersedes the plain one for the same module
    let superseded: Vec<String> = plain
        .iter()
        .filter_map(|line| line.strip_prefix("@testable "))
        .map(str::to_string)
        .collect();
    for line in superseded {
        plain.remove(&line);
    }

    let mut lines: Vec<String> = plain.into_iter().collect();
    for (guard, statements) in guarded {
        lines.push(format!("#if {guard}"));
        lines.extend(statements);
        lines.push("#endif".to_string());
    }
    lines.join("\n")
}

/// Lay out the final file. Ends with exactly one newline.
pub fn assemble(
    mut entities: Vec<RenderedEntity>,
    imports: &[ImportDecl],
    options: &OutputOptions<'_>,
) -> String {
    order_entities(&mut entities);

    let mut sections: Vec<String> = Vec::new();
    if let Some(header) = options.header.filter(|h| !h.is_empty()) {
        sections.push(header.to_string());
    }
    if let Some(name) = options.macro_name {
        sections.push(format!("#if {name}"));
    }
    let block = import_block(imports, options);
    if !block.is_empty() {
        sections.push(block);
    }
    let body: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
    if !body.is_empty() {
        sections.push(body.join("\n\n"));
    }
    if options.macro_name.is_some() {
        sections.push("#endif".to_string());
    }

    let mut text = sections.join("\n\n");
    text.push('\n');
    text
}

/// Write the assembled text, creating missing parent directories
pub fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}
