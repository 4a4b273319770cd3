//! Entity extraction: one [`Entity`] per annotated protocol or class, or per
//! mock class when reading previously generated output.

use crate::{
    annotation::parse_annotation,
    error::Result,
    parser::SyntaxProvider,
    types::{AccessLevel, Entity, EntityKind, ImportDecl, SourceTree, TypeDecl, TypeKind},
};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractMode {
    /// Only declarations whose doc comment carries the annotation
    Annotated { annotation: String },
    /// Every class is a stand-in from an earlier run
    ProcessExisting,
}

/// Everything extraction produced for one file
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub path: PathBuf,
    pub entities: Vec<Entity>,
    pub imports: Vec<ImportDecl>,
}

/// Build entities from an already parsed tree
pub fn extract(tree: &SourceTree, path: &Path, mode: &ExtractMode) -> Extraction {
    let entities = tree
        .types
        .iter()
        .filter_map(|decl| entity_for(decl, path, mode))
        .collect();

    Extraction {
        path: path.to_path_buf(),
        entities,
        imports: tree.imports.clone(),
    }
}

/// Read, parse and extract one file.
///
/// In annotated mode a file that never mentions the annotation is skipped
/// without parsing.
pub fn extract_file(
    provider: &dyn SyntaxProvider,
    path: &Path,
    mode: &ExtractMode,
) -> Result<Extraction> {
    let source = std::fs::read_to_string(path)?;
    if let ExtractMode::Annotated { annotation } = mode {
        if !source.contains(annotation.as_str()) {
            return Ok(Extraction {
                path: path.to_path_buf(),
                ..Default::default()
            });
        }
    }

    let tree = provider.parse_source(&source)?;
    if tree.has_errors {
        debug!("{} contains syntax errors, extracting what parsed", path.display());
    }
    Ok(extract(&tree, path, mode))
}

fn entity_for(decl: &TypeDecl, path: &Path, mode: &ExtractMode) -> Option<Entity> {
    let (kind, metadata) = match mode {
        ExtractMode::Annotated { annotation } => {
            let kind = match decl.kind {
                TypeKind::Protocol => EntityKind::Protocol,
                TypeKind::Class => EntityKind::Class,
                _ => return None,
            };
            let metadata = parse_annotation(&decl.leading_comments, annotation)?;
            (kind, Some(metadata))
        }
        ExtractMode::ProcessExisting => {
            if decl.kind != TypeKind::Class {
                return None;
            }
            (EntityKind::StandIn, None)
        }
    };

    let is_processed = kind == EntityKind::StandIn;
    Some(Entity {
        name: decl.name.clone(),
        kind,
        file_path: path.to_path_buf(),
        span: decl.info.span,
        access: decl.info.access().unwrap_or(AccessLevel::Internal),
        attributes: decl.info.attributes.clone(),
        inheritance: decl.inheritance.clone(),
        raw_members: decl.members.clone(),
        members: Vec::new(),
        is_annotated: metadata.is_some(),
        metadata,
        is_processed,
        is_final: decl.info.has_modifier("final"),
        has_blank_init: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SwiftParser;
    use std::fs;
    use tempfile::TempDir;

    fn annotated() -> ExtractMode {
        ExtractMode::Annotated {
            annotation: "@mockable".to_string(),
        }
    }

    fn extract_text(source: &str, mode: &ExtractMode) -> Extraction {
        let tree = SwiftParser::new().unwrap().parse_source(source).unwrap();
        extract(&tree, Path::new("Sources/Service.swift"), mode)
    }

    #[test]
    fn test_only_annotated_declarations_become_entities() {
        let source = r#"
/// @mockable
protocol Greeter: Parent {
    func greet() -> String
}

protocol Parent {
    func helloParent()
}

/// @mockable
struct Value {}
"#;
        let extraction = extract_text(source, &annotated());
        assert_eq!(extraction.entities.len(), 1);
        let greeter = &extraction.entities[0];
        assert_eq!(greeter.name, "Greeter");
        assert_eq!(greeter.kind, EntityKind::Protocol);
        assert_eq!(greeter.inheritance, vec!["Parent"]);
        assert!(greeter.is_annotated);
        assert!(!greeter.is_processed);
    }

    #[test]
    fn test_annotated_class() {
        let source = r#"
/// @mockable(module: prefix = App)
public final class Store {
    func save() {}
}
"#;
        let extraction = extract_text(source, &annotated());
        let store = &extraction.entities[0];
        assert_eq!(store.kind, EntityKind::Class);
        assert_eq!(store.access, AccessLevel::Public);
        assert!(store.is_final);
        assert_eq!(store.module_prefix(), Some("App"));
    }

    #[test]
    fn test_process_existing_reads_every_class() {
        let source = r#"
import Foundation

class ParentMock: Parent {
    private var _doneInit = false
    var helloParentCallCount = 0
    func helloParent() {
        helloParentCallCount += 1
    }
}

protocol Other {}
"#;
        let extraction = extract_text(source, &ExtractMode::ProcessExisting);
        assert_eq!(extraction.entities.len(), 1);
        let stand_in = &extraction.entities[0];
        assert_eq!(stand_in.kind, EntityKind::StandIn);
        assert_eq!(stand_in.mocked_name(), "Parent");
        assert!(stand_in.is_processed);
        assert_eq!(extraction.imports, vec![ImportDecl::new("import Foundation")]);
    }

    #[test]
    fn test_extract_file_skips_files_without_annotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Plain.swift");
        fs::write(&path, "protocol Plain { func run() }\n").unwrap();

        let parser = SwiftParser::new().unwrap();
        let extraction = extract_file(&parser, &path, &annotated()).unwrap();
        assert!(extraction.entities.is_empty());
        assert!(extraction.imports.is_empty());
    }

    #[test]
    fn test_extract_file_reports_missing_file() {
        let parser = SwiftParser::new().unwrap();
        let result = extract_file(&parser, Path::new("/nonexistent/File.swift"), &annotated());
        assert!(result.is_err());
    }
}
