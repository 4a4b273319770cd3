use super::{AccessLevel, Decl, Member, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Annotated protocol
    Protocol,
    /// Annotated class, mocked by subclassing
    Class,
    /// Mock class generated by an earlier run
    StandIn,
}

/// Arguments carried by the annotation, e.g.
/// `@mockable(typealias: T = Any; module: prefix = Core; var: events = BehaviorSubject)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    pub type_aliases: BTreeMap<String, String>,
    pub module: Option<String>,
    pub var_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub file_path: PathBuf,
    pub span: Span,
    pub access: AccessLevel,
    pub attributes: Vec<String>,
    /// Parent names in declared order, without module qualifiers or generic arguments
    pub inheritance: Vec<String>,
    pub raw_members: Vec<Decl>,
    /// Filled in by the member modeler
    pub members: Vec<Member>,
    pub is_annotated: bool,
    pub metadata: Option<AnnotationMetadata>,
    pub is_processed: bool,
    pub is_final: bool,
    pub has_blank_init: bool,
}

impl Entity {
    pub fn mock_name(&self) -> String {
        match self.kind {
            EntityKind::StandIn => self.name.clone(),
            _ => format!("{}Mock", self.name),
        }
    }

    /// Name of the mocked type for a stand-in (`FooMock` gives `Foo`)
    pub fn mocked_name(&self) -> &str {
        match self.kind {
            EntityKind::StandIn => self.name.strip_suffix("Mock").unwrap_or(&self.name),
            _ => &self.name,
        }
    }

    pub fn is_protocol(&self) -> bool {
        self.kind == EntityKind::Protocol
    }

    pub fn module_prefix(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.module.as_deref())
    }
}
