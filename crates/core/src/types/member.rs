use super::{AccessLevel, Effects, GenericParam, ParamDecl, Span};
use serde::{Deserialize, Serialize};

/// Whether a member was declared in a protocol or in a concrete type.
/// Only concrete members need `override` when re-declared in a subclass mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberOrigin {
    Interface,
    Concrete,
}

/// Callable signature of functions, subscripts and initializers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub effects: Effects,
    pub return_type: Option<String>,
    pub where_clause: Option<String>,
}

impl Signature {
    /// Labels as seen by callers, `_` for unlabeled arguments
    pub fn labels(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|p| p.label.clone().unwrap_or_else(|| "_".to_string()))
            .collect()
    }

    pub fn is_generic_name(&self, name: &str) -> bool {
        self.generic_params.iter().any(|g| g.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalClause {
    pub directive: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberKind {
    Variable {
        type_name: String,
        settable: bool,
        default_value: Option<String>,
        /// Subject type requested through the annotation's `var:`/`rx:` arguments
        var_override: Option<String>,
    },
    Function(Signature),
    Subscript {
        signature: Signature,
        settable: bool,
    },
    TypeAlias {
        value: Option<String>,
        bound: Option<String>,
        is_associated: bool,
        override_value: Option<String>,
    },
    Initializer {
        signature: Signature,
        is_required: bool,
        is_failable: bool,
    },
    Conditional(Vec<ConditionalClause>),
}

/// Discriminant of [`MemberKind`], part of a member's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberTag {
    Variable,
    Function,
    Subscript,
    TypeAlias,
    Initializer,
    Conditional,
}

/// De-duplication identity: name, kind and argument labels
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberKey {
    pub name: String,
    pub tag: MemberTag,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub access: AccessLevel,
    pub is_static: bool,
    pub span: Span,
    pub origin: MemberOrigin,
    /// Read back from a previously generated mock
    pub processed: bool,
    pub attributes: Vec<String>,
    /// Original declaration text, re-emitted verbatim for processed members
    pub source: String,
}

/// Suffixes the renderer appends to a member name for its bookkeeping slots
pub const SCAFFOLDING_SUFFIXES: [&str; 4] = ["SetCallCount", "CallCount", "SetHandler", "Handler"];

impl Member {
    pub fn tag(&self) -> MemberTag {
        match &self.kind {
            MemberKind::Variable { .. } => MemberTag::Variable,
            MemberKind::Function(_) => MemberTag::Function,
            MemberKind::Subscript { .. } => MemberTag::Subscript,
            MemberKind::TypeAlias { .. } => MemberTag::TypeAlias,
            MemberKind::Initializer { .. } => MemberTag::Initializer,
            MemberKind::Conditional(_) => MemberTag::Conditional,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.kind {
            MemberKind::Function(sig) => Some(sig),
            MemberKind::Subscript { signature, .. } => Some(signature),
            MemberKind::Initializer { signature, .. } => Some(signature),
            _ => None,
        }
    }

    pub fn key(&self) -> MemberKey {
        MemberKey {
            name: self.name.clone(),
            tag: self.tag(),
            labels: self.signature().map(Signature::labels).unwrap_or_default(),
        }
    }

    /// Whether this member is a counter, handler or backing store that a
    /// generated mock emits for `owner`
    pub fn is_scaffolding_of(&self, owner: &str) -> bool {
        if self.tag() != MemberTag::Variable || owner.is_empty() {
            return false;
        }
        if self.name == format!("_{owner}") {
            return true;
        }
        let base = self.name.strip_prefix('_').unwrap_or(&self.name);
        base.starts_with(owner) && SCAFFOLDING_SUFFIXES.iter().any(|s| base.ends_with(s))
    }

    /// Members nested in conditional clauses, depth first
    pub fn flatten(&self) -> Vec<&Member> {
        match &self.kind {
            MemberKind::Conditional(clauses) => clauses
                .iter()
                .flat_map(|c| c.members.iter().flat_map(Member::flatten))
                .collect(),
            _ => vec![self],
        }
    }
}
