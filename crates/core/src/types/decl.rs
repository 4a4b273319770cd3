//! Shape of the syntax tree handed over by a [`SyntaxProvider`](crate::parser::SyntaxProvider).
//!
//! The tree only keeps what mock generation needs: top-level type declarations,
//! their direct members with signatures already split into parts, import
//! statements and conditional-compilation blocks.

use super::Span;
use serde::{Deserialize, Serialize};

/// Swift access level of a declaration
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Private,
    FilePrivate,
    #[default]
    Internal,
    Package,
    Public,
    Open,
}

impl AccessLevel {
    /// Pick the access level out of a modifier list. Setter-only forms such as
    /// `private(set)` do not count.
    pub fn from_modifiers(modifiers: &[String]) -> Option<Self> {
        modifiers.iter().find_map(|m| match m.as_str() {
            "private" => Some(Self::Private),
            "fileprivate" => Some(Self::FilePrivate),
            "internal" => Some(Self::Internal),
            "package" => Some(Self::Package),
            "public" => Some(Self::Public),
            "open" => Some(Self::Open),
            _ => None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::FilePrivate => "fileprivate",
            Self::Internal => "internal",
            Self::Package => "package",
            Self::Public => "public",
            Self::Open => "open",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private | Self::FilePrivate)
    }

    /// Prefix used in generated code. Internal is implicit.
    pub fn prefix(&self) -> String {
        match self {
            Self::Internal => String::new(),
            other => format!("{} ", other.keyword()),
        }
    }
}

/// Keyword that introduces a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Protocol,
    Class,
    Struct,
    Enum,
    Extension,
    Actor,
}

impl TypeKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "protocol" => Some(Self::Protocol),
            "class" => Some(Self::Class),
            "struct" => Some(Self::Struct),
            "enum" => Some(Self::Enum),
            "extension" => Some(Self::Extension),
            "actor" => Some(Self::Actor),
            _ => None,
        }
    }
}

/// Parsed file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTree {
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    /// The provider recovered from syntax errors somewhere in the file
    pub has_errors: bool,
}

/// One import statement, optionally nested in a conditional-compilation block
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Normalized statement text, e.g. `@testable import Foo`
    pub statement: String,
    /// Condition under which the import is compiled
    pub guard: Option<String>,
}

impl ImportDecl {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            guard: None,
        }
    }

    pub fn guarded(statement: impl Into<String>, guard: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            guard: Some(guard.into()),
        }
    }

    /// Name of the imported module (`import class Foo.Bar` gives `Foo`)
    pub fn module(&self) -> Option<&str> {
        let mut words = self.statement.split_whitespace();
        words.find(|w| *w == "import")?;
        let mut target = words.next()?;
        if matches!(
            target,
            "class" | "struct" | "enum" | "protocol" | "func" | "var" | "let" | "typealias"
        ) {
            target = words.next()?;
        }
        target.split('.').next()
    }
}

/// Modifiers, attributes and position shared by every declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclInfo {
    pub modifiers: Vec<String>,
    pub attributes: Vec<String>,
    pub span: Span,
    /// Declaration text, from its first attribute or modifier to its end
    pub text: String,
}

impl DeclInfo {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn access(&self) -> Option<AccessLevel> {
        AccessLevel::from_modifiers(&self.modifiers)
    }

    /// `static` and `class` members both belong to the type
    pub fn is_static(&self) -> bool {
        self.has_modifier("static") || self.has_modifier("class")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDecl {
    /// External label; `None` when the call site passes the argument unlabeled
    pub label: Option<String>,
    pub name: String,
    pub type_name: String,
    pub is_variadic: bool,
    pub is_inout: bool,
    pub default_value: Option<String>,
}

/// Effects written after a parameter clause
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Effects {
    pub is_async: bool,
    /// `throws`, `throws(SomeError)` or `rethrows`
    pub throws: Option<String>,
}

impl Effects {
    pub fn throws(&self) -> bool {
        self.throws.is_some()
    }

    pub fn rethrows(&self) -> bool {
        self.throws.as_deref() == Some("rethrows")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub info: DeclInfo,
    pub kind: TypeKind,
    pub name: String,
    pub generic_params: Vec<GenericParam>,
    pub inheritance: Vec<String>,
    /// Comment lines directly above the declaration
    pub leading_comments: String,
    pub members: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub info: DeclInfo,
    pub name: String,
    pub type_name: Option<String>,
    pub is_let: bool,
    pub default_value: Option<String>,
    pub settable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub info: DeclInfo,
    pub name: String,
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub effects: Effects,
    pub return_type: Option<String>,
    pub where_clause: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptDecl {
    pub info: DeclInfo,
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub effects: Effects,
    pub return_type: String,
    pub where_clause: Option<String>,
    pub settable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDecl {
    pub info: DeclInfo,
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub effects: Effects,
    pub is_failable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub info: DeclInfo,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssociatedTypeDecl {
    pub info: DeclInfo,
    pub name: String,
    pub bound: Option<String>,
    pub default_value: Option<String>,
}

/// `#if` / `#elseif` / `#else` block with its members
#[derive(Debug, Clone, PartialEq)]
pub struct IfConfigDecl {
    pub span: Span,
    pub text: String,
    pub clauses: Vec<IfClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    /// Directive line that opens the clause, e.g. `#if DEBUG` or `#else`
    pub directive: String,
    pub members: Vec<Decl>,
}

impl IfClause {
    /// Condition text without the directive keyword; empty for `#else`
    pub fn condition(&self) -> &str {
        let directive = self.directive.trim();
        ["#elseif", "#if", "#else"]
            .iter()
            .find_map(|kw| directive.strip_prefix(kw))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Member declaration inside a type body
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Type(Box<TypeDecl>),
    Variable(VarDecl),
    Function(FuncDecl),
    Subscript(SubscriptDecl),
    Initializer(InitDecl),
    TypeAlias(TypeAliasDecl),
    AssociatedType(AssociatedTypeDecl),
    IfConfig(IfConfigDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Type(d) => d.info.span,
            Decl::Variable(d) => d.info.span,
            Decl::Function(d) => d.info.span,
            Decl::Subscript(d) => d.info.span,
            Decl::Initializer(d) => d.info.span,
            Decl::TypeAlias(d) => d.info.span,
            Decl::AssociatedType(d) => d.info.span,
            Decl::IfConfig(d) => d.span,
        }
    }

    /// Shared info, absent for conditional blocks
    pub fn info(&self) -> Option<&DeclInfo> {
        match self {
            Decl::Type(d) => Some(&d.info),
            Decl::Variable(d) => Some(&d.info),
            Decl::Function(d) => Some(&d.info),
            Decl::Subscript(d) => Some(&d.info),
            Decl::Initializer(d) => Some(&d.info),
            Decl::TypeAlias(d) => Some(&d.info),
            Decl::AssociatedType(d) => Some(&d.info),
            Decl::IfConfig(_) => None,
        }
    }

    pub fn info_mut(&mut self) -> Option<&mut DeclInfo> {
        match self {
            Decl::Type(d) => Some(&mut d.info),
            Decl::Variable(d) => Some(&mut d.info),
            Decl::Function(d) => Some(&mut d.info),
            Decl::Subscript(d) => Some(&mut d.info),
            Decl::Initializer(d) => Some(&mut d.info),
            Decl::TypeAlias(d) => Some(&mut d.info),
            Decl::AssociatedType(d) => Some(&mut d.info),
            Decl::IfConfig(_) => None,
        }
    }
}
