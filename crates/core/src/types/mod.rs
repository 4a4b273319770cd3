mod decl;
mod entity;
mod member;
mod resolved;
mod span;

pub use decl::{
    AccessLevel, AssociatedTypeDecl, Decl, DeclInfo, Effects, FuncDecl, GenericParam, IfClause,
    IfConfigDecl, ImportDecl, InitDecl, ParamDecl, SourceTree, SubscriptDecl, TypeAliasDecl,
    TypeDecl, TypeKind, VarDecl,
};
pub use entity::{AnnotationMetadata, Entity, EntityKind};
pub use member::{
    ConditionalClause, Member, MemberKey, MemberKind, MemberOrigin, MemberTag,
    SCAFFOLDING_SUFFIXES, Signature,
};
pub use resolved::{MemberSource, ResolvedEntity, ResolvedMember};
pub use span::Span;
