use super::{Entity, ImportDecl, Member};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a resolved member came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "parent", rename_all = "snake_case")]
pub enum MemberSource {
    Own,
    /// Merged from an annotated parent declaration
    Inherited(String),
    /// Copied from the pre-generated mock of a parent
    StandIn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMember {
    pub member: Member,
    pub source: MemberSource,
    pub override_candidate: bool,
}

impl ResolvedMember {
    pub fn own(member: Member) -> Self {
        Self {
            member,
            source: MemberSource::Own,
            override_candidate: false,
        }
    }

    pub fn is_stand_in(&self) -> bool {
        matches!(self.source, MemberSource::StandIn(_))
    }
}

/// An annotated entity with its flattened member list, ready to render
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub entity: Arc<Entity>,
    pub members: Vec<ResolvedMember>,
    /// Files whose members ended up in `members`, including the entity's own
    pub contributing_files: Vec<PathBuf>,
    pub imports: Vec<ImportDecl>,
}

impl ResolvedEntity {
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.member.name.as_str()).collect()
    }
}
