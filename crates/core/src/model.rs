//! Member modeling: raw member declarations become kind-tagged [`Member`]s.

use crate::types::{
    AccessLevel, AnnotationMetadata, ConditionalClause, Decl, DeclInfo, Entity, EntityKind,
    Member, MemberKind, MemberOrigin, Signature,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeledMembers {
    pub members: Vec<Member>,
    /// At least one kept initializer can be called without arguments
    pub has_blank_init: bool,
}

/// Model the members of `entity` without touching it
pub fn model_members(entity: &Entity) -> ModeledMembers {
    let modeler = Modeler {
        origin: match entity.kind {
            EntityKind::Protocol => MemberOrigin::Interface,
            EntityKind::Class | EntityKind::StandIn => MemberOrigin::Concrete,
        },
        access: entity.access,
        processed: entity.is_processed,
        metadata: entity.metadata.as_ref(),
    };
    let members = modeler.model(&entity.raw_members);
    let has_blank_init = members.iter().any(|m| match &m.kind {
        MemberKind::Initializer { signature, .. } => signature
            .params
            .iter()
            .all(|p| p.default_value.is_some()),
        _ => false,
    });
    ModeledMembers {
        members,
        has_blank_init,
    }
}

/// Fill in `members` and `has_blank_init`
pub fn model_entity(mut entity: Entity) -> Entity {
    let modeled = model_members(&entity);
    entity.members = modeled.members;
    entity.has_blank_init = modeled.has_blank_init;
    entity
}

struct Modeler<'a> {
    origin: MemberOrigin,
    access: AccessLevel,
    processed: bool,
    metadata: Option<&'a AnnotationMetadata>,
}

impl Modeler<'_> {
    fn model(&self, decls: &[Decl]) -> Vec<Member> {
        decls.iter().filter_map(|d| self.model_decl(d)).collect()
    }

    fn is_concrete(&self) -> bool {
        self.origin == MemberOrigin::Concrete
    }

    /// Filters that apply to every declaration with modifiers
    fn keeps(&self, info: &DeclInfo) -> bool {
        if self.processed {
            return true;
        }
        if info.access().is_some_and(|a| a.is_private()) {
            return false;
        }
        if self.is_concrete() && (info.is_static() || info.has_modifier("final")) {
            return false;
        }
        true
    }

    fn member(&self, name: String, kind: MemberKind, info: &DeclInfo) -> Member {
        let access = match self.origin {
            MemberOrigin::Interface => self.access,
            MemberOrigin::Concrete => info.access().unwrap_or(AccessLevel::Internal),
        };
        Member {
            name,
            kind,
            access,
            is_static: info.is_static(),
            span: info.span,
            origin: self.origin,
            processed: self.processed,
            attributes: info.attributes.clone(),
            source: info.text.clone(),
        }
    }

    fn type_override(&self, name: &str) -> Option<String> {
        self.metadata.and_then(|m| m.type_aliases.get(name).cloned())
    }

    fn model_decl(&self, decl: &Decl) -> Option<Member> {
        if let Some(info) = decl.info() {
            if !self.keeps(info) {
                return None;
            }
        }

        match decl {
            Decl::Type(_) => None,
            Decl::Variable(var) => {
                if !self.processed && self.is_concrete() && (var.is_let || var.type_name.is_none())
                {
                    return None;
                }
                let kind = MemberKind::Variable {
                    type_name: var.type_name.clone().unwrap_or_default(),
                    settable: var.settable,
                    default_value: var.default_value.clone(),
                    var_override: self.metadata.and_then(|m| m.var_types.get(&var.name).cloned()),
                };
                Some(self.member(var.name.clone(), kind, &var.info))
            }
            Decl::Function(func) => {
                let signature = Signature {
                    generic_params: func.generic_params.clone(),
                    params: func.params.clone(),
                    effects: func.effects.clone(),
                    return_type: func.return_type.clone(),
                    where_clause: func.where_clause.clone(),
                };
                Some(self.member(func.name.clone(), MemberKind::Function(signature), &func.info))
            }
            Decl::Subscript(sub) => {
                let signature = Signature {
                    generic_params: sub.generic_params.clone(),
                    params: sub.params.clone(),
                    effects: sub.effects.clone(),
                    return_type: Some(sub.return_type.clone()),
                    where_clause: sub.where_clause.clone(),
                };
                let kind = MemberKind::Subscript {
                    signature,
                    settable: sub.settable,
                };
                Some(self.member("subscript".to_string(), kind, &sub.info))
            }
            Decl::Initializer(init) => {
                let is_required = init.info.has_modifier("required");
                if self.processed && !is_required {
                    return None;
                }
                if init.info.has_modifier("convenience") {
                    return None;
                }
                let kind = MemberKind::Initializer {
                    signature: Signature {
                        generic_params: init.generic_params.clone(),
                        params: init.params.clone(),
                        effects: init.effects.clone(),
                        return_type: None,
                        where_clause: None,
                    },
                    is_required,
                    is_failable: init.is_failable,
                };
                Some(self.member("init".to_string(), kind, &init.info))
            }
            Decl::TypeAlias(alias) => {
                if !self.processed && self.is_concrete() {
                    return None;
                }
                let kind = MemberKind::TypeAlias {
                    value: Some(alias.value.clone()),
                    bound: None,
                    is_associated: false,
                    override_value: self.type_override(&alias.name),
                };
                Some(self.member(alias.name.clone(), kind, &alias.info))
            }
            Decl::AssociatedType(assoc) => {
                let kind = MemberKind::TypeAlias {
                    value: assoc.default_value.clone(),
                    bound: assoc.bound.clone(),
                    is_associated: true,
                    override_value: self.type_override(&assoc.name),
                };
                Some(self.member(assoc.name.clone(), kind, &assoc.info))
            }
            Decl::IfConfig(block) => {
                let clauses: Vec<ConditionalClause> = block
                    .clauses
                    .iter()
                    .map(|clause| ConditionalClause {
                        directive: clause.directive.clone(),
                        members: self.model(&clause.members),
                    })
                    .collect();
                if clauses.iter().all(|c| c.members.is_empty()) {
                    return None;
                }
                let name = clauses
                    .first()
                    .map(|c| c.directive.clone())
                    .unwrap_or_default();
                Some(Member {
                    name,
                    kind: MemberKind::Conditional(clauses),
                    access: self.access,
                    is_static: false,
                    span: block.span,
                    origin: self.origin,
                    processed: self.processed,
                    attributes: Vec::new(),
                    source: block.text.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractMode, extract};
    use crate::parser::{SwiftParser, SyntaxProvider};
    use crate::types::MemberTag;
    use std::path::Path;

    fn entity(source: &str, mode: ExtractMode) -> Entity {
        let tree = SwiftParser::new().unwrap().parse_source(source).unwrap();
        let mut extraction = extract(&tree, Path::new("Test.swift"), &mode);
        extraction.entities.remove(0)
    }

    fn annotated(source: &str) -> Entity {
        entity(
            source,
            ExtractMode::Annotated {
                annotation: "@mockable".to_string(),
            },
        )
    }

    fn names(modeled: &ModeledMembers) -> Vec<&str> {
        modeled.members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_protocol_members_take_protocol_access() {
        let source = r#"
/// @mockable
public protocol Service {
    var id: String { get }
    func run()
}
"#;
        let modeled = model_members(&annotated(source));
        assert_eq!(names(&modeled), vec!["id", "run"]);
        assert!(modeled.members.iter().all(|m| m.access == AccessLevel::Public));
        assert!(modeled.members.iter().all(|m| m.origin == MemberOrigin::Interface));
        assert!(!modeled.has_blank_init);
    }

    #[test]
    fn test_class_filters() {
        let source = r#"
/// @mockable
public class Store {
    public var count: Int = 0
    let id: String = ""
    var inferred = 1
    private var secret: Int = 0
    static var shared: Store?
    final func locked() {}
    func save() {}
    convenience init(x: Int) { self.init() }
    init() {}
    typealias Key = String
}
"#;
        let modeled = model_members(&annotated(source));
        assert_eq!(names(&modeled), vec!["count", "save", "init"]);
        assert_eq!(modeled.members[0].access, AccessLevel::Public);
        assert_eq!(modeled.members[1].access, AccessLevel::Internal);
        assert!(modeled.has_blank_init);
    }

    #[test]
    fn test_processing_existing_keeps_private_and_static_but_only_required_inits() {
        let source = r#"
class ServiceMock: Service {
    private var _doneInit = false
    static var initCallCount = 0
    init() {}
    required init(id: String) {}
}
"#;
        let modeled = model_members(&entity(source, ExtractMode::ProcessExisting));
        assert_eq!(names(&modeled), vec!["_doneInit", "initCallCount", "init"]);
        assert!(modeled.members.iter().all(|m| m.processed));
    }

    #[test]
    fn test_typealias_overrides_and_conditionals() {
        let source = r#"
/// @mockable(typealias: Item = String)
protocol Feed {
    associatedtype Item: Codable
    #if DEBUG
    func dump()
    #endif
}
"#;
        let modeled = model_members(&annotated(source));
        let MemberKind::TypeAlias {
            override_value,
            bound,
            is_associated,
            ..
        } = &modeled.members[0].kind
        else {
            panic!("expected associated type");
        };
        assert!(is_associated);
        assert_eq!(bound.as_deref(), Some("Codable"));
        assert_eq!(override_value.as_deref(), Some("String"));

        assert_eq!(modeled.members[1].tag(), MemberTag::Conditional);
        assert_eq!(modeled.members[1].name, "#if DEBUG");
    }

    #[test]
    fn test_model_entity_fills_members() {
        let source = r#"
/// @mockable
protocol Factory {
    init()
}
"#;
        let modeled = model_entity(annotated(source));
        assert_eq!(modeled.members.len(), 1);
        assert!(modeled.has_blank_init);
    }
}
