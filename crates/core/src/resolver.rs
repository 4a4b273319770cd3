//! Inheritance resolution.
//!
//! Every annotated entity gets one flattened member list: its own members,
//! then whatever its parents contribute in declared order. Parents are looked
//! up among pre-generated mocks first (`<Parent>Mock`), then among annotated
//! declarations. Anything else is an external type and contributes nothing.

use crate::types::{
    ConditionalClause, Entity, EntityKind, ImportDecl, Member, MemberKey, MemberKind,
    MemberSource, MemberTag, ResolvedEntity, ResolvedMember,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Maps each mockable type name to the expression that builds its mock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeKeys(HashMap<String, String>);

impl TypeKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys = Self::new();
        for name in names {
            keys.insert(name);
        }
        keys
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        let value = format!("{name}Mock()");
        self.0.insert(name, value);
    }

    pub fn get(&self, type_name: &str) -> Option<&str> {
        self.0.get(type_name).map(String::as_str)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.0.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
struct Merged {
    members: Vec<ResolvedMember>,
    files: BTreeSet<PathBuf>,
    /// No parent was cut off by the cycle guard, so the result does not depend
    /// on the chain it was computed in
    complete: bool,
}

/// Read-only view over every entity of a run, shared by the resolve units
pub struct Resolver {
    entities: HashMap<String, Arc<Entity>>,
    order: Vec<Arc<Entity>>,
    stand_ins: HashMap<String, Arc<Entity>>,
    imports: HashMap<PathBuf, Vec<ImportDecl>>,
    memo: Mutex<HashMap<String, Arc<Merged>>>,
}

impl Resolver {
    /// Build the lookup maps. Inputs are expected in (path, offset) order;
    /// the first declaration of a name wins.
    pub fn new(
        entities: Vec<Entity>,
        stand_ins: Vec<Entity>,
        imports: HashMap<PathBuf, Vec<ImportDecl>>,
    ) -> Self {
        let mut by_name = HashMap::new();
        let mut order = Vec::new();
        for entity in entities {
            if !entity.is_annotated || entity.is_processed {
                continue;
            }
            if by_name.contains_key(&entity.name) {
                trace!(
                    "Ignoring duplicate declaration of {} in {}",
                    entity.name,
                    entity.file_path.display()
                );
                continue;
            }
            let entity = Arc::new(entity);
            by_name.insert(entity.name.clone(), Arc::clone(&entity));
            order.push(entity);
        }

        let mut stand_in_map = HashMap::new();
        for stand_in in stand_ins {
            if stand_in.kind == EntityKind::StandIn && !stand_in_map.contains_key(&stand_in.name) {
                stand_in_map.insert(stand_in.name.clone(), Arc::new(stand_in));
            }
        }

        Self {
            entities: by_name,
            order,
            stand_ins: stand_in_map,
            imports,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Annotated entities kept after dropping duplicate names
    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    pub fn entity(&self, name: &str) -> Option<&Arc<Entity>> {
        self.entities.get(name)
    }

    pub fn stand_in_for(&self, name: &str) -> Option<&Arc<Entity>> {
        self.stand_ins.get(&format!("{name}Mock"))
    }

    /// Mockable names whose mock can be built with `()`: protocols, classes
    /// without an initializer that takes arguments, and pre-generated mocks
    pub fn type_keys(&self) -> TypeKeys {
        let mut keys = TypeKeys::new();
        for entity in &self.order {
            let buildable = match entity.kind {
                EntityKind::Protocol => true,
                EntityKind::Class => !entity.is_final && builds_without_arguments(entity),
                _ => false,
            };
            if buildable {
                keys.insert(entity.name.clone());
            }
        }
        for stand_in in self.stand_ins.values() {
            keys.insert(stand_in.mocked_name());
        }
        keys
    }

    /// Entities that need a mock, in declaration order. An entity whose mock
    /// was generated by an earlier run keeps that mock.
    pub fn roots(&self) -> Vec<Arc<Entity>> {
        self.order
            .iter()
            .filter(|e| {
                let has_stand_in = self.stand_in_for(&e.name).is_some();
                if has_stand_in {
                    trace!("{} already has a generated mock", e.name);
                }
                !has_stand_in
            })
            .cloned()
            .collect()
    }

    pub fn resolve(&self, entity: &Arc<Entity>) -> ResolvedEntity {
        let merged = self.canonical(entity, &mut Vec::new());
        let contributing_files: Vec<PathBuf> = merged.files.iter().cloned().collect();
        let imports: BTreeSet<ImportDecl> = contributing_files
            .iter()
            .filter_map(|path| self.imports.get(path))
            .flatten()
            .cloned()
            .collect();

        ResolvedEntity {
            entity: Arc::clone(entity),
            members: merged.members.clone(),
            contributing_files,
            imports: imports.into_iter().collect(),
        }
    }

    pub fn resolve_all(&self) -> Vec<ResolvedEntity> {
        self.roots().iter().map(|e| self.resolve(e)).collect()
    }

    fn lock_memo(&self) -> MutexGuard<'_, HashMap<String, Arc<Merged>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn canonical(&self, entity: &Entity, visited: &mut Vec<String>) -> Arc<Merged> {
        if let Some(hit) = self.lock_memo().get(&entity.name).cloned() {
            return hit;
        }
        let merged = Arc::new(self.merge(entity, visited));
        if merged.complete {
            self.lock_memo()
                .entry(entity.name.clone())
                .or_insert_with(|| Arc::clone(&merged));
        }
        merged
    }

    fn merge(&self, entity: &Entity, visited: &mut Vec<String>) -> Merged {
        let mut merged = Merged {
            complete: true,
            ..Default::default()
        };
        merged.files.insert(entity.file_path.clone());

        let mut seen: HashSet<MemberKey> = HashSet::new();
        for member in &entity.members {
            seen.extend(member.flatten().into_iter().map(Member::key));
            merged.members.push(ResolvedMember::own(member.clone()));
        }

        visited.push(entity.name.clone());
        for parent in &entity.inheritance {
            if let Some(stand_in) = self.stand_in_for(parent) {
                let mut added = false;
                for member in &stand_in.members {
                    if member.name == "_doneInit" {
                        continue;
                    }
                    let covered = merged
                        .members
                        .iter()
                        .filter(|r| !r.is_stand_in())
                        .flat_map(|r| r.member.flatten())
                        .any(|own| member.is_scaffolding_of(&own.name));
                    if covered {
                        continue;
                    }
                    let Some(member) = take_unseen(member, &mut seen) else {
                        continue;
                    };
                    merged.members.push(ResolvedMember {
                        member,
                        source: MemberSource::StandIn(parent.clone()),
                        override_candidate: false,
                    });
                    added = true;
                }
                if added {
                    merged.files.insert(stand_in.file_path.clone());
                }
                continue;
            }

            let Some(parent_entity) = self.entities.get(parent) else {
                trace!("{parent} is not annotated in this run, treating as external");
                continue;
            };
            if visited.contains(parent) {
                trace!("Inheritance cycle through {parent} while resolving {}", entity.name);
                merged.complete = false;
                continue;
            }

            let inherited = self.canonical(parent_entity, visited);
            merged.complete &= inherited.complete;
            let mut added = false;
            for resolved in &inherited.members {
                let Some(member) = take_unseen(&resolved.member, &mut seen) else {
                    continue;
                };
                let source = match &resolved.source {
                    MemberSource::Own => MemberSource::Inherited(parent.clone()),
                    other => other.clone(),
                };
                let override_candidate = !matches!(source, MemberSource::StandIn(_));
                merged.members.push(ResolvedMember {
                    member,
                    source,
                    override_candidate,
                });
                added = true;
            }
            if added {
                merged.files.extend(inherited.files.iter().cloned());
            }
        }
        visited.pop();

        merged
    }
}

fn builds_without_arguments(entity: &Entity) -> bool {
    entity.has_blank_init
        || !entity
            .members
            .iter()
            .flat_map(Member::flatten)
            .any(|m| m.tag() == MemberTag::Initializer)
}

/// The part of `member` not yet in `seen`, whose keys are then recorded.
/// Conditional blocks are filtered member by member; clauses are alternatives,
/// so each one is checked against the keys seen before the block.
fn take_unseen(member: &Member, seen: &mut HashSet<MemberKey>) -> Option<Member> {
    let kept = unseen(member, seen)?;
    seen.extend(kept.flatten().into_iter().map(Member::key));
    Some(kept)
}

fn unseen(member: &Member, seen: &HashSet<MemberKey>) -> Option<Member> {
    let MemberKind::Conditional(clauses) = &member.kind else {
        return (!seen.contains(&member.key())).then(|| member.clone());
    };
    let clauses: Vec<ConditionalClause> = clauses
        .iter()
        .map(|clause| ConditionalClause {
            directive: clause.directive.clone(),
            members: clause
                .members
                .iter()
                .filter_map(|nested| unseen(nested, seen))
                .collect(),
        })
        .collect();
    if clauses.iter().all(|c| c.members.is_empty()) {
        return None;
    }
    Some(Member {
        kind: MemberKind::Conditional(clauses),
        ..member.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessLevel, MemberOrigin, ParamDecl, Signature, Span};
    use pretty_assertions::assert_eq;

    fn function(name: &str, labels: &[&str]) -> Member {
        let params = labels
            .iter()
            .map(|label| ParamDecl {
                label: Some(label.to_string()),
                name: label.to_string(),
                type_name: "Int".to_string(),
                is_variadic: false,
                is_inout: false,
                default_value: None,
            })
            .collect();
        Member {
            name: name.to_string(),
            kind: MemberKind::Function(Signature {
                params,
                ..Default::default()
            }),
            access: AccessLevel::Internal,
            is_static: false,
            span: Span::default(),
            origin: MemberOrigin::Interface,
            processed: false,
            attributes: vec![],
            source: format!("func {name}()"),
        }
    }

    fn variable(name: &str) -> Member {
        Member {
            kind: MemberKind::Variable {
                type_name: "Int".to_string(),
                settable: true,
                default_value: None,
                var_override: None,
            },
            ..function(name, &[])
        }
    }

    fn conditional(clauses: Vec<(&str, Vec<Member>)>) -> Member {
        let name = clauses[0].0.to_string();
        Member {
            name: name.clone(),
            kind: MemberKind::Conditional(
                clauses
                    .into_iter()
                    .map(|(directive, members)| ConditionalClause {
                        directive: directive.to_string(),
                        members,
                    })
                    .collect(),
            ),
            source: name,
            ..function("", &[])
        }
    }

    fn flat_names(resolved: &ResolvedEntity) -> Vec<String> {
        resolved
            .members
            .iter()
            .flat_map(|r| r.member.flatten())
            .map(|m| m.name.clone())
            .collect()
    }

    fn protocol(name: &str, parents: &[&str], members: Vec<Member>) -> Entity {
        Entity {
            name: name.to_string(),
            kind: EntityKind::Protocol,
            file_path: PathBuf::from(format!("{name}.swift")),
            span: Span::default(),
            access: AccessLevel::Internal,
            attributes: vec![],
            inheritance: parents.iter().map(|p| p.to_string()).collect(),
            raw_members: vec![],
            members,
            is_annotated: true,
            metadata: None,
            is_processed: false,
            is_final: false,
            has_blank_init: false,
        }
    }

    fn stand_in(name: &str, members: Vec<Member>) -> Entity {
        Entity {
            kind: EntityKind::StandIn,
            is_annotated: false,
            is_processed: true,
            ..protocol(name, &[], members)
        }
    }

    fn resolve(resolver: &Resolver, name: &str) -> ResolvedEntity {
        resolver.resolve(resolver.entity(name).unwrap())
    }

    #[test]
    fn test_identity_without_inheritance() {
        let members = vec![variable("count"), function("run", &["id"])];
        let resolver = Resolver::new(
            vec![protocol("Service", &[], members.clone())],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Service");
        let own: Vec<Member> = resolved.members.iter().map(|m| m.member.clone()).collect();
        assert_eq!(own, members);
        assert!(resolved.members.iter().all(|m| m.source == MemberSource::Own));
    }

    #[test]
    fn test_parent_members_merge_once_as_override_candidates() {
        let resolver = Resolver::new(
            vec![
                protocol("Child", &["Parent"], vec![function("childOnly", &[])]),
                protocol("Parent", &[], vec![function("shared", &[]), variable("flag")]),
            ],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(resolved.member_names(), vec!["childOnly", "shared", "flag"]);
        for inherited in &resolved.members[1..] {
            assert_eq!(inherited.source, MemberSource::Inherited("Parent".to_string()));
            assert!(inherited.override_candidate);
        }
    }

    #[test]
    fn test_child_declaration_wins() {
        let mut child_run = function("run", &["id"]);
        child_run.source = "child".to_string();
        let resolver = Resolver::new(
            vec![
                protocol("Child", &["Parent"], vec![child_run]),
                protocol("Parent", &[], vec![function("run", &["id"]), function("run", &["name"])]),
            ],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(resolved.members.len(), 2);
        assert_eq!(resolved.members[0].member.source, "child");
        assert_eq!(resolved.members[0].source, MemberSource::Own);
        assert_eq!(resolved.members[1].member.key().labels, vec!["name".to_string()]);
    }

    #[test]
    fn test_unannotated_parent_contributes_nothing() {
        let mut parent = protocol("Parent", &[], vec![function("helloParent", &[])]);
        parent.is_annotated = false;
        let resolver = Resolver::new(
            vec![
                protocol("Greeter", &["Parent"], vec![function("greet", &[])]),
                parent,
            ],
            vec![],
            HashMap::new(),
        );
        assert!(resolver.entity("Parent").is_none());
        let resolved = resolve(&resolver, "Greeter");
        assert_eq!(resolved.member_names(), vec!["greet"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let resolver = Resolver::new(
            vec![
                protocol("A", &["B"], vec![function("a", &[])]),
                protocol("B", &["A"], vec![function("b", &[])]),
            ],
            vec![],
            HashMap::new(),
        );
        let a = resolve(&resolver, "A");
        assert_eq!(a.member_names(), vec!["a", "b"]);
        let b = resolve(&resolver, "B");
        assert_eq!(b.member_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_self_reference_terminates() {
        let resolver = Resolver::new(
            vec![protocol("Loud", &["Loud"], vec![function("shout", &[])])],
            vec![],
            HashMap::new(),
        );
        assert_eq!(resolve(&resolver, "Loud").member_names(), vec!["shout"]);
    }

    #[test]
    fn test_first_parent_wins_ties() {
        let mut from_first = function("close", &[]);
        from_first.source = "first".to_string();
        let resolver = Resolver::new(
            vec![
                protocol("Child", &["First", "Second"], vec![]),
                protocol("First", &[], vec![from_first]),
                protocol("Second", &[], vec![function("close", &[])]),
            ],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(resolved.members.len(), 1);
        assert_eq!(resolved.members[0].member.source, "first");
        assert_eq!(
            resolved.members[0].source,
            MemberSource::Inherited("First".to_string())
        );
    }

    #[test]
    fn test_stand_in_parent_members_are_not_overridden() {
        let resolver = Resolver::new(
            vec![protocol("Child", &["Parent"], vec![function("ping", &[])])],
            vec![stand_in(
                "ParentMock",
                vec![
                    variable("_doneInit"),
                    variable("pingCallCount"),
                    variable("helloCallCount"),
                    function("hello", &[]),
                ],
            )],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(resolved.member_names(), vec!["ping", "helloCallCount", "hello"]);
        assert!(resolved.members[1..].iter().all(|m| !m.override_candidate));
        assert_eq!(
            resolved.members[2].source,
            MemberSource::StandIn("Parent".to_string())
        );
    }

    #[test]
    fn test_stand_in_takes_precedence_over_raw_declaration() {
        let resolver = Resolver::new(
            vec![
                protocol("Parent", &[], vec![function("raw", &[])]),
                protocol("Child", &["Parent"], vec![]),
            ],
            vec![stand_in("ParentMock", vec![function("generated", &[])])],
            HashMap::new(),
        );
        let roots: Vec<String> = resolver.roots().iter().map(|e| e.name.clone()).collect();
        assert_eq!(roots, vec!["Child"]);
        assert_eq!(resolve(&resolver, "Child").member_names(), vec!["generated"]);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let mut second = protocol("Service", &[], vec![function("second", &[])]);
        second.file_path = PathBuf::from("Z.swift");
        let resolver = Resolver::new(
            vec![protocol("Service", &[], vec![function("first", &[])]), second],
            vec![],
            HashMap::new(),
        );
        assert_eq!(resolver.roots().len(), 1);
        assert_eq!(resolve(&resolver, "Service").member_names(), vec!["first"]);
    }

    #[test]
    fn test_imports_union_of_contributing_files() {
        let mut imports = HashMap::new();
        imports.insert(
            PathBuf::from("Child.swift"),
            vec![ImportDecl::new("import Foundation")],
        );
        imports.insert(
            PathBuf::from("Parent.swift"),
            vec![
                ImportDecl::new("import Combine"),
                ImportDecl::new("import Foundation"),
            ],
        );
        imports.insert(
            PathBuf::from("Unrelated.swift"),
            vec![ImportDecl::new("import UIKit")],
        );
        let resolver = Resolver::new(
            vec![
                protocol("Child", &["Parent"], vec![]),
                protocol("Parent", &[], vec![function("shared", &[])]),
            ],
            vec![],
            imports,
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(
            resolved.imports,
            vec![
                ImportDecl::new("import Combine"),
                ImportDecl::new("import Foundation"),
            ]
        );
    }

    #[test]
    fn test_same_directive_blocks_merge_by_member() {
        let resolver = Resolver::new(
            vec![
                protocol(
                    "Child",
                    &["Parent"],
                    vec![conditional(vec![("#if DEBUG", vec![function("childDebug", &[])])])],
                ),
                protocol(
                    "Parent",
                    &[],
                    vec![conditional(vec![(
                        "#if DEBUG",
                        vec![function("parentDebug", &[]), function("childDebug", &[])],
                    )])],
                ),
            ],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(flat_names(&resolved), vec!["childDebug", "parentDebug"]);
        assert_eq!(resolved.members.len(), 2);
        assert_eq!(
            resolved.members[1].source,
            MemberSource::Inherited("Parent".to_string())
        );
    }

    #[test]
    fn test_guarded_child_member_shadows_parent_member() {
        let resolver = Resolver::new(
            vec![
                protocol(
                    "Child",
                    &["Parent"],
                    vec![conditional(vec![("#if DEBUG", vec![function("a", &[])])])],
                ),
                protocol("Parent", &[], vec![function("a", &[]), function("b", &[])]),
            ],
            vec![],
            HashMap::new(),
        );
        assert_eq!(flat_names(&resolve(&resolver, "Child")), vec!["a", "b"]);
    }

    #[test]
    fn test_parent_block_dropped_when_fully_covered() {
        let resolver = Resolver::new(
            vec![
                protocol("Child", &["Parent"], vec![function("a", &[]), function("b", &[])]),
                protocol(
                    "Parent",
                    &[],
                    vec![conditional(vec![
                        ("#if os(iOS)", vec![function("a", &[])]),
                        ("#else", vec![function("b", &[])]),
                    ])],
                ),
            ],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        assert_eq!(resolved.members.len(), 2);
        assert!(resolved.members.iter().all(|m| m.source == MemberSource::Own));
    }

    #[test]
    fn test_alternative_clauses_keep_their_members() {
        let resolver = Resolver::new(
            vec![
                protocol("Child", &["Parent"], vec![]),
                protocol(
                    "Parent",
                    &[],
                    vec![conditional(vec![
                        ("#if os(iOS)", vec![function("open", &[])]),
                        ("#else", vec![function("open", &[])]),
                    ])],
                ),
            ],
            vec![],
            HashMap::new(),
        );
        let resolved = resolve(&resolver, "Child");
        let MemberKind::Conditional(clauses) = &resolved.members[0].member.kind else {
            panic!("expected conditional block");
        };
        assert_eq!(clauses[0].members.len(), 1);
        assert_eq!(clauses[1].members.len(), 1);
    }

    #[test]
    fn test_type_keys() {
        let mut with_args = protocol("Session", &[], vec![]);
        with_args.kind = EntityKind::Class;
        with_args.members = vec![Member {
            kind: MemberKind::Initializer {
                signature: Signature {
                    params: vec![ParamDecl {
                        label: Some("token".to_string()),
                        name: "token".to_string(),
                        type_name: "String".to_string(),
                        is_variadic: false,
                        is_inout: false,
                        default_value: None,
                    }],
                    ..Default::default()
                },
                is_required: false,
                is_failable: false,
            },
            ..function("init", &[])
        }];
        let mut plain = protocol("Store", &[], vec![function("save", &[])]);
        plain.kind = EntityKind::Class;
        let mut sealed = protocol("Vault", &[], vec![]);
        sealed.kind = EntityKind::Class;
        sealed.is_final = true;

        let resolver = Resolver::new(
            vec![protocol("Service", &[], vec![]), with_args, plain, sealed],
            vec![stand_in("ClientMock", vec![])],
            HashMap::new(),
        );
        let keys = resolver.type_keys();
        assert_eq!(keys.get("Service"), Some("ServiceMock()"));
        assert_eq!(keys.get("Client"), Some("ClientMock()"));
        assert_eq!(keys.get("Store"), Some("StoreMock()"));
        assert_eq!(keys.get("Session"), None);
        assert_eq!(keys.get("Vault"), None);
        assert_eq!(keys.get("Other"), None);
    }
}
