use super::defaults::{default_value, is_function_type, observable_element};
use super::method::{InitStyle, render_function, render_init, render_subscript};
use super::type_alias::render_type_alias;
use super::variable::render_variable;
use super::{OverloadIds, RenderContext, RenderedEntity, Slot, indent, mock_acl, overload_ids};
use crate::error::{Error, Result};
use crate::types::{
    ConditionalClause, EntityKind, Member, MemberKind, MemberOrigin, MemberTag, ResolvedEntity,
    ResolvedMember,
};

/// Render the mock class for one resolved entity.
///
/// Private entities cannot be referenced from a test target and final classes
/// cannot be subclassed, so both fail with [`Error::RenderError`].
pub fn render_entity(resolved: &ResolvedEntity, ctx: &RenderContext<'_>) -> Result<RenderedEntity> {
    let entity = &resolved.entity;
    if entity.access.is_private() {
        return Err(Error::RenderError(format!(
            "{} is private and cannot be mocked",
            entity.name
        )));
    }
    if entity.is_final {
        return Err(Error::RenderError(format!(
            "{} is final and cannot be subclassed",
            entity.name
        )));
    }
    if entity.kind == EntityKind::StandIn {
        return Err(Error::RenderError(format!(
            "{} is already a generated mock",
            entity.name
        )));
    }

    let renderer = EntityRenderer::new(resolved, *ctx);
    Ok(RenderedEntity {
        name: renderer.mock_name.clone(),
        text: renderer.render(),
        offset: entity.span.start,
        path: entity.file_path.clone(),
    })
}

struct EntityRenderer<'a> {
    resolved: &'a ResolvedEntity,
    ctx: RenderContext<'a>,
    mock_name: String,
    ids: OverloadIds,
}

impl<'a> EntityRenderer<'a> {
    fn new(resolved: &'a ResolvedEntity, ctx: RenderContext<'a>) -> Self {
        let ids = overload_ids(
            resolved
                .members
                .iter()
                .filter(|r| !r.is_stand_in())
                .flat_map(|r| r.member.flatten()),
        );
        Self {
            resolved,
            ctx,
            mock_name: resolved.entity.mock_name(),
            ids,
        }
    }

    fn render(&self) -> String {
        let entity = &self.resolved.entity;
        let mut out = String::new();
        for attribute in entity
            .attributes
            .iter()
            .filter(|a| a.starts_with("@available"))
        {
            out.push_str(attribute);
            out.push('\n');
        }
        let module = entity
            .module_prefix()
            .map(|m| format!("{m}."))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}class {}: {module}{} {{\n",
            mock_acl(entity.access),
            self.mock_name,
            entity.name
        ));

        let mut blocks = vec![indent(1, "private var _doneInit = false")];
        blocks.extend(self.init_blocks());
        for resolved in &self.resolved.members {
            if !resolved.is_stand_in() && resolved.member.tag() == MemberTag::Initializer {
                continue;
            }
            if let Some(block) = self.member_block(resolved, &resolved.member) {
                blocks.push(block);
            }
        }
        out.push_str(&blocks.join("\n\n"));
        out.push_str("\n}");
        out
    }

    fn slot(&self, resolved: &ResolvedMember, member: &Member) -> Slot<'_> {
        let entity = &self.resolved.entity;
        let overrides = member.origin == MemberOrigin::Concrete
            && !resolved.is_stand_in()
            && (entity.kind == EntityKind::Class || resolved.override_candidate);
        Slot {
            acl: mock_acl(member.access.min(entity.access)),
            is_static: member.is_static,
            overrides,
            mock_name: &self.mock_name,
        }
    }

    fn init_style(&self, member: &Member) -> InitStyle {
        match (&self.resolved.entity.kind, &member.kind) {
            (EntityKind::Class, MemberKind::Initializer { is_required, .. }) => InitStyle::Forwarding {
                required: *is_required,
            },
            _ => InitStyle::Requirement,
        }
    }

    /// `resolved` carries provenance; `member` may be nested inside it
    fn member_block(&self, resolved: &ResolvedMember, member: &Member) -> Option<String> {
        if resolved.is_stand_in() {
            return Some(indent(1, member.source.trim()));
        }
        let slot = self.slot(resolved, member);
        match &member.kind {
            MemberKind::Variable {
                type_name,
                default_value,
                var_override,
                ..
            } => render_variable(
                &member.name,
                type_name,
                default_value.as_deref(),
                var_override.as_deref(),
                &slot,
                &self.ctx,
            ),
            MemberKind::Function(sig) => Some(render_function(
                member,
                sig,
                &self.ids.id_for(member),
                &slot,
                &self.ctx,
            )),
            MemberKind::Subscript {
                signature,
                settable,
            } => Some(render_subscript(
                signature,
                *settable,
                &self.ids.id_for(member),
                &slot,
                &self.ctx,
            )),
            MemberKind::TypeAlias {
                value,
                bound,
                is_associated,
                override_value,
            } => Some(render_type_alias(
                &member.name,
                value.as_deref(),
                bound.as_deref(),
                *is_associated,
                override_value.as_deref(),
                &slot,
                &self.ctx,
            )),
            MemberKind::Initializer { .. } => render_init(
                member,
                &self.ids.id_for(member),
                self.init_style(member),
                &slot,
            ),
            MemberKind::Conditional(clauses) => Some(self.conditional(resolved, clauses)),
        }
    }

    fn conditional(&self, resolved: &ResolvedMember, clauses: &[ConditionalClause]) -> String {
        let mut lines = Vec::new();
        for clause in clauses {
            lines.push(indent(1, clause.directive.trim()));
            lines.extend(
                clause
                    .members
                    .iter()
                    .filter_map(|member| self.member_block(resolved, member)),
            );
        }
        lines.push(indent(1, "#endif"));
        lines.join("\n")
    }

    fn init_blocks(&self) -> Vec<String> {
        let entity = &self.resolved.entity;
        let acl = mock_acl(entity.access);
        let declared: Vec<&ResolvedMember> = self
            .resolved
            .members
            .iter()
            .filter(|r| !r.is_stand_in() && r.member.tag() == MemberTag::Initializer)
            .collect();
        let has_blank_init = self
            .resolved
            .members
            .iter()
            .flat_map(|r| r.member.flatten())
            .any(is_blank_init);

        let mut blocks = Vec::new();
        if entity.kind == EntityKind::Class {
            if declared.is_empty() && !has_blank_init {
                blocks.push(
                    [
                        indent(1, &format!("{acl}override init() {{")),
                        indent(2, "super.init()"),
                        indent(2, "_doneInit = true"),
                        indent(1, "}"),
                    ]
                    .join("\n"),
                );
            }
        } else {
            if !has_blank_init {
                blocks.push(indent(1, &format!("{acl}init() {{ _doneInit = true }}")));
            }
            blocks.extend(self.memberwise_init(&declared));
        }

        for resolved in declared {
            let slot = self.slot(resolved, &resolved.member);
            blocks.extend(render_init(
                &resolved.member,
                &self.ids.id_for(&resolved.member),
                self.init_style(&resolved.member),
                &slot,
            ));
        }
        blocks
    }

    /// Initializer taking every instance variable, each with a default so
    /// tests only pass what they care about
    fn memberwise_init(&self, declared: &[&ResolvedMember]) -> Option<String> {
        let vars: Vec<(&str, &str)> = self
            .resolved
            .members
            .iter()
            .filter(|r| !r.is_stand_in() && !r.member.is_static)
            .filter_map(|r| match &r.member.kind {
                MemberKind::Variable { type_name, .. }
                    if !type_name.is_empty() && observable_element(type_name).is_none() =>
                {
                    Some((r.member.name.as_str(), type_name.as_str()))
                }
                _ => None,
            })
            .collect();
        if vars.is_empty() {
            return None;
        }
        let labels: Vec<String> = vars.iter().map(|(name, _)| name.to_string()).collect();
        let clashes = declared
            .iter()
            .filter_map(|r| r.member.signature())
            .any(|sig| sig.labels() == labels);
        if clashes {
            return None;
        }

        let params: Vec<String> = vars
            .iter()
            .map(|(name, ty)| match default_value(ty, self.ctx.type_keys) {
                Some(value) => format!("{name}: {ty} = {value}"),
                None if is_function_type(ty) => format!("{name}: ({ty})? = nil"),
                None => format!("{name}: {ty}? = nil"),
            })
            .collect();
        let acl = mock_acl(self.resolved.entity.access);
        let mut lines = vec![indent(1, &format!("{acl}init({}) {{", params.join(", ")))];
        lines.extend(
            vars.iter()
                .map(|(name, _)| indent(2, &format!("self._{name} = {name}"))),
        );
        lines.push(indent(2, "_doneInit = true"));
        lines.push(indent(1, "}"));
        Some(lines.join("\n"))
    }
}

fn is_blank_init(member: &Member) -> bool {
    match &member.kind {
        MemberKind::Initializer { signature, .. } => {
            signature.params.iter().all(|p| p.default_value.is_some())
        }
        _ => false,
    }
}
