use super::defaults::{capitalize, default_value, is_void, mentions, type_identifier};
use super::{RenderContext, Slot, indent};
use crate::types::{Member, MemberKey, MemberKind, MemberTag, ParamDecl, Signature};
use std::collections::HashMap;

/// Full call signature, finer than [`MemberKey`] so overloads that only differ
/// in parameter or return types get their own slots
type OverloadKey = (MemberKey, Vec<String>, Option<String>);

fn overload_key(member: &Member) -> OverloadKey {
    let sig = member.signature();
    (
        member.key(),
        sig.map(|s| s.params.iter().map(|p| p.type_name.clone()).collect())
            .unwrap_or_default(),
        sig.and_then(|s| s.return_type.clone()),
    )
}

/// Identifier stems for the counters and handlers of callable members
#[derive(Debug, Clone, Default)]
pub struct OverloadIds(HashMap<OverloadKey, String>);

impl OverloadIds {
    pub fn get(&self, member: &Member) -> Option<&str> {
        self.0.get(&overload_key(member)).map(String::as_str)
    }

    /// The assigned id, or the plain stem for a member that was not registered
    pub fn id_for(&self, member: &Member) -> String {
        self.get(member)
            .map(str::to_string)
            .unwrap_or_else(|| stem(member.tag(), &member.name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Assign ids to every function, subscript and initializer.
///
/// A name declared once keeps its name. Overloads get their argument labels
/// appended, then their parameter type names, then a running index.
pub fn overload_ids<'m>(members: impl IntoIterator<Item = &'m Member>) -> OverloadIds {
    let mut groups: Vec<(MemberTag, String, Vec<&Member>)> = Vec::new();
    for member in members {
        if member.signature().is_none() {
            continue;
        }
        let tag = member.tag();
        let key = overload_key(member);
        match groups
            .iter_mut()
            .find(|(t, name, _)| *t == tag && *name == member.name)
        {
            Some((_, _, group)) => {
                if !group.iter().any(|m| overload_key(m) == key) {
                    group.push(member);
                }
            }
            None => groups.push((tag, member.name.clone(), vec![member])),
        }
    }

    let mut ids = HashMap::new();
    for (tag, name, group) in groups {
        let stem = stem(tag, &name);
        if let [only] = group.as_slice() {
            ids.insert(overload_key(only), stem);
            continue;
        }

        let with_labels: Vec<String> = group
            .iter()
            .map(|m| format!("{stem}{}", label_suffix(m)))
            .collect();
        let with_types: Vec<String> = with_labels
            .iter()
            .zip(&group)
            .map(|(id, m)| {
                if with_labels.iter().filter(|other| *other == id).count() > 1 {
                    format!("{id}{}", type_suffix(m))
                } else {
                    id.clone()
                }
            })
            .collect();
        for (i, (id, member)) in with_types.iter().zip(&group).enumerate() {
            let clashes = with_types.iter().filter(|other| *other == id).count() > 1;
            let id = if clashes {
                let occurrence = with_types[..=i].iter().filter(|other| *other == id).count();
                format!("{id}{occurrence}")
            } else {
                id.clone()
            };
            ids.insert(overload_key(member), id);
        }
    }
    OverloadIds(ids)
}

fn stem(tag: MemberTag, name: &str) -> String {
    match tag {
        MemberTag::Subscript => "subscript".to_string(),
        MemberTag::Initializer => "init".to_string(),
        _ => identifier_name(name),
    }
}

/// Operator functions get a spelled-out identifier
fn identifier_name(name: &str) -> String {
    let name = name.trim_matches('`');
    if name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
    {
        return name.to_string();
    }
    let mut out = String::from("op");
    for ch in name.chars() {
        out.push_str(match ch {
            '=' => "Equal",
            '<' => "Less",
            '>' => "Greater",
            '+' => "Plus",
            '-' => "Minus",
            '*' => "Star",
            '/' => "Slash",
            '!' => "Bang",
            '&' => "Amp",
            '|' => "Pipe",
            '%' => "Percent",
            '^' => "Caret",
            '~' => "Tilde",
            '?' => "Question",
            '.' => "Dot",
            _ => "",
        });
    }
    out
}

fn label_suffix(member: &Member) -> String {
    member
        .signature()
        .map(|sig| {
            sig.params
                .iter()
                .map(|p| capitalize(p.label.as_deref().unwrap_or(&p.name)))
                .collect()
        })
        .unwrap_or_default()
}

fn type_suffix(member: &Member) -> String {
    member
        .signature()
        .map(|sig| sig.params.iter().map(|p| type_identifier(&p.type_name)).collect())
        .unwrap_or_default()
}

fn generic_clause(sig: &Signature) -> String {
    if sig.generic_params.is_empty() {
        return String::new();
    }
    let params: Vec<String> = sig
        .generic_params
        .iter()
        .map(|g| match &g.constraint {
            Some(constraint) => format!("{}: {constraint}", g.name),
            None => g.name.clone(),
        })
        .collect();
    format!("<{}>", params.join(", "))
}

fn where_clause(sig: &Signature) -> String {
    sig.where_clause
        .as_ref()
        .map(|w| format!(" where {w}"))
        .unwrap_or_default()
}

/// Parameter as written in the declaration
fn declared_param(param: &ParamDecl, subscript: bool) -> String {
    let names = match &param.label {
        None => format!("_ {}", param.name),
        Some(label) if label == &param.name && !subscript => label.clone(),
        Some(label) => format!("{label} {}", param.name),
    };
    let inout = if param.is_inout { "inout " } else { "" };
    let variadic = if param.is_variadic { "..." } else { "" };
    let default = param
        .default_value
        .as_ref()
        .map(|d| format!(" = {d}"))
        .unwrap_or_default();
    format!("{names}: {inout}{}{variadic}{default}", param.type_name)
}

fn declared_params(sig: &Signature, subscript: bool) -> String {
    sig.params
        .iter()
        .map(|p| declared_param(p, subscript))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameter type as seen by the handler closure
fn handler_param(param: &ParamDecl, sig: &Signature) -> String {
    let base = if sig
        .generic_params
        .iter()
        .any(|g| mentions(&param.type_name, &g.name))
    {
        "Any".to_string()
    } else {
        param.type_name.clone()
    };
    if param.is_variadic {
        format!("[{base}]")
    } else if param.is_inout {
        format!("inout {base}")
    } else {
        base
    }
}

fn handler_args(sig: &Signature) -> String {
    sig.params
        .iter()
        .map(|p| {
            if p.is_inout {
                format!("&{}", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn handler_effects(sig: &Signature) -> String {
    let mut effects = String::new();
    if sig.effects.is_async {
        effects.push_str(" async");
    }
    if let Some(throws) = &sig.effects.throws {
        if !sig.effects.rethrows() {
            effects.push(' ');
            effects.push_str(throws);
        }
    }
    effects
}

fn declared_effects(sig: &Signature) -> String {
    let mut effects = String::new();
    if sig.effects.is_async {
        effects.push_str(" async");
    }
    if let Some(throws) = &sig.effects.throws {
        effects.push(' ');
        effects.push_str(throws);
    }
    effects
}

fn call_prefix(sig: &Signature) -> String {
    let mut prefix = String::new();
    if sig.effects.throws() && !sig.effects.rethrows() {
        prefix.push_str("try ");
    }
    if sig.effects.is_async {
        prefix.push_str("await ");
    }
    prefix
}

fn returns_generic(sig: &Signature, return_type: &str) -> bool {
    sig.generic_params.iter().any(|g| mentions(return_type, &g.name))
}

/// Lines returning either the synthesized default or a crash with a hint
fn fallback(id: &str, return_type: &str, sig: &Signature, ctx: &RenderContext<'_>, level: usize) -> String {
    let default = if returns_generic(sig, return_type) {
        None
    } else {
        default_value(return_type, ctx.type_keys)
    };
    match default {
        Some(value) => indent(level, &format!("return {value}")),
        None => indent(
            level,
            &format!("fatalError(\"{id}Handler returns can't have a default value thus its handler must be set\")"),
        ),
    }
}

pub(crate) fn render_function(
    member: &Member,
    sig: &Signature,
    id: &str,
    slot: &Slot<'_>,
    ctx: &RenderContext<'_>,
) -> String {
    let acl = slot.acl;
    let stat = slot.static_prefix();
    let handler = format!("{id}Handler");
    let return_type = sig.return_type.as_deref().filter(|r| !is_void(Some(r)));

    let handler_params: Vec<String> = sig.params.iter().map(|p| handler_param(p, sig)).collect();
    let handler_return = match return_type {
        Some(ret) if returns_generic(sig, ret) => "Any".to_string(),
        Some(ret) => ret.to_string(),
        None => "()".to_string(),
    };
    let returns = return_type
        .map(|r| format!(" -> {r}"))
        .unwrap_or_default();

    let mut lines = vec![
        indent(1, &format!("{acl}{stat}var {id}CallCount = 0")),
        indent(
            1,
            &format!(
                "{acl}{stat}var {handler}: (({}){} -> {handler_return})?",
                handler_params.join(", "),
                handler_effects(sig)
            ),
        ),
        indent(
            1,
            &format!(
                "{acl}{stat}{}func {}{}({}){}{returns}{} {{",
                slot.override_prefix(),
                member.name,
                generic_clause(sig),
                declared_params(sig, false),
                declared_effects(sig),
                where_clause(sig)
            ),
        ),
        indent(2, &format!("{id}CallCount += 1")),
        indent(2, &format!("if let {handler} = {handler} {{")),
    ];

    let call = format!("{}{handler}({})", call_prefix(sig), handler_args(sig));
    match return_type {
        Some(ret) => {
            let cast = if returns_generic(sig, ret) {
                format!(" as! {ret}")
            } else {
                String::new()
            };
            lines.push(indent(3, &format!("return {call}{cast}")));
            lines.push(indent(2, "}"));
            lines.push(fallback(id, ret, sig, ctx, 2));
        }
        None => {
            lines.push(indent(3, &call));
            lines.push(indent(2, "}"));
        }
    }
    lines.push(indent(1, "}"));
    lines.join("\n")
}

pub(crate) fn render_subscript(
    sig: &Signature,
    settable: bool,
    id: &str,
    slot: &Slot<'_>,
    ctx: &RenderContext<'_>,
) -> String {
    let acl = slot.acl;
    let stat = slot.static_prefix();
    let handler = format!("{id}Handler");
    let set_handler = format!("{id}SetHandler");
    let return_type = sig.return_type.as_deref().unwrap_or("Void");
    let generic_return = returns_generic(sig, return_type);
    let handler_return = if generic_return { "Any" } else { return_type };
    let handler_params: Vec<String> = sig.params.iter().map(|p| handler_param(p, sig)).collect();
    let args = handler_args(sig);

    let mut lines = vec![
        indent(1, &format!("{acl}{stat}var {id}CallCount = 0")),
        indent(
            1,
            &format!(
                "{acl}{stat}var {handler}: (({}){} -> {handler_return})?",
                handler_params.join(", "),
                handler_effects(sig)
            ),
        ),
    ];
    if settable {
        let mut set_params = handler_params.clone();
        set_params.push(handler_return.to_string());
        lines.push(indent(1, &format!("{acl}{stat}var {id}SetCallCount = 0")));
        lines.push(indent(
            1,
            &format!("{acl}{stat}var {set_handler}: (({}) -> ())?", set_params.join(", ")),
        ));
    }

    lines.push(indent(
        1,
        &format!(
            "{acl}{stat}{}subscript{}({}) -> {return_type}{} {{",
            slot.override_prefix(),
            generic_clause(sig),
            declared_params(sig, true),
            where_clause(sig)
        ),
    ));
    lines.push(indent(2, &format!("get{} {{", declared_effects(sig))));
    lines.push(indent(3, &format!("{id}CallCount += 1")));
    lines.push(indent(3, &format!("if let {handler} = {handler} {{")));
    let cast = if generic_return {
        format!(" as! {return_type}")
    } else {
        String::new()
    };
    lines.push(indent(
        4,
        &format!("return {}{handler}({args}){cast}", call_prefix(sig)),
    ));
    lines.push(indent(3, "}"));
    lines.push(fallback(id, return_type, sig, ctx, 3));
    lines.push(indent(2, "}"));
    if settable {
        let set_args = if args.is_empty() {
            "newValue".to_string()
        } else {
            format!("{args}, newValue")
        };
        lines.push(indent(2, "set {"));
        lines.push(indent(3, &format!("{id}SetCallCount += 1")));
        lines.push(indent(
            3,
            &format!("if let {set_handler} = {set_handler} {{ {set_handler}({set_args}) }}"),
        ));
        lines.push(indent(2, "}"));
    }
    lines.push(indent(1, "}"));
    lines.join("\n")
}

/// How a declared initializer is spelled in the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitStyle {
    /// Protocol requirement, implemented without a superclass
    Requirement,
    /// Class initializer forwarded to `super.init`
    Forwarding { required: bool },
}

pub(crate) fn render_init(member: &Member, id: &str, style: InitStyle, slot: &Slot<'_>) -> Option<String> {
    let MemberKind::Initializer {
        signature: sig,
        is_failable,
        ..
    } = &member.kind
    else {
        return None;
    };
    let acl = slot.acl;
    let mock = slot.mock_name;
    let handler = format!("{id}Handler");
    let handler_params: Vec<String> = sig.params.iter().map(|p| handler_param(p, sig)).collect();
    let failable = if *is_failable { "?" } else { "" };
    let keyword = match style {
        InitStyle::Requirement | InitStyle::Forwarding { required: true } => "required ",
        InitStyle::Forwarding { required: false } => "override ",
    };

    let mut lines = vec![
        indent(1, &format!("{acl}static var {id}CallCount = 0")),
        indent(
            1,
            &format!(
                "{acl}static var {handler}: (({}){} -> ())?",
                handler_params.join(", "),
                handler_effects(sig)
            ),
        ),
        indent(
            1,
            &format!(
                "{keyword}{acl}init{failable}{}({}){} {{",
                generic_clause(sig),
                declared_params(sig, false),
                declared_effects(sig)
            ),
        ),
    ];
    if let InitStyle::Forwarding { .. } = style {
        let forwarded: Vec<String> = sig
            .params
            .iter()
            .map(|p| {
                let value = if p.is_inout {
                    format!("&{}", p.name)
                } else {
                    p.name.clone()
                };
                match &p.label {
                    Some(label) => format!("{label}: {value}"),
                    None => value,
                }
            })
            .collect();
        lines.push(indent(
            2,
            &format!("{}super.init({})", call_prefix(sig), forwarded.join(", ")),
        ));
    }
    lines.push(indent(2, &format!("{mock}.{id}CallCount += 1")));
    lines.push(indent(2, &format!("if let {handler} = {mock}.{handler} {{")));
    lines.push(indent(
        3,
        &format!("{}{handler}({})", call_prefix(sig), handler_args(sig)),
    ));
    lines.push(indent(2, "}"));
    lines.push(indent(2, "_doneInit = true"));
    lines.push(indent(1, "}"));
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{SwiftParser, SyntaxProvider};
    use crate::resolver::TypeKeys;
    use crate::types::{AccessLevel, Decl, MemberOrigin, Span};
    use std::sync::atomic::AtomicBool;

    fn member(source: &str) -> Member {
        let wrapped = format!("protocol P {{\n    {source}\n}}\n");
        let tree = SwiftParser::new().unwrap().parse_source(&wrapped).unwrap();
        let decl = tree.types[0].members[0].clone();
        let (name, kind, is_static) = match decl {
            Decl::Function(f) => (
                f.name.clone(),
                MemberKind::Function(Signature {
                    generic_params: f.generic_params,
                    params: f.params,
                    effects: f.effects,
                    return_type: f.return_type,
                    where_clause: f.where_clause,
                }),
                f.info.is_static(),
            ),
            Decl::Subscript(s) => (
                "subscript".to_string(),
                MemberKind::Subscript {
                    signature: Signature {
                        generic_params: s.generic_params,
                        params: s.params,
                        effects: s.effects,
                        return_type: Some(s.return_type),
                        where_clause: s.where_clause,
                    },
                    settable: s.settable,
                },
                s.info.is_static(),
            ),
            Decl::Initializer(i) => (
                "init".to_string(),
                MemberKind::Initializer {
                    signature: Signature {
                        generic_params: i.generic_params,
                        params: i.params,
                        effects: i.effects,
                        ..Default::default()
                    },
                    is_required: i.info.has_modifier("required"),
                    is_failable: i.is_failable,
                },
                false,
            ),
            other => panic!("unexpected declaration {other:?}"),
        };
        Member {
            name,
            kind,
            access: AccessLevel::Internal,
            is_static,
            span: Span::default(),
            origin: MemberOrigin::Interface,
            processed: false,
            attributes: vec![],
            source: source.to_string(),
        }
    }

    fn slot() -> Slot<'static> {
        Slot {
            acl: "",
            is_static: false,
            overrides: false,
            mock_name: "ServiceMock",
        }
    }

    fn function(source: &str) -> String {
        let keys = TypeKeys::from_names(["Client"]);
        let flag = AtomicBool::new(false);
        let ctx = RenderContext::new(&keys, &flag);
        let m = member(source);
        let MemberKind::Function(sig) = &m.kind else {
            panic!("not a function");
        };
        render_function(&m, sig, &m.name, &slot(), &ctx)
    }

    #[test]
    fn test_void_function() {
        let text = function("func reset()");
        let expected = [
            "    var resetCallCount = 0",
            "    var resetHandler: (() -> ())?",
            "    func reset() {",
            "        resetCallCount += 1",
            "        if let resetHandler = resetHandler {",
            "            resetHandler()",
            "        }",
            "    }",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_returning_function_falls_back_to_default() {
        let text = function("func count(of kind: String) -> Int");
        assert!(text.contains("var countHandler: ((String) -> Int)?"));
        assert!(text.contains("func count(of kind: String) -> Int {"));
        assert!(text.contains("return countHandler(kind)"));
        assert!(text.contains("        return 0\n"));
    }

    #[test]
    fn test_function_without_default_crashes_when_unset() {
        let text = function("func load() async throws -> Data");
        assert!(text.contains("var loadHandler: (() async throws -> Data)?"));
        assert!(text.contains("func load() async throws -> Data {"));
        assert!(text.contains("return try await loadHandler()"));
        assert!(text.contains("fatalError(\"loadHandler returns can't have a default value thus its handler must be set\")"));
    }

    #[test]
    fn test_generic_function_uses_any() {
        let text = function("func decode<T: Decodable>(_ data: Data, as type: T.Type) -> T");
        assert!(text.contains("var decodeHandler: ((Data, Any) -> Any)?"));
        assert!(text.contains("func decode<T: Decodable>(_ data: Data, as type: T.Type) -> T {"));
        assert!(text.contains("return decodeHandler(data, type) as! T"));
        assert!(text.contains("fatalError("));
    }

    #[test]
    fn test_rethrows_inout_and_variadic() {
        let text = function("func apply(_ values: Int..., into total: inout Int, _ body: (Int) throws -> Void) rethrows");
        assert!(text.contains("var applyHandler: (([Int], inout Int, (Int) throws -> Void) -> ())?"));
        assert!(text.contains("func apply(_ values: Int..., into total: inout Int, _ body: (Int) throws -> Void) rethrows {"));
        assert!(text.contains("            applyHandler(values, &total, body)\n"));
    }

    #[test]
    fn test_subscript_with_setter() {
        let keys = TypeKeys::new();
        let flag = AtomicBool::new(false);
        let ctx = RenderContext::new(&keys, &flag);
        let m = member("subscript(key: String) -> Int? { get set }");
        let MemberKind::Subscript { signature, settable } = &m.kind else {
            panic!("not a subscript");
        };
        let text = render_subscript(signature, *settable, "subscript", &slot(), &ctx);
        assert!(text.contains("var subscriptHandler: ((String) -> Int?)?"));
        assert!(text.contains("var subscriptSetHandler: ((String, Int?) -> ())?"));
        assert!(text.contains("subscript(_ key: String) -> Int? {"));
        assert!(text.contains("            return nil\n"));
        assert!(text.contains("if let subscriptSetHandler = subscriptSetHandler { subscriptSetHandler(key, newValue) }"));
    }

    #[test]
    fn test_protocol_init_requirement() {
        let m = member("init(id: String)");
        let text = render_init(&m, "init", InitStyle::Requirement, &slot()).unwrap();
        let expected = [
            "    static var initCallCount = 0",
            "    static var initHandler: ((String) -> ())?",
            "    required init(id: String) {",
            "        ServiceMock.initCallCount += 1",
            "        if let initHandler = ServiceMock.initHandler {",
            "            initHandler(id)",
            "        }",
            "        _doneInit = true",
            "    }",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_class_init_forwards_to_super() {
        let m = member("init(name: String, _ age: Int) throws");
        let text = render_init(&m, "initNameAge", InitStyle::Forwarding { required: false }, &slot())
            .unwrap();
        assert!(text.contains("override init(name: String, _ age: Int) throws {"));
        assert!(text.contains("        try super.init(name: name, age)\n"));
        assert!(text.contains("            try initNameAgeHandler(name, age)\n"));
    }

    #[test]
    fn test_overload_ids() {
        let members = vec![
            member("func fetch(id: Int)"),
            member("func fetch(name: String)"),
            member("func fetch(_ key: Int)"),
            member("func fetch(_ key: String)"),
            member("func reset()"),
        ];
        let ids = overload_ids(&members);
        let id = |i: usize| ids.get(&members[i]).unwrap();
        assert_eq!(id(0), "fetchId");
        assert_eq!(id(1), "fetchName");
        assert_eq!(id(2), "fetchKeyInt");
        assert_eq!(id(3), "fetchKeyString");
        assert_eq!(id(4), "reset");
    }

    #[test]
    fn test_overload_ids_fall_back_to_index() {
        let members = vec![
            member("func make() -> Int"),
            member("func make() -> String"),
            member("func make() -> Int"),
        ];
        let ids = overload_ids(&members);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get(&members[0]), Some("make1"));
        assert_eq!(ids.get(&members[1]), Some("make2"));
        assert_eq!(ids.get(&members[2]), Some("make1"));
    }

    #[test]
    fn test_unregistered_member_uses_stem() {
        let ids = overload_ids(Vec::<&Member>::new());
        assert!(ids.is_empty());
        assert_eq!(ids.id_for(&member("subscript(i: Int) -> Int")), "subscript");
    }

    #[test]
    fn test_operator_names_become_identifiers() {
        assert_eq!(identifier_name("=="), "opEqualEqual");
        assert_eq!(identifier_name("`default`"), "default");
    }
}
