//! Declaration readers over tree-sitter Swift nodes.
//!
//! Each reader takes one declaration node and pulls its parts out through
//! field names and child kinds: modifiers, generic parameters, parameter
//! clauses, effects, return types and accessor blocks. Text is only sliced
//! out of the source for leaf values such as type names and defaults.

use crate::types::{
    AssociatedTypeDecl, Decl, DeclInfo, Effects, FuncDecl, GenericParam, InitDecl, ParamDecl,
    Span, SubscriptDecl, TypeAliasDecl, TypeDecl, TypeKind, VarDecl,
};
use tree_sitter::Node;

/// Node kinds that open a type declaration
pub const TYPE_DECLARATIONS: &[&str] = &["class_declaration", "protocol_declaration"];

/// Header of a type declaration, up to its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHeader {
    pub kind: TypeKind,
    pub name: String,
    pub modifiers: Vec<String>,
    pub attributes: Vec<String>,
    pub generic_params: Vec<GenericParam>,
    pub inheritance: Vec<String>,
}

/// Collapse runs of whitespace into single spaces
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn node_text<'s>(node: &Node, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Comments and directives the grammar attaches anywhere as extras
fn is_extra(node: &Node) -> bool {
    matches!(
        node.kind(),
        "comment" | "multiline_comment" | "directive" | "diagnostic"
    )
}

fn children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).filter(|c| !is_extra(c)).collect()
}

fn child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    children(node).into_iter().find(|c| c.kind() == kind)
}

fn has_child(node: &Node, kinds: &[&str]) -> bool {
    children(node).iter().any(|c| kinds.contains(&c.kind()))
}

/// Normalized text covering `nodes`, from the first one's start to the last one's end
fn run_text(nodes: &[Node], source: &str) -> Option<String> {
    let first = nodes.first()?;
    let last = nodes.last()?;
    source
        .get(first.start_byte()..last.end_byte())
        .map(normalize)
        .filter(|text| !text.is_empty())
}

/// Text of the children following the `token` child, up to the first child
/// whose kind is in `stop`
fn text_after(node: &Node, token: &str, stop: &[&str], source: &str) -> Option<String> {
    let children = children(node);
    let start = children.iter().position(|c| c.kind() == token)? + 1;
    let run: Vec<Node> = children[start..]
        .iter()
        .take_while(|c| !stop.contains(&c.kind()))
        .copied()
        .collect();
    run_text(&run, source)
}

/// Attributes and modifiers from the `modifiers` child
fn prefix(node: &Node, source: &str) -> (Vec<String>, Vec<String>) {
    let mut attributes = Vec::new();
    let mut modifiers = Vec::new();
    for group in children(node).iter().filter(|c| c.kind() == "modifiers") {
        for modifier in children(group) {
            let text = node_text(&modifier, source);
            if modifier.kind() == "attribute" {
                attributes.push(normalize(text));
            } else {
                modifiers.push(text.split_whitespace().collect());
            }
        }
    }
    (attributes, modifiers)
}

fn generic_params(node: &Node, source: &str) -> Vec<GenericParam> {
    let Some(list) = child_of_kind(node, "type_parameters") else {
        return Vec::new();
    };
    children(&list)
        .iter()
        .filter(|c| c.kind() == "type_parameter")
        .filter_map(|param| {
            let name = child_of_kind(param, "type_identifier")?;
            Some(GenericParam {
                name: node_text(&name, source).to_string(),
                constraint: text_after(param, ":", &[], source),
            })
        })
        .collect()
}

/// Parameters of a function, initializer or subscript. Defaults hang off the
/// declaration node right after each parameter.
fn params(node: &Node, source: &str, subscript: bool) -> Vec<ParamDecl> {
    let mut params: Vec<ParamDecl> = Vec::new();
    let mut index = 0;
    let mut after_default_eq = false;
    for child in children(node) {
        match child.kind() {
            "parameter" => {
                if let Some(param) = param(&child, source, index, subscript) {
                    params.push(param);
                }
                index += 1;
            }
            "=" => after_default_eq = true,
            _ if after_default_eq && child.is_named() => {
                after_default_eq = false;
                if let Some(last) = params.last_mut() {
                    last.default_value = Some(normalize(node_text(&child, source)));
                }
            }
            _ => {}
        }
    }
    params
}

fn param(node: &Node, source: &str, index: usize, subscript: bool) -> Option<ParamDecl> {
    let name = node_text(&node.child_by_field_name("name")?, source);
    let label = match node.child_by_field_name("external_name") {
        Some(external) => Some(node_text(&external, source)),
        None if subscript => None,
        None => Some(name),
    };

    let children = children(node);
    let colon = children.iter().position(|c| c.kind() == ":")?;
    let mut is_inout = false;
    let mut pieces = Vec::new();
    for modifier in children[colon + 1..]
        .iter()
        .filter(|c| c.kind() == "parameter_modifiers")
        .flat_map(|c| self::children(c))
    {
        match node_text(&modifier, source) {
            "inout" => is_inout = true,
            other => pieces.push(normalize(other)),
        }
    }
    let type_nodes: Vec<Node> = children[colon + 1..]
        .iter()
        .filter(|c| !matches!(c.kind(), "parameter_modifiers" | "..."))
        .copied()
        .collect();
    pieces.push(run_text(&type_nodes, source)?);

    Some(ParamDecl {
        label: label.filter(|l| *l != "_").map(str::to_string),
        name: if name == "_" {
            format!("arg{index}")
        } else {
            name.to_string()
        },
        type_name: pieces.join(" "),
        is_variadic: children.iter().any(|c| c.kind() == "..."),
        is_inout,
        default_value: None,
    })
}

/// `async` and `throws` written after the parameter clause
fn effects(node: &Node, source: &str) -> Effects {
    let mut effects = Effects::default();
    for child in children(node) {
        match child.kind() {
            "async" | "reasync" => effects.is_async = true,
            "throws" | "throws_clause" => effects.throws = Some(normalize(node_text(&child, source))),
            "->" | "type_constraints" | "function_body" | "computed_property" => break,
            _ => {}
        }
    }
    effects
}

fn return_type(node: &Node, source: &str) -> Option<String> {
    text_after(
        node,
        "->",
        &["type_constraints", "function_body", "computed_property"],
        source,
    )
}

fn where_clause(node: &Node, source: &str) -> Option<String> {
    let constraints = child_of_kind(node, "type_constraints")?;
    text_after(&constraints, "where_keyword", &[], source)
}

/// Whether an accessor block lets callers write the value
fn accessors_settable(block: &Node) -> bool {
    match block.kind() {
        "protocol_property_requirements" => has_child(block, &["setter_specifier"]),
        "computed_property" => has_child(block, &["computed_setter", "computed_modify"]),
        "willset_didset_block" => true,
        _ => false,
    }
}

const ACCESSOR_BLOCKS: &[&str] = &[
    "computed_property",
    "protocol_property_requirements",
    "willset_didset_block",
];

fn variable(node: &Node, info: DeclInfo, source: &str) -> Option<Decl> {
    let pattern = node.child_by_field_name("name")?;
    let binding = children(node)
        .into_iter()
        .chain(children(&pattern))
        .find(|c| c.kind() == "value_binding_pattern");
    let is_let = binding.is_some_and(|b| node_text(&b, source).trim() == "let");
    let name = pattern
        .child_by_field_name("bound_identifier")
        .map(|n| node_text(&n, source))
        .unwrap_or_else(|| node_text(&pattern, source));
    let type_name = child_of_kind(node, "type_annotation")
        .and_then(|annotation| text_after(&annotation, ":", &[], source));
    let default_value = node
        .child_by_field_name("value")
        .map(|value| normalize(node_text(&value, source)));
    let accessors = children(node)
        .into_iter()
        .find(|c| ACCESSOR_BLOCKS.contains(&c.kind()));

    let settable = match (&default_value, accessors) {
        _ if is_let => false,
        (None, Some(block)) => accessors_settable(&block),
        _ => true,
    };

    Some(Decl::Variable(VarDecl {
        info,
        name: name.to_string(),
        type_name,
        is_let,
        default_value,
        settable,
    }))
}

fn function(node: &Node, info: DeclInfo, source: &str) -> Option<Decl> {
    let name = node_text(&node.child_by_field_name("name")?, source).to_string();
    Some(Decl::Function(FuncDecl {
        info,
        name,
        generic_params: generic_params(node, source),
        params: params(node, source, false),
        effects: effects(node, source),
        return_type: return_type(node, source),
        where_clause: where_clause(node, source),
    }))
}

fn initializer(node: &Node, info: DeclInfo, source: &str) -> Decl {
    Decl::Initializer(InitDecl {
        info,
        generic_params: generic_params(node, source),
        params: params(node, source, false),
        effects: effects(node, source),
        is_failable: has_child(node, &["?", "!"]),
    })
}

fn subscript(node: &Node, info: DeclInfo, source: &str) -> Option<Decl> {
    let settable = child_of_kind(node, "computed_property").is_some_and(|b| accessors_settable(&b));
    Some(Decl::Subscript(SubscriptDecl {
        info,
        generic_params: generic_params(node, source),
        params: params(node, source, true),
        effects: effects(node, source),
        return_type: return_type(node, source)?,
        where_clause: where_clause(node, source),
        settable,
    }))
}

/// Read the header of a `class_declaration` or `protocol_declaration`
pub fn type_header(node: &Node, source: &str) -> Option<TypeHeader> {
    let keyword = node.child_by_field_name("declaration_kind")?;
    let kind = TypeKind::from_keyword(node_text(&keyword, source))?;
    let name_node = node.child_by_field_name("name")?;
    let name = match name_node.kind() {
        // `extension Core.Store` names a user type
        "user_type" => children(&name_node)
            .iter()
            .filter(|c| c.kind() == "type_identifier")
            .map(|c| node_text(c, source))
            .collect::<Vec<_>>()
            .join("."),
        _ => node_text(&name_node, source).to_string(),
    };
    let inheritance = children(node)
        .iter()
        .filter(|c| c.kind() == "inheritance_specifier")
        .filter_map(|spec| spec.child_by_field_name("inherits_from"))
        .filter_map(|parent| simplify_parent(node_text(&parent, source)))
        .collect();
    let (attributes, modifiers) = prefix(node, source);

    Some(TypeHeader {
        kind,
        name,
        modifiers,
        attributes,
        generic_params: generic_params(node, source),
        inheritance,
    })
}

/// `Core.Repository<Item>` becomes `Repository`
fn simplify_parent(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("any ").unwrap_or(raw);
    let base = raw.split('<').next().unwrap_or(raw);
    let name = base.rsplit('.').next().unwrap_or(base).trim();
    (!name.is_empty() && name != "class").then(|| name.to_string())
}

/// Normalized import statement from an `import_declaration` node's text
pub fn import_statement(text: &str) -> String {
    normalize(text).trim_end_matches(';').trim_end().to_string()
}

/// Read one member declaration. `span` is its position in the file without
/// surrounding comments. Declarations that never appear in a mock give `None`.
pub fn member_decl(node: &Node, span: Span, source: &str) -> Option<Decl> {
    let (attributes, modifiers) = prefix(node, source);
    let info = DeclInfo {
        modifiers,
        attributes,
        span,
        text: span.slice(source).trim().to_string(),
    };

    match node.kind() {
        "property_declaration" | "protocol_property_declaration" => variable(node, info, source),
        "function_declaration" | "protocol_function_declaration" => function(node, info, source),
        "init_declaration" => Some(initializer(node, info, source)),
        "subscript_declaration" => subscript(node, info, source),
        "typealias_declaration" => {
            let name = node_text(&node.child_by_field_name("name")?, source).to_string();
            let value = text_after(node, "=", &[], source)?;
            Some(Decl::TypeAlias(TypeAliasDecl { info, name, value }))
        }
        "associatedtype_declaration" => {
            let name = node_text(&node.child_by_field_name("name")?, source).to_string();
            Some(Decl::AssociatedType(AssociatedTypeDecl {
                info,
                name,
                bound: text_after(node, ":", &["=", "type_constraints"], source),
                default_value: text_after(node, "=", &["type_constraints"], source),
            }))
        }
        kind if TYPE_DECLARATIONS.contains(&kind) => {
            let header = type_header(node, source)?;
            Some(Decl::Type(Box::new(TypeDecl {
                info,
                kind: header.kind,
                name: header.name,
                generic_params: header.generic_params,
                inheritance: header.inheritance,
                leading_comments: String::new(),
                members: Vec::new(),
            })))
        }
        _ => None,
    }
}
