use super::SyntaxProvider;
use super::signature::{TYPE_DECLARATIONS, import_statement, member_decl, type_header};
use crate::{
    error::{Error, Result},
    types::{Decl, DeclInfo, IfClause, IfConfigDecl, ImportDecl, SourceTree, Span, TypeDecl},
};
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Tree};

/// Syntax provider backed by the tree-sitter Swift grammar.
///
/// Declarations and their signatures are read from the tree's nodes.
/// Conditional-compilation blocks are rebuilt from directive lines because
/// the grammar treats them as extras.
pub struct SwiftParser {
    language: Language,
}

impl SwiftParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_swift::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| Error::TreeSitterError(format!("Failed to set language: {e}")))?;
        Ok(Self { language })
    }

    pub fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| Error::TreeSitterError(format!("Failed to set language: {e}")))?;
        parser
            .parse(source, None)
            .ok_or_else(|| Error::ParseError("Failed to parse source code".to_string()))
    }

    fn type_decl(&self, node: &Node, core: Span, source: &str) -> Option<TypeDecl> {
        let header = type_header(node, source)?;
        let members = node
            .child_by_field_name("body")
            .map(|body| collect_members(&body, source))
            .unwrap_or_default();

        Some(TypeDecl {
            info: DeclInfo {
                modifiers: header.modifiers,
                attributes: header.attributes,
                span: core,
                text: core.slice(source).to_string(),
            },
            kind: header.kind,
            name: header.name,
            generic_params: header.generic_params,
            inheritance: header.inheritance,
            leading_comments: leading_comments(source, core.start),
            members,
        })
    }
}

impl SyntaxProvider for SwiftParser {
    fn parse_source(&self, source: &str) -> Result<SourceTree> {
        let tree = self.parse(source)?;
        let root = tree.root_node();
        let has_errors = root.has_error();
        if has_errors {
            debug!("Recovered from syntax errors while parsing");
        }

        let mut types = Vec::new();
        let mut imports = Vec::new();
        let mut occupied = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let Some(core) = core_range(&child, source) else {
                if !is_directive_node(&child) {
                    occupied.push(node_span(&child));
                }
                continue;
            };
            match child.kind() {
                "import_declaration" => {
                    imports.push((core.start, import_statement(core.slice(source))));
                }
                kind if TYPE_DECLARATIONS.contains(&kind) => {
                    occupied.push(core);
                    if let Some(decl) = self.type_decl(&child, core, source) {
                        types.push(decl);
                    }
                }
                _ => occupied.push(core),
            }
        }

        let directives = scan_directives(source, Span::new(0, source.len()), &occupied);
        Ok(SourceTree {
            imports: guard_imports(imports, &directives),
            types,
            has_errors,
        })
    }
}

fn node_span(node: &Node) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

fn is_directive_node(node: &Node) -> bool {
    matches!(node.kind(), "directive" | "diagnostic")
}

fn collect_members(body: &Node, source: &str) -> Vec<Decl> {
    let mut members = Vec::new();
    let mut occupied = Vec::new();

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        let Some(core) = core_range(&child, source) else {
            if !is_directive_node(&child) {
                occupied.push(node_span(&child));
            }
            continue;
        };
        occupied.push(core);
        if let Some(decl) = member_decl(&child, core, source) {
            members.push(decl);
        }
    }

    let directives = scan_directives(source, node_span(body), &occupied);
    nest_conditionals(members, directives, source)
}

fn is_directive_line(line: &str) -> bool {
    let keyword = line.split(|c: char| c.is_whitespace() || c == '(').next().unwrap_or("");
    matches!(
        keyword,
        "#if" | "#elseif" | "#else" | "#endif" | "#warning" | "#error" | "#sourceLocation"
    )
}

/// Declaration range without leading or trailing comments and directives.
/// Returns `None` when the node holds nothing else.
fn core_range(node: &Node, source: &str) -> Option<Span> {
    let span = node_span(node);
    let mut start = span.start;
    let mut end = span.end.min(source.len());

    loop {
        let text = source.get(start..end)?;
        let trimmed = text.trim_start();
        start += text.len() - trimmed.len();
        if trimmed.starts_with("//") || is_directive_line(trimmed) {
            start += trimmed.find('\n').map(|i| i + 1).unwrap_or(trimmed.len());
        } else if trimmed.starts_with("/*") {
            start += trimmed.find("*/").map(|i| i + 2).unwrap_or(trimmed.len());
        } else {
            break;
        }
    }

    loop {
        let text = source.get(start..end)?;
        let trimmed = text.trim_end();
        end = start + trimmed.len();
        let line_start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let last_line = trimmed[line_start..].trim_start();
        if line_start > 0 && (last_line.starts_with("//") || is_directive_line(last_line)) {
            end = start + line_start;
        } else if trimmed.ends_with("*/") && line_start > 0 && last_line.starts_with("/*") {
            end = start + line_start;
        } else {
            break;
        }
    }

    (end > start).then(|| Span::new(start, end))
}

/// Comment lines directly above `start`, blank lines included
fn leading_comments(source: &str, start: usize) -> String {
    let head = source.get(..start).unwrap_or("");
    let (above, partial) = match head.rfind('\n') {
        Some(idx) => (&head[..idx], &head[idx + 1..]),
        None => ("", head),
    };
    if !partial.trim().is_empty() {
        return String::new();
    }

    let mut lines = Vec::new();
    let mut in_block = false;
    for line in above.lines().rev() {
        let trimmed = line.trim();
        if in_block {
            lines.push(trimmed);
            if trimmed.contains("/*") {
                in_block = false;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("//") {
            lines.push(trimmed);
        } else if trimmed.ends_with("*/") {
            if trimmed.starts_with("/*") {
                lines.push(trimmed);
            } else if trimmed.contains("/*") {
                break;
            } else {
                lines.push(trimmed);
                in_block = true;
            }
        } else {
            break;
        }
    }

    lines.reverse();
    lines.join("\n").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DirectiveKind {
    If(String),
    ElseIf(String),
    Else,
    EndIf,
}

#[derive(Debug, Clone)]
struct Directive {
    span: Span,
    text: String,
    kind: DirectiveKind,
}

impl DirectiveKind {
    fn parse(text: &str) -> Option<Self> {
        let (keyword, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));
        match keyword {
            "#if" => Some(Self::If(rest.trim().to_string())),
            "#elseif" => Some(Self::ElseIf(rest.trim().to_string())),
            "#else" => Some(Self::Else),
            "#endif" => Some(Self::EndIf),
            _ => None,
        }
    }
}

/// Conditional-compilation lines inside `within` that are not part of an
/// occupied declaration range
fn scan_directives(source: &str, within: Span, occupied: &[Span]) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut offset = within.start;
    for line in within.slice(source).split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') {
            continue;
        }
        let at = line_start + (line.len() - trimmed.len());
        if occupied.iter().any(|s| s.contains(at)) {
            continue;
        }
        let text = trimmed.split("//").next().unwrap_or("").trim_end();
        if let Some(kind) = DirectiveKind::parse(text) {
            directives.push(Directive {
                span: Span::new(at, at + trimmed.trim_end().len()),
                text: text.to_string(),
                kind,
            });
        }
    }
    directives
}

struct Frame {
    start: usize,
    clauses: Vec<IfClause>,
}

/// Rebuild `#if` blocks around members from the directive positions
fn nest_conditionals(members: Vec<Decl>, directives: Vec<Directive>, source: &str) -> Vec<Decl> {
    let mut root = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut directives = directives.into_iter().peekable();

    fn push(frames: &mut [Frame], root: &mut Vec<Decl>, decl: Decl) {
        match frames.last_mut().and_then(|f| f.clauses.last_mut()) {
            Some(clause) => clause.members.push(decl),
            None => root.push(decl),
        }
    }

    let apply = |directive: Directive, frames: &mut Vec<Frame>, root: &mut Vec<Decl>| {
        match directive.kind {
            DirectiveKind::If(_) => frames.push(Frame {
                start: directive.span.start,
                clauses: vec![IfClause {
                    directive: directive.text,
                    members: Vec::new(),
                }],
            }),
            DirectiveKind::ElseIf(_) | DirectiveKind::Else => {
                if let Some(frame) = frames.last_mut() {
                    frame.clauses.push(IfClause {
                        directive: directive.text,
                        members: Vec::new(),
                    });
                }
            }
            DirectiveKind::EndIf => {
                if let Some(frame) = frames.pop() {
                    let span = Span::new(frame.start, directive.span.end);
                    let block = Decl::IfConfig(IfConfigDecl {
                        span,
                        text: span.slice(source).to_string(),
                        clauses: frame.clauses,
                    });
                    push(frames, root, block);
                }
            }
        }
    };

    for member in members {
        let start = member.span().start;
        while let Some(directive) = directives.next_if(|d| d.span.start < start) {
            apply(directive, &mut frames, &mut root);
        }
        push(&mut frames, &mut root, member);
    }
    for directive in directives {
        apply(directive, &mut frames, &mut root);
    }

    // Unterminated blocks keep their members unguarded
    while let Some(frame) = frames.pop() {
        for clause in frame.clauses {
            for member in clause.members {
                push(&mut frames, &mut root, member);
            }
        }
    }

    root
}

struct GuardFrame {
    previous: Vec<String>,
    current: Option<String>,
}

fn is_simple_condition(condition: &str) -> bool {
    condition
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '(' | ')' | '.' | '!'))
}

fn wrap(condition: &str) -> String {
    if is_simple_condition(condition) {
        condition.to_string()
    } else {
        format!("({condition})")
    }
}

impl GuardFrame {
    fn condition(&self) -> Option<String> {
        let mut pieces: Vec<String> = self
            .previous
            .iter()
            .map(|p| format!("!{}", wrap(p)))
            .collect();
        if let Some(current) = &self.current {
            pieces.push(current.clone());
        }
        match pieces.len() {
            0 => None,
            1 => pieces.pop(),
            _ => Some(pieces.iter().map(|p| wrap(p)).collect::<Vec<_>>().join(" && ")),
        }
    }
}

/// Attach the enclosing `#if` condition to each top-level import
fn guard_imports(imports: Vec<(usize, String)>, directives: &[Directive]) -> Vec<ImportDecl> {
    let mut frames: Vec<GuardFrame> = Vec::new();
    let mut pending = directives.iter().peekable();
    let mut result = Vec::with_capacity(imports.len());

    for (offset, statement) in imports {
        while let Some(directive) = pending.next_if(|d| d.span.start < offset) {
            match &directive.kind {
                DirectiveKind::If(condition) => frames.push(GuardFrame {
                    previous: Vec::new(),
                    current: Some(condition.clone()),
                }),
                DirectiveKind::ElseIf(condition) => {
                    if let Some(frame) = frames.last_mut() {
                        frame.previous.extend(frame.current.take());
                        frame.current = Some(condition.clone());
                    }
                }
                DirectiveKind::Else => {
                    if let Some(frame) = frames.last_mut() {
                        frame.previous.extend(frame.current.take());
                    }
                }
                DirectiveKind::EndIf => {
                    frames.pop();
                }
            }
        }

        let conditions: Vec<String> = frames.iter().filter_map(GuardFrame::condition).collect();
        let guard = match conditions.len() {
            0 => None,
            1 => conditions.into_iter().next(),
            _ => Some(
                conditions
                    .iter()
                    .map(|c| wrap(c))
                    .collect::<Vec<_>>()
                    .join(" && "),
            ),
        };
        result.push(ImportDecl { statement, guard });
    }

    result
}
