//! Annotation lookup in documentation comments.
//!
//! Only doc comments count: `///` lines and `/** ... */` blocks. The marker may
//! carry arguments, for example
//! `@mockable(typealias: T = Any; U = String; module: prefix = Core; rx: stream = BehaviorSubject)`.

use crate::types::AnnotationMetadata;
use regex::Regex;
use std::sync::LazyLock;

static ARGUMENT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s;(,])(typealias|module|rx|var)\s*:")
        .expect("annotation argument pattern is valid")
});

/// Text of the doc comments in `comments`, markers stripped, one line per entry
pub fn doc_comment_text(comments: &str) -> String {
    let mut lines = Vec::new();
    let mut in_doc_block = false;
    let mut in_plain_block = false;

    for line in comments.lines() {
        let trimmed = line.trim();
        if in_doc_block || in_plain_block {
            let (body, closed) = match trimmed.find("*/") {
                Some(idx) => (&trimmed[..idx], true),
                None => (trimmed, false),
            };
            if in_doc_block {
                lines.push(body.trim_start_matches('*').trim().to_string());
            }
            if closed {
                in_doc_block = false;
                in_plain_block = false;
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("///") {
            lines.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("/**") {
            match rest.find("*/") {
                Some(idx) => lines.push(rest[..idx].trim().to_string()),
                None => {
                    lines.push(rest.trim().to_string());
                    in_doc_block = true;
                }
            }
        } else if trimmed.starts_with("/*") && !trimmed.contains("*/") {
            in_plain_block = true;
        }
    }

    lines.join("\n")
}

/// Look for `annotation` in the doc comments. Returns the parsed arguments
/// (empty when the marker has none) when the marker is present.
pub fn parse_annotation(comments: &str, annotation: &str) -> Option<AnnotationMetadata> {
    if annotation.is_empty() {
        return None;
    }
    let docs = doc_comment_text(comments);
    let end = find_marker(&docs, annotation)?;
    let rest = &docs[end..];
    Some(match argument_list(rest) {
        Some(args) => parse_arguments(args),
        None => AnnotationMetadata::default(),
    })
}

/// End offset of the first standalone occurrence of `annotation`
fn find_marker(text: &str, annotation: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(idx) = text[from..].find(annotation) {
        let end = from + idx + annotation.len();
        let continues_word = text[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if !continues_word {
            return Some(end);
        }
        from = end;
    }
    None
}

/// Content of a parenthesized list that directly follows the marker
fn argument_list(rest: &str) -> Option<&str> {
    let trimmed = rest.trim_start();
    if !trimmed.starts_with('(') {
        return None;
    }
    let offset = rest.len() - trimmed.len();
    let mut depth = 0usize;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[offset + 1..offset + idx]);
                }
            }
            _ => {}
        }
    }
    // Unterminated list: take everything after the paren
    Some(&rest[offset + 1..])
}

/// Parse `key: a = b; c = d` sections
pub fn parse_arguments(args: &str) -> AnnotationMetadata {
    let mut metadata = AnnotationMetadata::default();
    let keys: Vec<(String, usize, usize)> = ARGUMENT_KEY
        .captures_iter(args)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?;
            Some((key.as_str().to_string(), whole.start(), whole.end()))
        })
        .collect();

    for (idx, (key, _, body_start)) in keys.iter().enumerate() {
        let body_end = keys.get(idx + 1).map(|k| k.1).unwrap_or(args.len());
        let body = &args[*body_start..body_end];
        for (name, value) in pairs(body) {
            match key.as_str() {
                "typealias" => {
                    metadata.type_aliases.insert(name, value);
                }
                "rx" | "var" => {
                    metadata.var_types.insert(name, value);
                }
                "module" if name == "prefix" => metadata.module = Some(value),
                _ => {}
            }
        }
    }

    metadata
}

fn pairs(body: &str) -> impl Iterator<Item = (String, String)> + '_ {
    body.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        let value = value.trim();
        (!name.is_empty() && !value.is_empty()).then(|| (name.to_string(), value.to_string()))
    })
}
