//! Default values and small type-text helpers shared by the templates.

use crate::resolver::TypeKeys;

const INTEGER_TYPES: [&str; 10] = [
    "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16", "UInt32", "UInt64",
];

const FLOAT_TYPES: [&str; 7] = [
    "Double",
    "Float",
    "Float32",
    "Float64",
    "Float80",
    "CGFloat",
    "TimeInterval",
];

/// Literal a stored property of `type_name` can start from, if any
pub fn default_value(type_name: &str, keys: &TypeKeys) -> Option<String> {
    let ty = type_name.trim();
    if ty.is_empty() {
        return None;
    }
    if is_optional(ty) || ty.starts_with("Optional<") {
        return Some("nil".to_string());
    }
    if INTEGER_TYPES.contains(&ty) {
        return Some("0".to_string());
    }
    if FLOAT_TYPES.contains(&ty) {
        return Some("0.0".to_string());
    }
    match ty {
        "Bool" => return Some("false".to_string()),
        "String" => return Some("\"\"".to_string()),
        "Void" | "()" => return Some("()".to_string()),
        _ => {}
    }
    if is_function_type(ty) {
        return None;
    }

    if let Some(inner) = ty.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let is_dictionary = split_top_level(inner, ':').len() > 1;
        return Some(if is_dictionary { "[:]" } else { "[]" }.to_string());
    }
    if ty.starts_with("Array<") {
        return Some("[]".to_string());
    }
    if ty.starts_with("Dictionary<") {
        return Some("[:]".to_string());
    }
    if ty.starts_with("Set<") && ty.ends_with('>') {
        return Some(format!("{ty}()"));
    }

    if let Some(inner) = ty.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        let elements = split_top_level(inner, ',');
        let defaults = elements
            .iter()
            .map(|element| default_value(tuple_element_type(element), keys))
            .collect::<Option<Vec<_>>>()?;
        if defaults.len() == 1 {
            return defaults.into_iter().next();
        }
        return Some(format!("({})", defaults.join(", ")));
    }

    keys.get(ty).map(str::to_string)
}

/// Optional or implicitly unwrapped at the outermost level
pub fn is_optional(ty: &str) -> bool {
    let ty = ty.trim();
    (ty.ends_with('?') || ty.ends_with('!')) && depth_at_end(ty) == 0
}

/// `(A) -> B` style type, possibly with effects, but not an optional closure
pub fn is_function_type(ty: &str) -> bool {
    !is_optional(ty) && find_top_level_arrow(ty).is_some()
}

/// `Void`, `()` or no return type at all
pub fn is_void(return_type: Option<&str>) -> bool {
    matches!(return_type.map(str::trim), None | Some("Void") | Some("()"))
}

/// `Observable<T>` element type
pub fn observable_element(ty: &str) -> Option<&str> {
    let ty = ty.trim();
    let ty = ty
        .strip_suffix('?')
        .or_else(|| ty.strip_suffix('!'))
        .unwrap_or(ty);
    ty.strip_prefix("Observable<")?.strip_suffix('>')
}

/// Uppercase the first character, keeping the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `word` appears in `ty` as a whole identifier
pub fn mentions(ty: &str, word: &str) -> bool {
    ty.match_indices(word).any(|(i, _)| {
        let before = ty[..i].chars().next_back();
        let after = ty[i + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Identifier-safe version of a type name, used to build overload suffixes
pub fn type_identifier(ty: &str) -> String {
    let mut out = String::new();
    let mut upper = true;
    for ch in ty.chars() {
        if ch.is_alphanumeric() {
            if upper {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper = false;
        } else {
            match ch {
                '?' => out.push_str("Opt"),
                '[' => out.push_str("Array"),
                _ => {}
            }
            upper = true;
        }
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tuple_element_type(element: &str) -> &str {
    match split_top_level(element, ':').as_slice() {
        [_, ty] => ty.trim(),
        _ => element.trim(),
    }
}

fn depth_at_end(ty: &str) -> i32 {
    let mut depth = 0;
    let mut prev = '\0';
    for c in ty.chars() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' => depth -= 1,
            '>' if prev != '-' => depth -= 1,
            _ => {}
        }
        prev = c;
    }
    depth
}

fn find_top_level_arrow(ty: &str) -> Option<usize> {
    let mut depth = 0i32;
    let bytes = ty.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'<' => depth += 1,
            b')' | b']' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {
                if depth == 0 {
                    return Some(i - 1);
                }
            }
            b'>' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside brackets; `->` never counts as a closing bracket
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut prev = '\0';
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' => depth -= 1,
            '>' if prev != '-' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&text[start..]);
    parts
}
