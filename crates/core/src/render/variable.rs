use super::defaults::{default_value, is_function_type, is_optional, observable_element};
use super::{RenderContext, Slot, indent};
use std::sync::atomic::Ordering;

/// Counter, backing store and accessor pair for a stored or computed property
pub(crate) fn render_variable(
    name: &str,
    type_name: &str,
    declared_default: Option<&str>,
    var_override: Option<&str>,
    slot: &Slot<'_>,
    ctx: &RenderContext<'_>,
) -> Option<String> {
    let type_name = type_name.trim();
    if type_name.is_empty() {
        return None;
    }
    if let Some(element) = observable_element(type_name) {
        return Some(render_subject_variable(
            name,
            type_name,
            element,
            var_override,
            slot,
            ctx,
        ));
    }

    let acl = slot.acl;
    let stat = slot.static_prefix();
    let counter = format!("{name}SetCallCount");
    let backing = match default_value(type_name, ctx.type_keys)
        .or_else(|| declared_default.map(str::to_string))
    {
        Some(value) => format!("private {stat}var _{name}: {type_name} = {value}"),
        None if is_function_type(type_name) => format!("private {stat}var _{name}: ({type_name})!"),
        None if is_optional(type_name) => format!("private {stat}var _{name}: {type_name}"),
        None => format!("private {stat}var _{name}: {type_name}!"),
    };

    let lines = [
        indent(1, &format!("{acl}{stat}var {counter} = 0")),
        indent(1, &backing),
        indent(
            1,
            &format!(
                "{acl}{stat}{}var {name}: {type_name} {{",
                slot.override_prefix()
            ),
        ),
        indent(2, &format!("get {{ return _{name} }}")),
        indent(2, "set {"),
        indent(3, &format!("_{name} = newValue")),
        indent(3, &count_statement(&counter, slot)),
        indent(2, "}"),
        indent(1, "}"),
    ];
    Some(lines.join("\n"))
}

/// `Observable<T>` property backed by an RxSwift subject the test can drive
fn render_subject_variable(
    name: &str,
    type_name: &str,
    element: &str,
    var_override: Option<&str>,
    slot: &Slot<'_>,
    ctx: &RenderContext<'_>,
) -> String {
    ctx.custom_imports.store(true, Ordering::Relaxed);

    let acl = slot.acl;
    let stat = slot.static_prefix();
    let subject_kind = var_override.unwrap_or("PublishSubject").trim();
    let subject_type = if subject_kind.contains('<') {
        subject_kind.to_string()
    } else {
        format!("{subject_kind}<{element}>")
    };
    let subject = format!("{name}Subject");
    let counter = format!("{subject}SetCallCount");

    let initial = if subject_type.starts_with("PublishSubject<") {
        Some(format!("{subject_type}()"))
    } else if subject_type.starts_with("ReplaySubject<") {
        Some(format!("{subject_type}.create(bufferSize: 1)"))
    } else if subject_type.starts_with("BehaviorSubject<") {
        default_value(element, ctx.type_keys).map(|v| format!("{subject_type}(value: {v})"))
    } else {
        None
    };
    let storage = match initial {
        Some(value) => format!("{acl}{stat}var {subject} = {value}"),
        None => format!("{acl}{stat}var {subject}: {subject_type}!"),
    };

    let lines = [
        indent(1, &format!("{acl}{stat}var {counter} = 0")),
        indent(
            1,
            &format!(
                "{storage} {{ didSet {{ {} }} }}",
                count_statement(&counter, slot)
            ),
        ),
        indent(
            1,
            &format!(
                "{acl}{stat}{}var {name}: {type_name} {{",
                slot.override_prefix()
            ),
        ),
        indent(2, &format!("get {{ return {subject} }}")),
        indent(
            2,
            &format!("set {{ if let subject = newValue as? {subject_type} {{ {subject} = subject }} }}"),
        ),
        indent(1, "}"),
    ];
    lines.join("\n")
}

/// Instance setters only count once the mock finished initializing
fn count_statement(counter: &str, slot: &Slot<'_>) -> String {
    if slot.is_static {
        format!("{counter} += 1")
    } else {
        format!("if _doneInit {{ {counter} += 1 }}")
    }
}
