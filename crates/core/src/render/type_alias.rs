use super::{RenderContext, Slot, indent};

/// `typealias` satisfying a protocol's associated type or re-declaring a
/// plain alias.
///
/// The value is picked in this order: the mock of a mockable bound, the
/// annotation override, the declared value, `Any`.
pub(crate) fn render_type_alias(
    name: &str,
    value: Option<&str>,
    bound: Option<&str>,
    is_associated: bool,
    override_value: Option<&str>,
    slot: &Slot<'_>,
    ctx: &RenderContext<'_>,
) -> String {
    let mockable_bound = bound
        .map(str::trim)
        .filter(|b| is_associated && ctx.type_keys.contains(b))
        .map(|b| format!("{b}Mock"));
    let resolved = mockable_bound
        .or_else(|| override_value.map(str::to_string))
        .or_else(|| value.map(str::to_string))
        .unwrap_or_else(|| "Any".to_string());
    indent(1, &format!("{}typealias {name} = {resolved}", slot.acl))
}
