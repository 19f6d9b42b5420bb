//! The `pageBreak` block node: a zero-content manual break marker.
//!
//! It serializes as `<div class="page-break"></div>` and is recognized on
//! input only when the element's `class` attribute is exactly `page-break`.

use crate::schema::{attr, Attrs, NodeGroup, NodeSpec};
use crate::tree::{render_attrs, tags};

pub const PAGE_BREAK: &str = "pageBreak";
pub const PAGE_BREAK_CLASS: &str = "page-break";
pub const PAGE_BREAK_HTML: &str = r#"<div class="page-break"></div>"#;

pub fn node_spec() -> NodeSpec {
    NodeSpec {
        name: PAGE_BREAK,
        group: NodeGroup::Block,
        matches: is_page_break,
        render: render_page_break,
    }
}

pub fn is_page_break(tag: &str, attrs: &[(String, String)]) -> bool {
    tag.eq_ignore_ascii_case("div") && attr(attrs, "class") == Some(PAGE_BREAK_CLASS)
}

/// Render the marker element. Passthrough attributes are kept in order, but
/// `class` always comes first and is always `page-break`.
pub fn render_page_break(attrs: &[(String, String)]) -> String {
    let mut merged: Attrs = vec![("class".to_string(), PAGE_BREAK_CLASS.to_string())];
    merged.extend(
        attrs
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("class"))
            .cloned(),
    );
    format!("<div{}></div>", render_attrs(&merged))
}

/// Number of marker elements anywhere in serialized content.
pub fn count_page_breaks(html: &str) -> usize {
    tags(html)
        .filter(|t| !t.closing && is_page_break(&t.name, &t.attrs))
        .count()
}
