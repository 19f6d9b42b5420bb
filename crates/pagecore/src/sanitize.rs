use ammonia::Builder;

use crate::marker::PAGE_BREAK_CLASS;

/// Clean untrusted HTML before it becomes page content. Script and event
/// handler attributes are removed; the page-break marker class survives.
pub fn sanitize_html(html: &str) -> String {
    create_page_sanitizer().clean(html).to_string()
}

fn create_page_sanitizer() -> Builder<'static> {
    let mut builder = Builder::new();
    builder.add_allowed_classes("div", &[PAGE_BREAK_CLASS]);
    builder
}
