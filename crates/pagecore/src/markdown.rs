use comrak::{markdown_to_html, ComrakOptions};
use lazy_static::lazy_static;
use regex::Regex;

use crate::marker::PAGE_BREAK_HTML;

lazy_static! {
    static ref PAGE_BREAK_PARAGRAPH: Regex = Regex::new(r"<p>\\pagebreak</p>\n?")
        .expect("Invalid PAGE_BREAK_PARAGRAPH regex pattern");
}

/// Render markdown to page content. A paragraph holding only `\pagebreak`
/// becomes a page-break marker.
pub fn to_html(src: &str) -> String {
    let opt = create_comrak_options();
    let html = markdown_to_html(src, &opt);
    patch_page_breaks(&html)
}

fn create_comrak_options() -> ComrakOptions<'static> {
    let mut opt = ComrakOptions::default();

    opt.extension.strikethrough = true;
    opt.extension.table = true;
    opt.extension.autolink = true;
    opt.extension.tasklist = true;

    // Raw HTML in imported markdown is escaped, never passed through
    opt.render.unsafe_ = false;
    opt.render.escape = true;

    opt
}

pub fn patch_page_breaks(html: &str) -> String {
    PAGE_BREAK_PARAGRAPH
        .replace_all(html, PAGE_BREAK_HTML)
        .into_owned()
}
