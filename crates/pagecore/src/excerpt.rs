use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

lazy_static! {
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]*>").expect("Invalid ANY_TAG regex pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("Invalid WHITESPACE regex pattern");
}

pub const THUMBNAIL_LIMIT: usize = 150;

/// Plain-text preview of page content for thumbnails: tags become spaces,
/// whitespace collapses, the first `limit` characters are kept and `...`
/// is always appended.
pub fn thumbnail_text(html: &str, limit: usize) -> String {
    let stripped = ANY_TAG.replace_all(html, " ");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    let mut preview: String = collapsed.graphemes(true).take(limit).collect();
    preview.push_str("...");
    preview
}
