//! Markup sanitization.
//!
//! Parsing and cleaning is delegated to `ammonia` (an html5ever-based
//! allow-list sanitizer). Two fixed policies are used:
//!
//! - text only: every tag is dropped, text content is kept, and the contents
//!   of `script`/`style`-like elements are discarded entirely;
//! - inline formatting: `b`, `i`, `em`, `strong`, `p`, `br` survive, with no
//!   attributes on any tag.
//!
//! Output is serialized HTML, so text such as `&` comes back as `&amp;`.
//! Feeding the output back in yields the same string.

use ammonia::Builder;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Tags kept by [`sanitize_html`].
pub const ALLOWED_INLINE_TAGS: [&str; 6] = ["b", "i", "em", "strong", "p", "br"];

/// Elements whose content is removed along with the tag. Any other dropped
/// element (`textarea`, `object`, `div`, ...) leaves its text behind.
const DISCARDED_CONTENT_TAGS: [&str; 25] = [
    "annotation-xml",
    "audio",
    "colgroup",
    "desc",
    "foreignobject",
    "head",
    "iframe",
    "math",
    "mi",
    "mn",
    "mo",
    "ms",
    "mtext",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
    "script",
    "style",
    "svg",
    "template",
    "thead",
    "title",
    "video",
    "xmp",
];

fn builder_with_tags(tags: &[&'static str]) -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .tags(tags.iter().copied().collect())
        .clean_content_tags(DISCARDED_CONTENT_TAGS.iter().copied().collect())
        .tag_attributes(HashMap::new())
        .generic_attributes(HashSet::new())
        .url_schemes(HashSet::new())
        .link_rel(None)
        .strip_comments(true);
    builder
}

static TEXT_ONLY: Lazy<Builder<'static>> = Lazy::new(|| builder_with_tags(&[]));

static INLINE_FORMATTING: Lazy<Builder<'static>> =
    Lazy::new(|| builder_with_tags(&ALLOWED_INLINE_TAGS));

/// Strip all markup, keep the text content, and trim surrounding whitespace.
///
/// # Example
/// ```
/// use form_guard::sanitize_input;
///
/// assert_eq!(sanitize_input("  <b>Hello</b> world "), "Hello world");
/// assert_eq!(sanitize_input("<script>alert(1)</script>Hi"), "Hi");
/// ```
pub fn sanitize_input(text: &str) -> String {
    TEXT_ONLY.clean(text).to_string().trim().to_string()
}

/// Strip all markup except the inline formatting allow-list, removing every
/// attribute from the tags that are kept.
///
/// Unlike [`sanitize_input`] the result is not trimmed.
pub fn sanitize_html(text: &str) -> String {
    INLINE_FORMATTING.clean(text).to_string()
}

/// Escape `& < > " '` and leave everything else untouched.
///
/// # Example
/// ```
/// use form_guard::escape_html;
///
/// assert_eq!(escape_html("<b>&'\""), "&lt;b&gt;&amp;&#039;&quot;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
