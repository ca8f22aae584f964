// src/normalize.rs
//! Markup → canonical plain text.
//!
//! The engine only depends on [`Normalizer`]; [`HtmlTextExtractor`] is the
//! default used by the binary.

use once_cell::sync::OnceCell;
use regex::Regex;

pub trait Normalizer: Send + Sync {
    /// Plain text with block-level text separated by newlines.
    fn extract_text(&self, raw: &str) -> String;
}

/// Regex-based HTML text extraction. Not a full parser: it is tuned for
/// producing stable text across fetches, not for faithful rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextExtractor;

impl Normalizer for HtmlTextExtractor {
    fn extract_text(&self, raw: &str) -> String {
        html_to_text(raw)
    }
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

pub fn html_to_text(raw: &str) -> String {
    static RE_COMMENT: OnceCell<Regex> = OnceCell::new();
    static RE_SCRIPT: OnceCell<Regex> = OnceCell::new();
    static RE_STYLE: OnceCell<Regex> = OnceCell::new();
    static RE_NOSCRIPT: OnceCell<Regex> = OnceCell::new();
    static RE_TEMPLATE: OnceCell<Regex> = OnceCell::new();
    static RE_DOCTYPE: OnceCell<Regex> = OnceCell::new();
    static RE_BLOCK: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    // 1) Drop non-content markup
    let mut out = re(&RE_COMMENT, r"(?s)<!--.*?-->").replace_all(raw, "\n").into_owned();
    for (cell, pat) in [
        (&RE_SCRIPT, r"(?is)<script\b[^>]*>.*?</script\s*>"),
        (&RE_STYLE, r"(?is)<style\b[^>]*>.*?</style\s*>"),
        (&RE_NOSCRIPT, r"(?is)<noscript\b[^>]*>.*?</noscript\s*>"),
        (&RE_TEMPLATE, r"(?is)<template\b[^>]*>.*?</template\s*>"),
        (&RE_DOCTYPE, r"(?is)<!doctype[^>]*>"),
    ] {
        out = re(cell, pat).replace_all(&out, "\n").into_owned();
    }

    // 2) Block-level boundaries become line breaks, inline tags vanish
    out = re(
        &RE_BLOCK,
        r"(?i)</?(?:address|article|aside|blockquote|br|dd|div|dl|dt|fieldset|figcaption|figure|footer|form|h[1-6]|header|hr|li|main|nav|ol|option|p|pre|section|table|tbody|td|tfoot|th|thead|title|tr|ul)\b[^>]*>",
    )
    .replace_all(&out, "\n")
    .into_owned();
    out = re(&RE_TAGS, r"(?s)<[^>]+>").replace_all(&out, "").into_owned();

    // 3) Entities after tag stripping so `&lt;b&gt;` survives as text
    let decoded = html_escape::decode_html_entities(&out);

    // 4) Trim each line, collapse inner whitespace, drop blank lines
    let ws = re(&RE_WS, r"[^\S\n]+");
    decoded
        .lines()
        .map(|line| ws.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
