//! Text normalization and term extraction.

use std::sync::LazyLock;

use regex::Regex;

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));
static SCRIPT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});
static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|tr|h[1-6]|section|article|table)\b[^>]*>")
        .expect("valid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

/// Normalize line endings, drop a leading BOM, collapse blank-line runs and trim.
pub fn normalize_text(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Reduce HTML/XML to its readable text.
pub fn strip_markup(markup: &str) -> String {
    let text = SCRIPT_BLOCKS.replace_all(markup, "");
    let text = BLOCK_TAGS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = decode_entities(&text);
    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    lines.join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Lower-cased alphanumeric terms of a text.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("\u{feff}a\r\nb\r\n"), "a\nb");
        assert_eq!(normalize_text("a\n\n\n\n b"), "a\n\n b");
        assert_eq!(normalize_text("   \n\t "), "");
    }

    #[test]
    fn test_strip_markup() {
        let html = "<html><head><style>p { color: red; }</style></head>\
                    <body><h1>Sky</h1><p>The sky is &amp; stays <b>blue</b>.</p>\
                    <script>alert(1)</script></body></html>";
        let text = normalize_text(&strip_markup(html));
        assert_eq!(text, "Sky\n\nThe sky is & stays blue.");
    }

    #[test]
    fn test_terms() {
        let t: Vec<String> = terms("What color is the SKY?").collect();
        assert_eq!(t, vec!["what", "color", "is", "the", "sky"]);
    }
}
