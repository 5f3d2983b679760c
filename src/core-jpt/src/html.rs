//! Shrinks raw HTML before it's handed to the model.

use std::sync::LazyLock;

use regex::Regex;

/// Default character budget for a listing page. The model's context window is finite.
pub const DEFAULT_MAX_LISTING_CHARS: usize = 800_000;

/// Default character budget for a job detail page.
pub const DEFAULT_MAX_DETAIL_CHARS: usize = 100_000;

static SCRIPT_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script regex"));
static STYLE_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style regex"));
static COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strips script/style blocks and comments, collapses whitespace, then truncates to `max_chars`.
pub fn clean_html(html: &str, max_chars: usize) -> String {
    let html = SCRIPT_BLOCKS.replace_all(html, "");
    let html = STYLE_BLOCKS.replace_all(&html, "");
    let html = COMMENTS.replace_all(&html, "");
    let html = WHITESPACE.replace_all(&html, " ");
    truncate_chars(html.trim(), max_chars).to_string()
}

/// The first `max_chars` characters of `text` (never splits a character).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_scripts_styles_and_comments() {
        let html = r#"<html><head><SCRIPT type="text/javascript">
            var jobs = ["<div>fake</div>"];
        </SCRIPT><style>
            li { color: red; }
        </style></head><body><!-- promo
        banner --><li>Backend Engineer</li></body></html>"#;

        let cleaned = clean_html(html, DEFAULT_MAX_LISTING_CHARS);
        assert_eq!(cleaned, "<html><head></head><body><li>Backend Engineer</li></body></html>");
    }

    #[test]
    fn test_clean_html_collapses_whitespace() {
        let cleaned = clean_html("<ul>\n\n   <li>A</li>\t\t<li>B</li>\n</ul>", 1000);
        assert_eq!(cleaned, "<ul> <li>A</li> <li>B</li> </ul>");
    }

    #[test]
    fn test_clean_html_truncates_silently() {
        let cleaned = clean_html("<p>abcdefghij</p>", 6);
        assert_eq!(cleaned, "<p>abc");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("日本語", 2), "日本");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
