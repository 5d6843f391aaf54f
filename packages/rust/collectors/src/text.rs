//! Text cleaning for feed summaries and fetched pages.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};

/// Tags whose text never counts as visible page content.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript"];

/// Reduce a small HTML fragment (feed summary) to one line of plain text.
///
/// Tags are dropped without adding separators and entities are decoded, so
/// `Ada&nbsp;<b>Lovelace</b>` becomes `Ada Lovelace`.
pub fn clean_html_to_text(html: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let fragment = Html::parse_fragment(html);
    let text: String = visible_text(&fragment).collect();
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Extract the visible text of a full HTML document.
///
/// Each non-blank line becomes its own paragraph (lines are trimmed and joined
/// with a blank line). The result is capped at `limit` characters.
pub fn page_text(html: &str, limit: usize) -> String {
    let doc = Html::parse_document(html);

    let lines: Vec<&str> = visible_text(&doc)
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let joined = lines.join("\n\n");
    truncate_chars(&joined, limit).to_string()
}

/// Decoded text nodes outside script, style and noscript, in document order.
fn visible_text(html: &Html) -> impl Iterator<Item = &str> {
    html.tree.root().descendants().filter_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        (!hidden).then_some(&**text)
    })
}

/// Longest prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
