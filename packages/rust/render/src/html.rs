//! HTML output: Markdown conversion, page wrapper, fallback page, site index.

use pulldown_cmark::{Options, Parser, html::push_html};

use press_shared::Subject;

use crate::slug::slugify;

/// Escape text for safe inclusion in HTML element content or attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Convert CommonMark to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    push_html(&mut body, parser);
    body
}

/// Wrap an HTML fragment in a complete document.
pub fn wrap_document(title: &str, body: &str) -> String {
    format!(
        "<html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
         <title>{}</title></head><body>{body}</body></html>",
        html_escape(title)
    )
}

/// Page that shows raw Markdown verbatim. Used when HTML rendering fails.
pub fn fallback_html(markdown: &str) -> String {
    format!("<html><body><pre>{}</pre></body></html>", html_escape(markdown))
}

/// Site index linking every subject's page.
pub fn render_index(subjects: &[Subject]) -> String {
    let mut body = String::from("<h1>Subjects</h1>\n<ul>\n");
    for subject in subjects {
        body.push_str(&format!(
            "  <li><a href=\"{}.html\">{}</a></li>\n",
            html_escape(&slugify(&subject.name)),
            html_escape(&subject.name)
        ));
    }
    body.push_str("</ul>\n");
    wrap_document("Subjects", &body)
}
