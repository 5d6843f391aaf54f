//! Article rendering for press.
//!
//! Turns a subject's name, summary, and activities into Markdown, converts
//! Markdown into a complete HTML page, and builds the site index. Also owns the
//! fallback documents used when rendering fails and the filesystem slug for a
//! subject's page.

mod html;
mod slug;

use tracing::instrument;

use press_shared::{ActivityRecord, Result};

pub use html::{fallback_html, html_escape, markdown_to_html, render_index, wrap_document};
pub use slug::slugify;

/// Identifier of the built-in article template, recorded with each generation.
pub const TEMPLATE_ID: &str = "article-template-v1";

/// Renders articles. Implementations may fail; callers supply fallbacks.
pub trait ArticleRenderer: Send + Sync {
    fn markdown(&self, name: &str, summary: &str, activities: &[ActivityRecord]) -> Result<String>;

    fn html(&self, markdown: &str) -> Result<String>;
}

/// The built-in Markdown template and CommonMark HTML conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl ArticleRenderer for TemplateRenderer {
    #[instrument(skip_all, fields(subject = %name, activities = activities.len()))]
    fn markdown(&self, name: &str, summary: &str, activities: &[ActivityRecord]) -> Result<String> {
        let mut lines = vec![format!("# {name}")];
        if !summary.trim().is_empty() {
            lines.push(String::new());
            lines.push(summary.to_string());
        }
        if !activities.is_empty() {
            lines.push(String::new());
            lines.push("## Recent activities".to_string());
        }

        for activity in activities {
            let title = if activity.title.trim().is_empty() {
                "(no title)"
            } else {
                activity.title.as_str()
            };
            let mut item = format!("- **{title}**");
            if let Some(published) = activity.published.as_deref().filter(|p| !p.is_empty()) {
                item.push_str(&format!(" — {published}"));
            }
            // Hard line break keeps the content inside the list item
            item.push_str(&format!("  \n  {}", activity.content));
            lines.push(item);
        }

        let mut md = lines.join("\n");
        md.push('\n');
        Ok(md)
    }

    fn html(&self, markdown: &str) -> Result<String> {
        Ok(wrap_document(&page_title(markdown), &markdown_to_html(markdown)))
    }
}

/// Minimal Markdown used when the template fails: name and summary only.
pub fn fallback_markdown(name: &str, summary: &str) -> String {
    format!("# {name}\n\n{summary}")
}

/// Page title from the first level-one heading, or "Article".
fn page_title(markdown: &str) -> String {
    markdown
        .lines()
        .find_map(|l| l.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Article".to_string())
}
