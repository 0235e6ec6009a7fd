/// HTML page rendering.
///
/// Templates are compiled into the binary and rendered with minijinja. The
/// `.html` template names turn on HTML auto-escaping, so names and URLs taken
/// from uploads are always escaped.
use minijinja::{context, Environment};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::errors::LinkdeckResult;
use crate::models::ConversionStats;

const BASE_TEMPLATE: &str = include_str!("../templates/base.html");
const TABS_TEMPLATE: &str = include_str!("../templates/tabs.html");
const SUBJECTS_TEMPLATE: &str = include_str!("../templates/subjects.html");

/// Page-level values shown in the header and footer.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub credit: Option<String>,
    pub credit_url: Option<String>,
    pub generated_at: String,
}

impl PageMeta {
    /// Meta stamped with the current UTC time.
    pub fn now(title: impl Into<String>, credit: Option<String>, credit_url: Option<String>) -> Self {
        Self {
            title: title.into(),
            credit,
            credit_url,
            generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

/// Renders catalogs into complete HTML documents.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> LinkdeckResult<Self> {
        let mut env = Environment::new();
        env.add_template("base.html", BASE_TEMPLATE)?;
        env.add_template("tabs.html", TABS_TEMPLATE)?;
        env.add_template("subjects.html", SUBJECTS_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(
        &self,
        meta: &PageMeta,
        catalog: &Catalog,
        stats: &ConversionStats,
    ) -> LinkdeckResult<String> {
        let html = match catalog {
            Catalog::Tabs(c) => self.env.get_template("tabs.html")?.render(context! {
                page => meta,
                catalog => c,
                stats => stats,
            })?,
            Catalog::Subjects(c) => self.env.get_template("subjects.html")?.render(context! {
                page => meta,
                catalog => c,
                stats => stats,
            })?,
        };
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Layout;
    use crate::classify::UrlRewriter;
    use crate::models::Entry;

    fn meta() -> PageMeta {
        PageMeta {
            title: "Batch 2025".into(),
            credit: Some("Kundan".into()),
            credit_url: Some("https://t.me/kundan".into()),
            generated_at: "2025-01-01 00:00 UTC".into(),
        }
    }

    fn render(entries: &[Entry], layout: Layout) -> String {
        let catalog = Catalog::build(entries, layout, &UrlRewriter::default());
        let stats = catalog.stats(entries.len());
        PageRenderer::new().unwrap().render(&meta(), &catalog, &stats).unwrap()
    }

    #[test]
    fn test_tabs_page_contains_links() {
        let html = render(
            &[
                Entry::new("Polity - L1", "https://x.io/p1.m3u8"),
                Entry::new("Notes", "https://x.io/n.pdf"),
            ],
            Layout::Tabs,
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Batch 2025</title>"));
        assert!(html.contains("Polity (1)"));
        // auto-escaping encodes `/` in attribute values
        assert!(html.contains(r#"data-url="https:&#x2f;&#x2f;x.io&#x2f;p1.m3u8""#));
        assert!(html.contains(r#"data-hls="true""#));
        assert!(html.contains("n.pdf"));
        assert!(html.contains("No other links found."));
        assert!(html.contains("Videos (1)"));
    }

    #[test]
    fn test_empty_tabs_placeholders() {
        let html = render(&[], Layout::Tabs);
        assert!(html.contains("No video links found."));
        assert!(html.contains("No PDF links found."));
    }

    #[test]
    fn test_subjects_page() {
        let html = render(
            &[
                Entry::new("(Physics) L1", "https://x.io/l1.mp4"),
                Entry::new("(Physics) L1", "https://x.io/l1.pdf"),
            ],
            Layout::Subjects,
        );
        assert!(html.contains("Physics (1)"));
        assert!(html.contains("Play Video"));
        assert!(html.contains("View PDF"));
        assert!(html.contains(r#"id="collapse-s0-physics""#));
    }

    #[test]
    fn test_empty_subjects_placeholder() {
        let html = render(&[], Layout::Subjects);
        assert!(html.contains("No content found to display."));
    }

    #[test]
    fn test_names_are_escaped() {
        let html = render(
            &[Entry::new("<script>alert(1)</script>", "https://x.io/a.pdf")],
            Layout::Tabs,
        );
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_credit_in_header() {
        let html = render(&[], Layout::Tabs);
        assert!(html.contains("Extracted By:"));
        assert!(html.contains("https:&#x2f;&#x2f;t.me&#x2f;kundan"));
        assert!(!html.contains("https://t.me/kundan"));
    }

    #[test]
    fn test_script_urls_are_not_linked() {
        let entries = [Entry::new("Click me", "javascript:alert(document.cookie)")];
        for layout in [Layout::Tabs, Layout::Subjects] {
            let html = render(&entries, layout);
            assert!(!html.contains(r#"href="javascript"#));
            assert!(html.contains("javascript:alert(document.cookie)"));
        }
    }
}
