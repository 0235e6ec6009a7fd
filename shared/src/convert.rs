/// End-to-end text → HTML conversion.
use tracing::{debug, info};

use crate::catalog::{Catalog, Layout};
use crate::classify::UrlRewriter;
use crate::errors::{LinkdeckError, LinkdeckResult};
use crate::models::ConversionStats;
use crate::parser::extract_entries_with_stats;
use crate::render::{PageMeta, PageRenderer};

/// Knobs that shape the generated page.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub layout: Layout,
    pub pw_token: Option<String>,
    pub credit: Option<String>,
    pub credit_url: Option<String>,
}

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub html: String,
    pub stats: ConversionStats,
    pub catalog: Catalog,
}

/// Parses uploaded lists and renders them with a shared template environment.
pub struct Converter {
    renderer: PageRenderer,
    rewriter: UrlRewriter,
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> LinkdeckResult<Self> {
        Ok(Self {
            renderer: PageRenderer::new()?,
            rewriter: UrlRewriter::new(options.pw_token.clone()),
            options,
        })
    }

    pub fn layout(&self) -> Layout {
        self.options.layout
    }

    /// Build the catalog only, without rendering.
    pub fn catalog(&self, content: &str, title: &str) -> LinkdeckResult<(Catalog, ConversionStats)> {
        let (entries, parse_stats) = extract_entries_with_stats(content);
        debug!(
            "Parsed '{}': {} lines, {} entries, {} skipped",
            title, parse_stats.total_lines, parse_stats.entries, parse_stats.skipped
        );
        if entries.is_empty() {
            return Err(LinkdeckError::NoEntries(title.to_string()));
        }

        let catalog = Catalog::build(&entries, self.options.layout, &self.rewriter);
        let stats = catalog.stats(entries.len());
        Ok((catalog, stats))
    }

    /// Convert file content into a complete HTML page titled `title`.
    pub fn convert(&self, content: &str, title: &str) -> LinkdeckResult<Conversion> {
        let (catalog, stats) = self.catalog(content, title)?;
        let meta = PageMeta::now(
            title,
            self.options.credit.clone(),
            self.options.credit_url.clone(),
        );
        let html = self.renderer.render(&meta, &catalog, &stats)?;

        info!(
            "Converted '{}' ({} layout): {} videos, {} pdfs, {} others in {} groups",
            title, catalog.layout(), stats.videos, stats.pdfs, stats.others, stats.groups
        );
        Ok(Conversion { html, stats, catalog })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Batch Orientation
(Polity by Rahul Sir) L1 || Preamble: https://x.io/polity1.m3u8
(Polity by Rahul Sir) L1 || Preamble: https://x.io/polity1.pdf
(History) L1 Harappa: https://v.akamaized.net/h1/master.m3u8
Join us: https://t.me/somechannel
";

    #[test]
    fn test_convert_tabs() {
        let converter = Converter::new(ConvertOptions::default()).unwrap();
        let conversion = converter.convert(SAMPLE, "UPSC Batch").unwrap();

        assert_eq!(conversion.stats.entries, 4);
        assert_eq!(conversion.stats.videos, 2);
        assert_eq!(conversion.stats.pdfs, 1);
        assert_eq!(conversion.stats.others, 1);
        assert!(conversion.html.contains("<title>UPSC Batch</title>"));
        assert!(matches!(conversion.catalog, Catalog::Tabs(_)));
    }

    #[test]
    fn test_convert_subjects() {
        let options = ConvertOptions {
            layout: Layout::Subjects,
            ..Default::default()
        };
        let converter = Converter::new(options).unwrap();
        let conversion = converter.convert(SAMPLE, "UPSC Batch").unwrap();

        // Polity, History, Miscellaneous
        assert_eq!(conversion.stats.groups, 3);
        match &conversion.catalog {
            Catalog::Subjects(c) => {
                assert_eq!(c.subjects[0].name, "Polity by Rahul Sir");
                assert_eq!(c.subjects[0].lectures[0].title, "L1 || Preamble");
                assert_eq!(c.subjects[0].lectures[0].pdfs.len(), 1);
            }
            other => panic!("Expected subjects catalog, got {:?}", other.layout()),
        }
    }

    #[test]
    fn test_convert_rejects_empty_list() {
        let converter = Converter::new(ConvertOptions::default()).unwrap();
        let err = converter.convert("just some notes\nno links here", "notes").unwrap_err();
        assert!(matches!(err, LinkdeckError::NoEntries(ref name) if name == "notes"));
    }

    #[test]
    fn test_credit_rendered() {
        let options = ConvertOptions {
            credit: Some("Linkdeck".into()),
            ..Default::default()
        };
        let converter = Converter::new(options).unwrap();
        let html = converter.convert(SAMPLE, "x").unwrap().html;
        assert!(html.contains("Extracted By: Linkdeck"));
    }
}
