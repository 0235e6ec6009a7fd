/// Grouping of parsed entries into the structures the page is rendered from.
///
/// Two layouts exist: `Tabs` (videos by topic, plus flat PDF and other lists)
/// and `Subjects` (lectures under inferred subjects). Both keep groups and
/// items in the order they first appear in the upload.
use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::classify::{classify_url, is_hls, is_web_url, UrlRewriter};
use crate::errors::LinkdeckError;
use crate::label::{parse_label, split_topic};
use crate::models::{ConversionStats, Entry, Link, MediaKind};

/// Page layout selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Tabs,
    Subjects,
}

impl FromStr for Layout {
    type Err = LinkdeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabs" => Ok(Layout::Tabs),
            "subjects" => Ok(Layout::Subjects),
            other => Err(LinkdeckError::Config(format!(
                "unknown page layout '{}' (expected 'tabs' or 'subjects')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Tabs => write!(f, "tabs"),
            Layout::Subjects => write!(f, "subjects"),
        }
    }
}

/// Videos sharing a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicGroup {
    pub topic: String,
    pub items: Vec<Link>,
}

/// Videos grouped by topic, PDFs and other links in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabbedCatalog {
    pub videos: Vec<TopicGroup>,
    pub pdfs: Vec<Link>,
    pub others: Vec<Link>,
}

impl TabbedCatalog {
    pub fn build(entries: &[Entry], rewriter: &UrlRewriter) -> Self {
        let mut catalog = TabbedCatalog::default();
        let mut topic_index: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            match classify_url(&entry.url) {
                MediaKind::Video => {
                    let (topic, title) = split_topic(&entry.name);
                    let url = rewriter.rewrite(&entry.url);
                    let link = Link { name: title, hls: is_hls(&url), url, web: true };

                    let idx = *topic_index.entry(topic.clone()).or_insert_with(|| {
                        catalog.videos.push(TopicGroup { topic, items: Vec::new() });
                        catalog.videos.len() - 1
                    });
                    catalog.videos[idx].items.push(link);
                }
                MediaKind::Pdf => catalog.pdfs.push(plain_link(entry)),
                MediaKind::Other => catalog.others.push(plain_link(entry)),
            }
        }

        catalog
    }

    pub fn video_count(&self) -> usize {
        self.videos.iter().map(|g| g.items.len()).sum()
    }

    pub fn pdf_count(&self) -> usize {
        self.pdfs.len()
    }

    pub fn other_count(&self) -> usize {
        self.others.len()
    }
}

/// All links that share one exact entry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lecture {
    pub title: String,
    pub videos: Vec<Link>,
    pub pdfs: Vec<Link>,
    pub others: Vec<Link>,
}

/// Lectures under one inferred subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectGroup {
    pub name: String,
    /// HTML-id-safe identifier, unique within the catalog.
    pub slug: String,
    pub lectures: Vec<Lecture>,
}

/// Lectures grouped under subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubjectCatalog {
    pub subjects: Vec<SubjectGroup>,
}

impl SubjectCatalog {
    pub fn build(entries: &[Entry], rewriter: &UrlRewriter) -> Self {
        let mut subjects: Vec<SubjectGroup> = Vec::new();
        let mut subject_index: HashMap<String, usize> = HashMap::new();
        // name -> (subject idx, lecture idx)
        let mut lecture_index: HashMap<&str, (usize, usize)> = HashMap::new();

        for entry in entries {
            let (s_idx, l_idx) = match lecture_index.get(entry.name.as_str()) {
                Some(&pos) => pos,
                None => {
                    let (subject, title) = parse_label(&entry.name);
                    let s_idx = *subject_index.entry(subject.clone()).or_insert_with(|| {
                        let slug = slugify(&subject, subjects.len());
                        subjects.push(SubjectGroup {
                            name: subject,
                            slug,
                            lectures: Vec::new(),
                        });
                        subjects.len() - 1
                    });
                    let lectures = &mut subjects[s_idx].lectures;
                    lectures.push(Lecture {
                        title,
                        videos: Vec::new(),
                        pdfs: Vec::new(),
                        others: Vec::new(),
                    });
                    let pos = (s_idx, lectures.len() - 1);
                    lecture_index.insert(entry.name.as_str(), pos);
                    pos
                }
            };

            let lecture = &mut subjects[s_idx].lectures[l_idx];
            match classify_url(&entry.url) {
                MediaKind::Video => {
                    let url = rewriter.rewrite(&entry.url);
                    lecture.videos.push(Link {
                        name: lecture.title.clone(),
                        hls: is_hls(&url),
                        url,
                        web: true,
                    });
                }
                MediaKind::Pdf => lecture.pdfs.push(plain_link(entry)),
                MediaKind::Other => lecture.others.push(plain_link(entry)),
            }
        }

        SubjectCatalog { subjects }
    }

    pub fn lecture_count(&self) -> usize {
        self.subjects.iter().map(|s| s.lectures.len()).sum()
    }

    fn count(&self, f: impl Fn(&Lecture) -> usize) -> usize {
        self.subjects
            .iter()
            .flat_map(|s| s.lectures.iter())
            .map(f)
            .sum()
    }
}

/// A catalog in either layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Catalog {
    Tabs(TabbedCatalog),
    Subjects(SubjectCatalog),
}

impl Catalog {
    pub fn build(entries: &[Entry], layout: Layout, rewriter: &UrlRewriter) -> Self {
        match layout {
            Layout::Tabs => Catalog::Tabs(TabbedCatalog::build(entries, rewriter)),
            Layout::Subjects => Catalog::Subjects(SubjectCatalog::build(entries, rewriter)),
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            Catalog::Tabs(_) => Layout::Tabs,
            Catalog::Subjects(_) => Layout::Subjects,
        }
    }

    pub fn stats(&self, entries: usize) -> ConversionStats {
        match self {
            Catalog::Tabs(c) => ConversionStats {
                entries,
                videos: c.video_count(),
                pdfs: c.pdf_count(),
                others: c.other_count(),
                groups: c.videos.len(),
            },
            Catalog::Subjects(c) => ConversionStats {
                entries,
                videos: c.count(|l| l.videos.len()),
                pdfs: c.count(|l| l.pdfs.len()),
                others: c.count(|l| l.others.len()),
                groups: c.subjects.len(),
            },
        }
    }
}

fn plain_link(entry: &Entry) -> Link {
    Link {
        name: entry.name.clone(),
        url: entry.url.clone(),
        hls: false,
        web: is_web_url(&entry.url),
    }
}

fn slugify(name: &str, index: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    format!("s{}-{}", index, cleaned)
}
