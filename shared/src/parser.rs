/// Line extraction for uploaded `Name: URL` lists.
use crate::models::Entry;

/// Line counters gathered while extracting entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub total_lines: usize,
    pub entries: usize,
    pub skipped: usize,
}

/// Extract `(name, url)` entries from the file content, in input order.
///
/// Each line is split at its first `:`. Lines without a colon, or with
/// nothing after it, are skipped.
pub fn extract_entries(content: &str) -> Vec<Entry> {
    extract_entries_with_stats(content).0
}

/// Same as [`extract_entries`], also reporting how many lines were skipped.
pub fn extract_entries_with_stats(content: &str) -> (Vec<Entry>, ParseStats) {
    let content = content.trim_start_matches('\u{feff}').trim();
    let mut stats = ParseStats::default();
    if content.is_empty() {
        return (Vec::new(), stats);
    }

    let mut entries = Vec::new();
    for line in content.split('\n') {
        stats.total_lines += 1;
        match split_line(line) {
            Some(entry) => entries.push(entry),
            None => stats.skipped += 1,
        }
    }
    stats.entries = entries.len();
    (entries, stats)
}

fn split_line(line: &str) -> Option<Entry> {
    let (name, url) = line.split_once(':')?;
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    Some(Entry::new(name.trim(), url))
}
