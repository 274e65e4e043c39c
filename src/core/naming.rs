//! Display names, link suffixes and file names for slices.

use crate::domain::model::{ArtifactGroup, NamedEntry, Region};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Used when a label has no usable characters.
pub const FALLBACK_STEM: &str = "slice";

static LINK_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.*?)\s*\(([^)]*)\)\s*$").expect("link suffix pattern is valid")
});

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub display_name: String,
    pub link_url: Option<String>,
}

/// Splits `"Header (https://example.com)"` into name and link.
///
/// Only a trailing parenthesised `http://` or `https://` URL counts as a link;
/// any other label comes back unchanged.
pub fn parse_label(label: &str) -> ParsedLabel {
    if let Some(caps) = LINK_SUFFIX.captures(label) {
        let url = caps[2].trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            return ParsedLabel {
                display_name: caps[1].trim().to_string(),
                link_url: Some(url.to_string()),
            };
        }
    }

    ParsedLabel {
        display_name: label.to_string(),
        link_url: None,
    }
}

/// Lower-cases and collapses every run outside `[a-z0-9]` into one hyphen.
pub fn sanitize_file_stem(display_name: &str) -> String {
    let lowered = display_name.to_lowercase();
    let slug = NON_SLUG.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        slug.to_string()
    }
}

/// Hands out unique file names within one export batch.
#[derive(Debug, Default)]
pub struct FileNameDeduper {
    issued: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl FileNameDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// The Nth repeat of a stem gets `-N` before the extension. A suffix that
    /// an earlier label already produced literally is skipped.
    pub fn claim(&mut self, stem: &str, extension: &str) -> String {
        let base = format!("{}.{}", stem, extension);
        let mut suffix = self.next_suffix.get(&base).copied().unwrap_or(0);

        let name = loop {
            let candidate = if suffix == 0 {
                base.clone()
            } else {
                format!("{}-{}.{}", stem, suffix, extension)
            };
            suffix += 1;
            if !self.issued.contains(&candidate) {
                break candidate;
            }
        };

        self.next_suffix.insert(base, suffix);
        self.issued.insert(name.clone());
        name
    }
}

/// Names every region, in region order.
///
/// A region takes its label from the group artifact tagged with the same
/// index (the user may have renamed it); otherwise its default name is used.
pub fn resolve_entries(
    regions: &[Region],
    group: Option<&ArtifactGroup>,
    extension: &str,
) -> Vec<NamedEntry> {
    let mut deduper = FileNameDeduper::new();

    regions
        .iter()
        .map(|region| {
            let label = group
                .and_then(|g| g.name_for_index(region.index))
                .unwrap_or(&region.default_name);
            let parsed = parse_label(label);
            let file_name = deduper.claim(&sanitize_file_stem(&parsed.display_name), extension);

            NamedEntry {
                region: region.clone(),
                display_name: parsed.display_name,
                file_name,
                link_url: parsed.link_url,
            }
        })
        .collect()
}
