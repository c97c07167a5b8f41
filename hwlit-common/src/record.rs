//! Paper record model shared by every pipeline stage
//!
//! A record is created by the harvester, gains `ai_for_hw` in the classify
//! stage and `tags` in the tag stage. Optional fields are omitted from the
//! JSON output until they are set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One harvested paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Stable dedup key (canonical arXiv entry URL)
    ///
    /// Collections written by the legacy scripts stored this as `url`.
    #[serde(alias = "url")]
    pub identifier: String,
    pub title: String,
    /// Abstract with newlines flattened to spaces
    #[serde(rename = "abstract")]
    pub summary: String,
    #[serde(with = "crate::time::published_format")]
    pub published: DateTime<Utc>,
    /// Binary "AI for hardware/systems" label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_for_hw: Option<bool>,
    /// 1-3 subtopic tags, or the `["Error"]` sentinel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

impl PaperRecord {
    /// Build an unannotated record, normalizing title and abstract text
    pub fn new(
        identifier: impl Into<String>,
        title: &str,
        summary: &str,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.trim().to_string(),
            summary: normalize_abstract(summary),
            published,
            ai_for_hw: None,
            tags: None,
        }
    }

    /// True when classification marked this paper as in scope
    pub fn is_positive(&self) -> bool {
        self.ai_for_hw == Some(true)
    }

    /// True when the tag stage has not produced a usable tag set yet
    ///
    /// The failure sentinel counts as untagged so a later run retries it.
    pub fn needs_tags(&self) -> bool {
        match &self.tags {
            None => true,
            Some(tags) => tags.is_empty() || tags.iter().any(|t| *t == Tag::Error),
        }
    }
}

/// Trim and flatten newlines to single spaces
pub fn normalize_abstract(raw: &str) -> String {
    raw.trim().replace("\r\n", " ").replace('\n', " ")
}

/// Stable sort, newest first
pub fn sort_newest_first(records: &mut [PaperRecord]) {
    records.sort_by(|a, b| b.published.cmp(&a.published));
}

/// Identifier set for diffing one collection against another
pub fn identifier_set(records: &[PaperRecord]) -> HashSet<&str> {
    records.iter().map(|r| r.identifier.as_str()).collect()
}

/// Subtopic tag
///
/// The first nine variants form the closed vocabulary, listed in the order
/// response parsing scans them. `Error` is only ever written as a failure
/// marker by the tag stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Verification,
    Synthesis,
    #[serde(rename = "P&R")]
    PlaceAndRoute,
    #[serde(rename = "Analog Design")]
    AnalogDesign,
    #[serde(rename = "System-level Optimization")]
    SystemLevelOptimization,
    #[serde(rename = "Code Generation")]
    CodeGeneration,
    Security,
    Testing,
    Other,
    Error,
}

impl Tag {
    /// Closed vocabulary in scan order
    pub const VOCABULARY: [Tag; 9] = [
        Tag::Verification,
        Tag::Synthesis,
        Tag::PlaceAndRoute,
        Tag::AnalogDesign,
        Tag::SystemLevelOptimization,
        Tag::CodeGeneration,
        Tag::Security,
        Tag::Testing,
        Tag::Other,
    ];

    /// Label as it appears on disk and in prompts
    pub fn label(&self) -> &'static str {
        match self {
            Tag::Verification => "Verification",
            Tag::Synthesis => "Synthesis",
            Tag::PlaceAndRoute => "P&R",
            Tag::AnalogDesign => "Analog Design",
            Tag::SystemLevelOptimization => "System-level Optimization",
            Tag::CodeGeneration => "Code Generation",
            Tag::Security => "Security",
            Tag::Testing => "Testing",
            Tag::Other => "Other",
            Tag::Error => "Error",
        }
    }

    pub fn is_vocabulary(&self) -> bool {
        *self != Tag::Error
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
