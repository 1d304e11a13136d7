//! Directory entry name grammar, one parser per tree kind.
//!
//! DokuWiki stores the same logical item under different names depending on
//! the tree it lives in:
//!
//! | Tree          | Entry                         | Key              |
//! |---------------|-------------------------------|------------------|
//! | `pages`       | `start.txt`                   | `start`          |
//! | `media`       | `logo.1.png`                  | `logo.1.png`     |
//! | `attic`       | `start.1367320658.txt.gz`     | `start`          |
//! | `media_attic` | `logo.1336687823.png`         | `logo.png`       |
//! | `meta`        | `start.changes`               | `start`          |
//!
//! Media history is the awkward one: the timestamp is spliced in before the
//! media extension, so the extension has to be re-appended to rebuild the
//! key. The first `.digits.` run is taken as the timestamp; when the last
//! run would give a different split the result is flagged as ambiguous.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::node::Timestamp;

static MEDIA_ATTIC_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\.([0-9]+)(\..*)$").expect("valid media attic pattern"));
static MEDIA_ATTIC_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\.([0-9]+)(\..*)$").expect("valid media attic pattern"));
static META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)(\.[^.]*)$").expect("valid meta pattern"));

/// Reasons an entry name cannot be decomposed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// The entry does not end with the expected suffix.
    #[error("'{entry}' does not end with '{suffix}'")]
    MissingSuffix { entry: String, suffix: String },

    /// The entry does not match the tree's pattern.
    #[error("'{entry}' does not match the {tree} pattern")]
    NoMatch { entry: String, tree: &'static str },

    /// The timestamp group does not fit a revision timestamp.
    #[error("'{digits}' in '{entry}' is not a valid timestamp")]
    BadTimestamp { entry: String, digits: String },
}

/// A current-content or meta entry split into name and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub name: String,
    pub extension: String,
}

/// A history entry split into name, timestamp and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRevision {
    pub name: String,
    pub timestamp: Timestamp,
    /// Empty for page history; the media extension (with its dot) otherwise.
    pub extension: String,
    /// Another `.digits.` run could also have been the timestamp.
    pub ambiguous: bool,
}

impl ParsedRevision {
    /// Key of the live node this revision belongs to.
    pub fn key(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }
}

/// Filename grammar for one wiki layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    page_suffix: String,
    attic_suffix: String,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new(".txt", ".gz")
    }
}

impl Grammar {
    /// Build a grammar from the page suffix and the attic compression suffix.
    pub fn new(page_suffix: impl Into<String>, archive_suffix: &str) -> Self {
        let page_suffix = page_suffix.into();
        let attic_suffix = format!("{page_suffix}{archive_suffix}");
        Self {
            page_suffix,
            attic_suffix,
        }
    }

    /// Suffix of current page files.
    pub fn page_suffix(&self) -> &str {
        &self.page_suffix
    }

    /// `start.txt` → `start`.
    pub fn parse_page(&self, entry: &str) -> Result<ParsedEntry, GrammarError> {
        match entry.strip_suffix(self.page_suffix.as_str()) {
            Some(name) => Ok(ParsedEntry {
                name: name.to_string(),
                extension: self.page_suffix.clone(),
            }),
            None => Err(GrammarError::MissingSuffix {
                entry: entry.to_string(),
                suffix: self.page_suffix.clone(),
            }),
        }
    }

    /// Media names keep their extension, dots included.
    pub fn parse_media(&self, entry: &str) -> ParsedEntry {
        ParsedEntry {
            name: entry.to_string(),
            extension: String::new(),
        }
    }

    /// `start.1367320658.txt.gz` → (`start`, `1367320658`, ``).
    pub fn parse_attic(&self, entry: &str) -> Result<ParsedRevision, GrammarError> {
        let no_match = || GrammarError::NoMatch {
            entry: entry.to_string(),
            tree: "attic",
        };
        let stem = entry
            .strip_suffix(self.attic_suffix.as_str())
            .ok_or_else(no_match)?;
        let (name, digits) = stem.rsplit_once('.').ok_or_else(no_match)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(no_match());
        }
        Ok(ParsedRevision {
            name: name.to_string(),
            timestamp: parse_timestamp(entry, digits)?,
            extension: String::new(),
            ambiguous: false,
        })
    }

    /// `logo.1336687823.png` → (`logo`, `1336687823`, `.png`).
    pub fn parse_media_attic(&self, entry: &str) -> Result<ParsedRevision, GrammarError> {
        let caps = MEDIA_ATTIC_FIRST
            .captures(entry)
            .ok_or_else(|| GrammarError::NoMatch {
                entry: entry.to_string(),
                tree: "media attic",
            })?;
        let (name, digits, extension) = (&caps[1], &caps[2], &caps[3]);

        let ambiguous = MEDIA_ATTIC_LAST
            .captures(entry)
            .is_some_and(|last| &last[1] != name);

        Ok(ParsedRevision {
            name: name.to_string(),
            timestamp: parse_timestamp(entry, digits)?,
            extension: extension.to_string(),
            ambiguous,
        })
    }

    /// `start.changes` → (`start`, `.changes`).
    pub fn parse_meta(&self, entry: &str) -> Result<ParsedEntry, GrammarError> {
        let caps = META.captures(entry).ok_or_else(|| GrammarError::NoMatch {
            entry: entry.to_string(),
            tree: "meta",
        })?;
        Ok(ParsedEntry {
            name: caps[1].to_string(),
            extension: caps[2].to_string(),
        })
    }
}

static DEFAULT: LazyLock<Grammar> = LazyLock::new(Grammar::default);

/// Parse a page history entry with the stock `.txt.gz` layout.
pub fn parse_attic(entry: &str) -> Result<ParsedRevision, GrammarError> {
    DEFAULT.parse_attic(entry)
}

/// Parse a media history entry.
pub fn parse_media_attic(entry: &str) -> Result<ParsedRevision, GrammarError> {
    DEFAULT.parse_media_attic(entry)
}

/// Parse a current page entry with the stock `.txt` suffix.
pub fn parse_page(entry: &str) -> Result<ParsedEntry, GrammarError> {
    DEFAULT.parse_page(entry)
}

/// Only the canonical spelling is accepted, so `x.01` and `x.1` can never
/// land on the same revision.
fn parse_timestamp(entry: &str, digits: &str) -> Result<Timestamp, GrammarError> {
    let bad = || GrammarError::BadTimestamp {
        entry: entry.to_string(),
        digits: digits.to_string(),
    };
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(bad());
    }
    digits.parse::<u64>().map(Timestamp).map_err(|_| bad())
}
