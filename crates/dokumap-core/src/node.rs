//! Page and media nodes with their revisions and facets.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::changes::{ChangeLineError, ChangeRecord, parse_change_log};
use crate::error::ModelError;
use crate::meta::unserialize;
use crate::namespace::NamespaceId;

/// Size of a file that was never observed on disk.
pub const MISSING: i64 = -1;

/// Revision timestamp, in seconds since the epoch as written by the wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Convert to a UTC date, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

/// Whether a node is a page or a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Page,
    Media,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Page => f.write_str("Page"),
            NodeKind::Media => f.write_str("Media"),
        }
    }
}

/// One archived version of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub timestamp: Timestamp,
    /// Size of the archive file, or [`MISSING`].
    pub size: i64,
    /// Change log entry describing this revision.
    pub change: Option<ChangeRecord>,
}

impl Revision {
    fn new(timestamp: Timestamp, size: i64) -> Self {
        Self {
            timestamp,
            size,
            change: None,
        }
    }

    /// True when no archive file backs this revision.
    pub fn is_missing(&self) -> bool {
        self.size < 0
    }
}

/// Change log facet (`.changes`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangesFacet {
    pub size: u64,
    /// Timestamps in log order.
    pub entries: Vec<Timestamp>,
}

/// Search index marker facet (`.indexed`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexedFacet {
    pub size: u64,
}

/// Decoded serialized metadata, or the raw text when decoding failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaData {
    Parsed(serde_json::Value),
    Raw(String),
}

/// Serialized metadata facet (`.meta`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFacet {
    pub size: u64,
    pub data: MetaData,
}

/// Outcome of attaching a change log to a node.
#[derive(Debug, Default)]
pub struct ChangeLogReport {
    /// Lines attached to a revision.
    pub applied: usize,
    /// Revisions created because no attic file was registered for them.
    pub orphan_revisions: Vec<Timestamp>,
    /// Lines that could not be decoded, with their 1-based line number.
    pub malformed: Vec<(usize, ChangeLineError)>,
}

/// A page or media item within a namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    kind: NodeKind,
    name: CompactString,
    namespace: NamespaceId,
    /// Full `:ns:name` path, kept for diagnostics.
    full_name: String,
    current_size: i64,
    revisions: BTreeMap<Timestamp, Revision>,
    changes: Option<ChangesFacet>,
    indexed: Option<IndexedFacet>,
    meta: Option<MetaFacet>,
}

impl Node {
    pub(crate) fn new(
        kind: NodeKind,
        name: impl Into<CompactString>,
        namespace: NamespaceId,
        namespace_full_name: &str,
        current_size: i64,
    ) -> Self {
        let name = name.into();
        Self {
            full_name: format!("{namespace_full_name}{name}"),
            kind,
            name,
            namespace,
            current_size,
            revisions: BTreeMap::new(),
            changes: None,
            indexed: None,
            meta: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the owning namespace.
    pub fn namespace(&self) -> NamespaceId {
        self.namespace
    }

    /// `:ns:sub:name`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Byte length of the live file, or [`MISSING`].
    pub fn current_size(&self) -> i64 {
        self.current_size
    }

    /// True when the node was never seen as a current file.
    pub fn is_missing(&self) -> bool {
        self.current_size < 0
    }

    /// Revisions in timestamp order.
    pub fn revisions(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.values()
    }

    pub fn revision(&self, timestamp: Timestamp) -> Option<&Revision> {
        self.revisions.get(&timestamp)
    }

    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    /// Most recent revision, if any.
    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revisions.values().next_back()
    }

    pub fn changes(&self) -> Option<&ChangesFacet> {
        self.changes.as_ref()
    }

    pub fn indexed(&self) -> Option<&IndexedFacet> {
        self.indexed.as_ref()
    }

    pub fn meta(&self) -> Option<&MetaFacet> {
        self.meta.as_ref()
    }

    /// Attach an archived revision.
    pub fn add_revision(&mut self, timestamp: Timestamp, size: i64) -> Result<&mut Revision, ModelError> {
        if self.revisions.contains_key(&timestamp) {
            return Err(ModelError::DuplicateRevision {
                node: self.full_name.clone(),
                timestamp,
            });
        }
        tracing::debug!("Revision {} of {}", timestamp, self.full_name);
        Ok(self
            .revisions
            .entry(timestamp)
            .or_insert_with(|| Revision::new(timestamp, size)))
    }

    /// Return the revision at `timestamp`, creating a [`MISSING`] one if absent.
    ///
    /// The flag is true when the revision was created by this call.
    pub fn get_revision(&mut self, timestamp: Timestamp) -> (&mut Revision, bool) {
        let created = !self.revisions.contains_key(&timestamp);
        if created {
            tracing::warn!("Revision {} not found for {}", timestamp, self.full_name);
        }
        let revision = self
            .revisions
            .entry(timestamp)
            .or_insert_with(|| Revision::new(timestamp, MISSING));
        (revision, created)
    }

    /// Attach the change log, decoding each line onto its revision.
    ///
    /// `raw` is the file as stored; its length is the facet size and invalid
    /// UTF-8 is replaced before decoding. Undecodable lines are reported, not
    /// fatal. A second change log for the same node is.
    pub fn set_changes_facet(
        &mut self,
        raw: impl AsRef<[u8]>,
    ) -> Result<ChangeLogReport, ModelError> {
        if self.changes.is_some() {
            return Err(self.duplicate_facet("changes"));
        }
        let bytes = raw.as_ref();
        let text = String::from_utf8_lossy(bytes);

        let mut report = ChangeLogReport::default();
        let mut entries = Vec::new();
        for (line, parsed) in parse_change_log(&text) {
            match parsed {
                Ok(record) => {
                    let timestamp = record.timestamp;
                    let (revision, created) = self.get_revision(timestamp);
                    revision.change = Some(record);
                    if created {
                        report.orphan_revisions.push(timestamp);
                    }
                    entries.push(timestamp);
                    report.applied += 1;
                }
                Err(err) => report.malformed.push((line, err)),
            }
        }

        self.changes = Some(ChangesFacet {
            size: bytes.len() as u64,
            entries,
        });
        Ok(report)
    }

    pub fn set_indexed_facet(&mut self, size: u64) -> Result<(), ModelError> {
        if self.indexed.is_some() {
            return Err(self.duplicate_facet("indexed"));
        }
        self.indexed = Some(IndexedFacet { size });
        Ok(())
    }

    /// Attach serialized metadata.
    ///
    /// The facet size is the stored byte length. On a decoding failure the
    /// raw text is stored and the error is still returned.
    pub fn set_meta_facet(&mut self, raw: impl AsRef<[u8]>) -> Result<(), ModelError> {
        if self.meta.is_some() {
            return Err(self.duplicate_facet("meta"));
        }

        let bytes = raw.as_ref();
        let size = bytes.len() as u64;
        let text = String::from_utf8_lossy(bytes);
        match unserialize(&text) {
            Ok(value) => {
                self.meta = Some(MetaFacet {
                    size,
                    data: MetaData::Parsed(value),
                });
                Ok(())
            }
            Err(source) => {
                self.meta = Some(MetaFacet {
                    size,
                    data: MetaData::Raw(text.into_owned()),
                });
                Err(ModelError::MetaParse {
                    node: self.full_name.clone(),
                    source,
                })
            }
        }
    }

    fn duplicate_facet(&self, facet: &'static str) -> ModelError {
        ModelError::DuplicateFacet {
            node: self.full_name.clone(),
            facet,
        }
    }
}
