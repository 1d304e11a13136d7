//! Core types for dokumap.
//!
//! This crate models the logical content of a DokuWiki data directory:
//! a namespace hierarchy holding pages and media items, each enriched with
//! archived revisions and per-node facets (change log, index marker,
//! serialized metadata). It also provides the filename grammar used to map
//! directory entries of each source tree onto that model.
//!
//! Lookups that reconcile the trees are get-or-create: history or metadata
//! for content that no longer exists produces an orphan node with a
//! [`MISSING`] size instead of an error.

mod changes;
mod config;
mod error;
mod export;
mod grammar;
mod meta;
mod namespace;
mod node;
mod summary;

pub use changes::{ChangeLineError, ChangeRecord, ChangeType, parse_change_log};
pub use config::{SiteConfig, SiteConfigBuilder};
pub use error::{ModelError, ScanError, ScanWarning, WarningKind};
pub use export::{ExportRecord, RecordCollector, SiteVisitor};
pub use grammar::{
    Grammar, GrammarError, ParsedEntry, ParsedRevision, parse_attic, parse_media_attic, parse_page,
};
pub use meta::{MetaError, unserialize};
pub use namespace::{Namespace, NamespaceId, NamespaceTree, SEPARATOR};
pub use node::{
    ChangeLogReport, ChangesFacet, IndexedFacet, MISSING, MetaData, MetaFacet, Node, NodeKind,
    Revision, Timestamp,
};
