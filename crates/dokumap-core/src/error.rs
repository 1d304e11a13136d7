//! Error and warning types for model building and scanning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grammar::GrammarError;
use crate::meta::MetaError;
use crate::node::{NodeKind, Timestamp};

/// Precondition violations raised by the namespace tree and node model.
///
/// These signal a walker bug or duplicated input files and abort the pass
/// that triggered them. [`ModelError::MetaParse`] is the exception: the
/// facet is still stored (as raw text) and callers usually record it as a
/// warning.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A node with the same name already exists in the namespace.
    #[error("{kind} {namespace}{name} is already registered")]
    DuplicateNode {
        kind: NodeKind,
        namespace: String,
        name: String,
    },

    /// A revision with the same timestamp is already attached to the node.
    #[error("revision {timestamp} of {node} is already registered")]
    DuplicateRevision { node: String, timestamp: Timestamp },

    /// A facet was set twice on the same node.
    #[error("{facet} facet of {node} is already set")]
    DuplicateFacet { node: String, facet: &'static str },

    /// The serialized metadata blob could not be decoded.
    #[error("metadata of {node} is not parsable: {source}")]
    MetaParse {
        node: String,
        #[source]
        source: MetaError,
    },
}

/// Errors that abort a tree walk.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory walker reported a failure.
    #[error("Walk error at {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// A history or meta entry name could not be decomposed.
    #[error("Unparsable entry {path}: {source}")]
    Grammar {
        path: PathBuf,
        #[source]
        source: GrammarError,
    },

    /// The model rejected a registration.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a grammar error with path context.
    pub fn grammar(path: impl Into<PathBuf>, source: GrammarError) -> Self {
        Self::Grammar {
            path: path.into(),
            source,
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// A page or media item known only from history or metadata.
    OrphanNode,
    /// A revision known only from the change log.
    OrphanRevision,
    /// A page file without the page suffix; the raw name was used.
    UnparsablePageName,
    /// A media history name with more than one possible split.
    AmbiguousMediaRevision,
    /// A serialized metadata blob that could not be decoded.
    MetaParse,
    /// A change log line that could not be decoded.
    MalformedChangeLine,
    /// A meta file with an unknown extension.
    UnexpectedMetaEntry,
}

/// Non-fatal finding recorded during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Wiki path (`:ns:name`) or file path the warning refers to.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create an orphan node warning.
    pub fn orphan_node(full_name: &str, kind: NodeKind) -> Self {
        Self {
            path: PathBuf::from(full_name),
            message: format!("{kind} {full_name} has no current file"),
            kind: WarningKind::OrphanNode,
        }
    }

    /// Create an orphan revision warning.
    pub fn orphan_revision(full_name: &str, timestamp: Timestamp) -> Self {
        Self {
            path: PathBuf::from(full_name),
            message: format!("revision {timestamp} of {full_name} has no attic file"),
            kind: WarningKind::OrphanRevision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));
    }

    #[test]
    fn test_model_error_converts() {
        let err: ScanError = ModelError::DuplicateFacet {
            node: ":foo".into(),
            facet: "meta",
        }
        .into();
        assert!(matches!(err, ScanError::Model(ModelError::DuplicateFacet { .. })));
        assert_eq!(err.to_string(), "meta facet of :foo is already set");
    }

    #[test]
    fn test_orphan_warning_creation() {
        let warning = ScanWarning::orphan_node(":bar", NodeKind::Page);
        assert_eq!(warning.kind, WarningKind::OrphanNode);
        assert!(warning.message.contains(":bar"));
    }
}
