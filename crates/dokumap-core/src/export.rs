//! Traversal contract for persistence collaborators.
//!
//! [`NamespaceTree::accept`] visits every namespace exactly once, depth
//! first, before its nodes and before its children; every node is visited
//! before its revisions.

use serde::Serialize;

use crate::changes::ChangeRecord;
use crate::namespace::{Namespace, NamespaceTree};
use crate::node::{MetaData, Node, NodeKind, Revision, Timestamp};

/// Receiver of a tree traversal.
pub trait SiteVisitor {
    type Error;

    fn visit_namespace(&mut self, namespace: &Namespace) -> Result<(), Self::Error>;

    fn visit_node(&mut self, namespace: &Namespace, node: &Node) -> Result<(), Self::Error>;

    fn visit_revision(&mut self, node: &Node, revision: &Revision) -> Result<(), Self::Error>;
}

impl NamespaceTree {
    /// Walk the tree, stopping at the first visitor error.
    pub fn accept<V: SiteVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        for id in self.depth_first() {
            let namespace = self.namespace(id);
            visitor.visit_namespace(namespace)?;
            for node in namespace.pages().values().chain(namespace.media().values()) {
                visitor.visit_node(namespace, node)?;
                for revision in node.revisions() {
                    visitor.visit_revision(node, revision)?;
                }
            }
        }
        Ok(())
    }
}

/// Flat, serializable view of one traversal step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum ExportRecord {
    Namespace {
        full_name: String,
    },
    Node {
        kind: NodeKind,
        namespace: String,
        name: String,
        current_size: i64,
        changes_size: Option<u64>,
        indexed_size: Option<u64>,
        meta_size: Option<u64>,
        meta: Option<MetaData>,
    },
    Revision {
        node: String,
        timestamp: Timestamp,
        size: i64,
        change: Option<ChangeRecord>,
    },
}

/// Visitor collecting [`ExportRecord`]s in traversal order.
#[derive(Debug, Default)]
pub struct RecordCollector {
    records: Vec<ExportRecord>,
}

impl RecordCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ExportRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExportRecord> {
        self.records
    }
}

impl SiteVisitor for RecordCollector {
    type Error = std::convert::Infallible;

    fn visit_namespace(&mut self, namespace: &Namespace) -> Result<(), Self::Error> {
        self.records.push(ExportRecord::Namespace {
            full_name: namespace.full_name().to_string(),
        });
        Ok(())
    }

    fn visit_node(&mut self, namespace: &Namespace, node: &Node) -> Result<(), Self::Error> {
        self.records.push(ExportRecord::Node {
            kind: node.kind(),
            namespace: namespace.full_name().to_string(),
            name: node.name().to_string(),
            current_size: node.current_size(),
            changes_size: node.changes().map(|f| f.size),
            indexed_size: node.indexed().map(|f| f.size),
            meta_size: node.meta().map(|f| f.size),
            meta: node.meta().map(|f| f.data.clone()),
        });
        Ok(())
    }

    fn visit_revision(&mut self, node: &Node, revision: &Revision) -> Result<(), Self::Error> {
        self.records.push(ExportRecord::Revision {
            node: node.full_name().to_string(),
            timestamp: revision.timestamp,
            size: revision.size,
            change: revision.change.clone(),
        });
        Ok(())
    }
}
