//! Namespace hierarchy shared by every tree walker.
//!
//! Namespaces live in an arena owned by [`NamespaceTree`]; parents own their
//! children through [`NamespaceId`] handles and nodes point back at their
//! namespace the same way, so the graph has no ownership cycles.

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ScanWarning};
use crate::node::{MISSING, Node, NodeKind};

/// Namespace separator.
pub const SEPARATOR: char = ':';

/// Handle of a namespace within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId(pub usize);

impl NamespaceId {
    /// The root namespace.
    pub const ROOT: NamespaceId = NamespaceId(0);
}

/// One level of the namespace hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    id: NamespaceId,
    name: CompactString,
    full_name: String,
    parent: Option<NamespaceId>,
    pages: IndexMap<CompactString, Node>,
    media: IndexMap<CompactString, Node>,
    children: IndexMap<CompactString, NamespaceId>,
}

impl Namespace {
    fn new(id: NamespaceId, name: &str, parent: Option<&Namespace>) -> Self {
        let full_name = match parent {
            Some(parent) => format!("{}{name}{SEPARATOR}", parent.full_name),
            None => SEPARATOR.to_string(),
        };
        Self {
            id,
            name: name.into(),
            full_name,
            parent: parent.map(|p| p.id),
            pages: IndexMap::new(),
            media: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

    pub fn id(&self) -> NamespaceId {
        self.id
    }

    /// Local segment; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `:` for the root, `:a:b:` below it.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn parent(&self) -> Option<NamespaceId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn pages(&self) -> &IndexMap<CompactString, Node> {
        &self.pages
    }

    pub fn media(&self) -> &IndexMap<CompactString, Node> {
        &self.media
    }

    /// Nodes of the given kind.
    pub fn nodes(&self, kind: NodeKind) -> &IndexMap<CompactString, Node> {
        match kind {
            NodeKind::Page => &self.pages,
            NodeKind::Media => &self.media,
        }
    }

    fn nodes_mut(&mut self, kind: NodeKind) -> &mut IndexMap<CompactString, Node> {
        match kind {
            NodeKind::Page => &mut self.pages,
            NodeKind::Media => &mut self.media,
        }
    }

    /// Child namespace handles, keyed by segment.
    pub fn children(&self) -> &IndexMap<CompactString, NamespaceId> {
        &self.children
    }

    pub fn child(&self, segment: &str) -> Option<NamespaceId> {
        self.children.get(segment).copied()
    }
}

/// Arena of namespaces rooted at [`NamespaceId::ROOT`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceTree {
    namespaces: Vec<Namespace>,
    warnings: Vec<ScanWarning>,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    /// Create a tree holding only the root namespace.
    pub fn new() -> Self {
        Self {
            namespaces: vec![Namespace::new(NamespaceId::ROOT, "", None)],
            warnings: Vec::new(),
        }
    }

    pub fn root(&self) -> &Namespace {
        &self.namespaces[NamespaceId::ROOT.0]
    }

    /// Look up a namespace by handle.
    ///
    /// Handles are only minted by this tree, so an unknown handle panics.
    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0]
    }

    /// All namespaces in creation order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Return the child `segment` of `parent`, creating it on first use.
    pub fn get_or_create_namespace(&mut self, parent: NamespaceId, segment: &str) -> NamespaceId {
        if let Some(existing) = self.namespace(parent).child(segment) {
            return existing;
        }

        let id = NamespaceId(self.namespaces.len());
        let namespace = Namespace::new(id, segment, Some(self.namespace(parent)));
        tracing::debug!("Namespace: {}", namespace.full_name);
        self.namespaces.push(namespace);
        self.namespaces[parent.0].children.insert(segment.into(), id);
        id
    }

    /// Resolve `:a:b:` (or `a:b`) to an existing namespace.
    pub fn find_namespace(&self, full_name: &str) -> Option<NamespaceId> {
        full_name
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .try_fold(NamespaceId::ROOT, |id, segment| {
                self.namespace(id).child(segment)
            })
    }

    /// Register a current page.
    pub fn add_page(&mut self, ns: NamespaceId, name: &str, size: u64) -> Result<&mut Node, ModelError> {
        self.add_node(ns, NodeKind::Page, name, size)
    }

    /// Register a current media item.
    pub fn add_media(&mut self, ns: NamespaceId, name: &str, size: u64) -> Result<&mut Node, ModelError> {
        self.add_node(ns, NodeKind::Media, name, size)
    }

    /// Register a node seen as a current file.
    pub fn add_node(
        &mut self,
        ns: NamespaceId,
        kind: NodeKind,
        name: &str,
        size: u64,
    ) -> Result<&mut Node, ModelError> {
        let namespace = &mut self.namespaces[ns.0];
        if namespace.nodes(kind).contains_key(name) {
            return Err(ModelError::DuplicateNode {
                kind,
                namespace: namespace.full_name.clone(),
                name: name.to_string(),
            });
        }

        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let node = Node::new(kind, name, ns, &namespace.full_name, size);
        tracing::debug!("{}: {}", kind, node.full_name());
        Ok(namespace
            .nodes_mut(kind)
            .entry(CompactString::from(name))
            .or_insert(node))
    }

    /// Return the page `name`, creating an orphan if it is unknown.
    pub fn get_page(&mut self, ns: NamespaceId, name: &str) -> &mut Node {
        self.get_node(ns, NodeKind::Page, name)
    }

    /// Return the media item `name`, creating an orphan if it is unknown.
    pub fn get_media(&mut self, ns: NamespaceId, name: &str) -> &mut Node {
        self.get_node(ns, NodeKind::Media, name)
    }

    /// Return an existing node, or create an orphan with a [`MISSING`] size.
    ///
    /// Every orphan is logged and recorded as a warning.
    pub fn get_node(&mut self, ns: NamespaceId, kind: NodeKind, name: &str) -> &mut Node {
        let namespace = &mut self.namespaces[ns.0];
        if !namespace.nodes(kind).contains_key(name) {
            let node = Node::new(kind, name, ns, &namespace.full_name, MISSING);
            tracing::warn!("{} {} has no current file", kind, node.full_name());
            self.warnings
                .push(ScanWarning::orphan_node(node.full_name(), kind));
            namespace.nodes_mut(kind).insert(CompactString::from(name), node);
        }
        // Present: either found above or just inserted.
        &mut namespace.nodes_mut(kind)[name]
    }

    /// Read-only node lookup.
    pub fn node(&self, ns: NamespaceId, kind: NodeKind, name: &str) -> Option<&Node> {
        self.namespace(ns).nodes(kind).get(name)
    }

    /// Wiki id of `name` inside `ns`, e.g. `:wiki:syntax`.
    pub fn node_full_name(&self, ns: NamespaceId, name: &str) -> String {
        format!("{}{name}", self.namespace(ns).full_name)
    }

    /// Total number of pages and media items.
    pub fn node_count(&self) -> usize {
        self.namespaces
            .iter()
            .map(|ns| ns.pages.len() + ns.media.len())
            .sum()
    }

    /// Total number of revisions across all nodes.
    pub fn revision_count(&self) -> usize {
        self.namespaces
            .iter()
            .flat_map(|ns| ns.pages.values().chain(ns.media.values()))
            .map(Node::revision_count)
            .sum()
    }

    /// Record a non-fatal finding.
    pub fn warn(&mut self, warning: ScanWarning) {
        self.warnings.push(warning);
    }

    /// Findings recorded so far.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Depth-first namespace order: a namespace, then each child subtree.
    pub fn depth_first(&self) -> Vec<NamespaceId> {
        let mut order = Vec::with_capacity(self.namespaces.len());
        let mut stack = vec![NamespaceId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.namespace(id).children.values().rev().copied());
        }
        order
    }
}
