//! Site loader: runs every tree walker over one namespace tree.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use dokumap_core::{Namespace, NamespaceTree, ScanError, ScanWarning, SiteConfig, SiteVisitor};

use crate::walker::{TreeKind, TreeWalker, WalkStats};

/// File at the wiki root holding the release name.
const VERSION_FILE: &str = "VERSION";

/// Outcome of a successful [`Site::load`].
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// One entry per tree, in load order.
    pub passes: Vec<WalkStats>,
    pub namespaces: usize,
    pub nodes: usize,
    pub revisions: usize,
    pub warnings: usize,
    pub duration: Duration,
}

/// A DokuWiki installation seen from the filesystem.
#[derive(Debug)]
pub struct Site {
    config: SiteConfig,
    tree: NamespaceTree,
    version: Option<String>,
}

impl Site {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            tree: NamespaceTree::new(),
            version: None,
        }
    }

    /// Site at `root` with default settings.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(SiteConfig::new(root))
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Scan every tree: pages, media, attic, media attic, then meta.
    ///
    /// Starts from an empty tree. If a pass fails, the error is returned and
    /// the content registered by earlier passes stays available.
    pub fn load(&mut self) -> Result<LoadReport, ScanError> {
        let start = Instant::now();
        if self.config.page_suffix.is_empty() {
            return Err(ScanError::InvalidConfig {
                message: "page suffix cannot be empty".to_string(),
            });
        }
        let data = self.config.data_path();
        if !data.is_dir() {
            return Err(ScanError::NotFound { path: data });
        }

        self.tree = NamespaceTree::new();
        self.version = self.read_version()?;
        if let Some(version) = &self.version {
            tracing::info!("DokuWiki version {}", version);
        }

        let mut passes = Vec::with_capacity(TreeKind::LOAD_ORDER.len());
        for kind in TreeKind::LOAD_ORDER {
            tracing::info!("* Loading {}", kind);
            let stats = TreeWalker::new(kind, &self.config).walk(&mut self.tree)?;
            passes.push(stats);
        }

        let report = LoadReport {
            passes,
            namespaces: self.tree.namespace_count(),
            nodes: self.tree.node_count(),
            revisions: self.tree.revision_count(),
            warnings: self.tree.warnings().len(),
            duration: start.elapsed(),
        };
        tracing::info!(
            "Loaded {} namespaces, {} nodes, {} revisions ({} warnings)",
            report.namespaces,
            report.nodes,
            report.revisions,
            report.warnings
        );
        Ok(report)
    }

    fn read_version(&self) -> Result<Option<String>, ScanError> {
        let path = self.config.root.join(VERSION_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScanError::io(path, e)),
        }
    }

    /// Release name from the `VERSION` file, once loaded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    pub fn root(&self) -> &Namespace {
        self.tree.root()
    }

    pub fn warnings(&self) -> &[ScanWarning] {
        self.tree.warnings()
    }

    /// Deterministic text dump of the loaded tree.
    pub fn summary(&self) -> String {
        self.tree.summary()
    }

    /// Feed the loaded tree to a persistence visitor.
    pub fn accept<V: SiteVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        self.tree.accept(visitor)
    }
}
