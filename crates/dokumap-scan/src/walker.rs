//! Shared walker for the five source trees.
//!
//! Every tree mirrors the namespace hierarchy, so the walk itself is the same
//! for all of them: directories become namespaces, files are decoded with
//! the tree's grammar and registered on the shared [`NamespaceTree`]. Only
//! the registration step differs per [`TreeKind`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};

use dokumap_core::{
    Grammar, ModelError, NamespaceId, NamespaceTree, ScanError, ScanWarning, SiteConfig,
    WarningKind,
};

/// One of the parallel source trees under the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Pages,
    Media,
    Attic,
    MediaAttic,
    Meta,
}

impl TreeKind {
    /// Current content before history before metadata.
    pub const LOAD_ORDER: [TreeKind; 5] = [
        TreeKind::Pages,
        TreeKind::Media,
        TreeKind::Attic,
        TreeKind::MediaAttic,
        TreeKind::Meta,
    ];

    /// Subdirectory of the data directory holding this tree.
    pub fn dir_name(self) -> &'static str {
        match self {
            TreeKind::Pages => "pages",
            TreeKind::Media => "media",
            TreeKind::Attic => "attic",
            TreeKind::MediaAttic => "media_attic",
            TreeKind::Meta => "meta",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Counters for one tree walk.
#[derive(Debug, Clone)]
pub struct WalkStats {
    pub kind: TreeKind,
    /// Whether the tree's root directory exists.
    pub present: bool,
    pub files: u64,
    pub dirs: u64,
    /// Entries matched by an ignore rule, and everything below them.
    pub skipped: u64,
    pub duration: Duration,
}

impl WalkStats {
    fn new(kind: TreeKind) -> Self {
        Self {
            kind,
            present: false,
            files: 0,
            dirs: 0,
            skipped: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Walker for a single tree kind.
pub struct TreeWalker<'a> {
    kind: TreeKind,
    config: &'a SiteConfig,
    grammar: Grammar,
}

impl<'a> TreeWalker<'a> {
    pub fn new(kind: TreeKind, config: &'a SiteConfig) -> Self {
        Self {
            kind,
            config,
            grammar: config.grammar(),
        }
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// Directory this walker reads.
    pub fn root_path(&self) -> PathBuf {
        self.config.data_path().join(self.kind.dir_name())
    }

    fn ignore(&self, name: &str) -> bool {
        is_ignored(self.kind, self.config, name)
    }

    /// Walk the tree and register everything it holds.
    ///
    /// A missing root directory contributes nothing. Any other failure stops
    /// the walk; whatever was registered before it stays in `tree`.
    pub fn walk(&self, tree: &mut NamespaceTree) -> Result<WalkStats, ScanError> {
        let start = Instant::now();
        let root = self.root_path();
        let mut stats = WalkStats::new(self.kind);

        if !root.is_dir() {
            tracing::debug!("No {} tree at {}", self.kind, root.display());
            return Ok(stats);
        }
        stats.present = true;
        tracing::info!("* Loading tree: {}", root.display());

        // Ignored directories are still yielded (and counted below) but
        // never read.
        let kind = self.kind;
        let config = self.config.clone();
        let walker = WalkDir::new(&root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(true)
            .process_read_dir(move |_, _, _, children| {
                for entry in children.iter_mut().flatten() {
                    if entry.read_children_path.is_some()
                        && is_ignored(kind, &config, &entry.file_name().to_string_lossy())
                    {
                        entry.read_children_path = None;
                    }
                }
            });

        // Namespace of every directory visited so far.
        let mut namespaces: HashMap<PathBuf, NamespaceId> = HashMap::new();
        namespaces.insert(root.clone(), NamespaceId::ROOT);

        for entry_result in walker {
            let entry = entry_result.map_err(|err| ScanError::Walk {
                path: err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                message: err.to_string(),
            })?;
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().is_dir();
            if self.ignore(&name) {
                tracing::debug!("* Ignored: {}", path.display());
                stats.skipped += 1;
                continue;
            }

            let parent = path
                .parent()
                .and_then(|parent| namespaces.get(parent).copied())
                .ok_or_else(|| ScanError::Walk {
                    path: path.clone(),
                    message: "parent directory was not visited".to_string(),
                })?;

            if is_dir {
                let ns = tree.get_or_create_namespace(parent, &name);
                namespaces.insert(path, ns);
                stats.dirs += 1;
            } else {
                tracing::debug!("* {}: {}", self.kind, path.display());
                let size = fs::metadata(&path)
                    .map_err(|e| ScanError::io(&path, e))?
                    .len();
                self.register(tree, parent, &name, &path, size)?;
                stats.files += 1;
            }
        }

        stats.duration = start.elapsed();
        Ok(stats)
    }

    /// Register one file according to the tree kind.
    fn register(
        &self,
        tree: &mut NamespaceTree,
        ns: NamespaceId,
        entry: &str,
        path: &Path,
        size: u64,
    ) -> Result<(), ScanError> {
        let size_i64 = i64::try_from(size).unwrap_or(i64::MAX);
        match self.kind {
            TreeKind::Pages => {
                let name = match self.grammar.parse_page(entry) {
                    Ok(parsed) => parsed.name,
                    Err(err) => {
                        tracing::error!("Page name not parsable: {}", err);
                        tree.warn(ScanWarning::new(
                            path,
                            err.to_string(),
                            WarningKind::UnparsablePageName,
                        ));
                        entry.to_string()
                    }
                };
                tree.add_page(ns, &name, size)?;
            }
            TreeKind::Media => {
                let parsed = self.grammar.parse_media(entry);
                tree.add_media(ns, &parsed.name, size)?;
            }
            TreeKind::Attic => {
                let parsed = self
                    .grammar
                    .parse_attic(entry)
                    .map_err(|e| ScanError::grammar(path, e))?;
                tree.get_page(ns, &parsed.key())
                    .add_revision(parsed.timestamp, size_i64)?;
            }
            TreeKind::MediaAttic => {
                let parsed = self
                    .grammar
                    .parse_media_attic(entry)
                    .map_err(|e| ScanError::grammar(path, e))?;
                if parsed.ambiguous {
                    tracing::warn!(
                        "Ambiguous media history entry {}, keyed as {}",
                        entry,
                        parsed.key()
                    );
                    tree.warn(ScanWarning::new(
                        path,
                        format!("ambiguous timestamp, keyed as {}", parsed.key()),
                        WarningKind::AmbiguousMediaRevision,
                    ));
                }
                tree.get_media(ns, &parsed.key())
                    .add_revision(parsed.timestamp, size_i64)?;
            }
            TreeKind::Meta => self.register_meta(tree, ns, entry, path, size)?,
        }
        Ok(())
    }

    fn register_meta(
        &self,
        tree: &mut NamespaceTree,
        ns: NamespaceId,
        entry: &str,
        path: &Path,
        size: u64,
    ) -> Result<(), ScanError> {
        let parsed = self
            .grammar
            .parse_meta(entry)
            .map_err(|e| ScanError::grammar(path, e))?;

        match parsed.extension.as_str() {
            ".changes" => {
                let raw = read_bytes(path)?;
                let node = tree.get_page(ns, &parsed.name);
                let full_name = node.full_name().to_string();
                let report = node.set_changes_facet(&raw)?;
                for timestamp in report.orphan_revisions {
                    tree.warn(ScanWarning::orphan_revision(&full_name, timestamp));
                }
                for (line, err) in report.malformed {
                    tracing::warn!("{}:{}: {}", path.display(), line, err);
                    tree.warn(ScanWarning::new(
                        path,
                        format!("line {line}: {err}"),
                        WarningKind::MalformedChangeLine,
                    ));
                }
            }
            ".indexed" => {
                tree.get_page(ns, &parsed.name).set_indexed_facet(size)?;
            }
            ".meta" => {
                let raw = read_bytes(path)?;
                match tree.get_page(ns, &parsed.name).set_meta_facet(&raw) {
                    Ok(()) => {}
                    Err(err @ ModelError::MetaParse { .. }) => {
                        tracing::error!("{}", err);
                        tree.warn(ScanWarning::new(path, err.to_string(), WarningKind::MetaParse));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            _ => {
                tracing::warn!("Unexpected meta entry: {}", path.display());
                tree.warn(ScanWarning::new(
                    path,
                    format!("unexpected meta entry {entry}"),
                    WarningKind::UnexpectedMetaEntry,
                ));
            }
        }
        Ok(())
    }
}

/// Entries skipped in a tree of `kind`.
fn is_ignored(kind: TreeKind, config: &SiteConfig, name: &str) -> bool {
    match kind {
        TreeKind::Meta => config.should_ignore_meta(name),
        _ => config.should_ignore(name),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ScanError> {
    fs::read(path).map_err(|e| ScanError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dokumap_core::{MISSING, NodeKind, Timestamp};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn walk(kind: TreeKind, temp: &TempDir, tree: &mut NamespaceTree) -> Result<WalkStats, ScanError> {
        let config = SiteConfig::new(temp.path());
        TreeWalker::new(kind, &config).walk(tree)
    }

    #[test]
    fn test_missing_tree_is_empty() {
        let temp = TempDir::new().unwrap();
        let mut tree = NamespaceTree::new();
        let stats = walk(TreeKind::MediaAttic, &temp, &mut tree).unwrap();
        assert!(!stats.present);
        assert_eq!(stats.files, 0);
        assert_eq!(tree.namespace_count(), 1);
    }

    #[test]
    fn test_pages_walk_creates_namespaces() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/pages/start.txt", b"hello");
        write(temp.path(), "data/pages/wiki/syntax.txt", b"0123456789");
        fs::create_dir_all(temp.path().join("data/pages/empty")).unwrap();

        let mut tree = NamespaceTree::new();
        let stats = walk(TreeKind::Pages, &temp, &mut tree).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.dirs, 2);

        let wiki = tree.find_namespace(":wiki:").unwrap();
        let syntax = tree.node(wiki, NodeKind::Page, "syntax").unwrap();
        assert_eq!(syntax.current_size(), 10);
        assert_eq!(syntax.full_name(), ":wiki:syntax");
        assert!(tree.find_namespace(":empty:").is_some());
    }

    #[test]
    fn test_unsuffixed_page_uses_raw_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/pages/README", b"x");

        let mut tree = NamespaceTree::new();
        walk(TreeKind::Pages, &temp, &mut tree).unwrap();
        assert!(tree.node(NamespaceId::ROOT, NodeKind::Page, "README").is_some());
        assert_eq!(tree.warnings()[0].kind, WarningKind::UnparsablePageName);
    }

    #[test]
    fn test_dummy_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/attic/_dummy", b"");
        write(temp.path(), "data/attic/start.1.txt.gz", b"abc");

        let mut tree = NamespaceTree::new();
        let stats = walk(TreeKind::Attic, &temp, &mut tree).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.files, 1);
    }

    #[test]
    fn test_ignored_directory_contents_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/media/_dummy/inner.png", b"x");
        write(temp.path(), "data/media/logo.png", b"png");

        let mut tree = NamespaceTree::new();
        let stats = walk(TreeKind::Media, &temp, &mut tree).unwrap();
        // The directory itself is counted; its contents are never read.
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.find_namespace(":_dummy:").is_none());
    }

    #[test]
    fn test_unparsable_attic_entry_aborts() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/attic/broken.txt", b"x");

        let mut tree = NamespaceTree::new();
        let err = walk(TreeKind::Attic, &temp, &mut tree).unwrap_err();
        assert!(matches!(err, ScanError::Grammar { .. }));
    }

    #[test]
    fn test_media_attic_orphan_and_ambiguity() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/media_attic/img.1.1336687823.jpg", b"12345");

        let mut tree = NamespaceTree::new();
        walk(TreeKind::MediaAttic, &temp, &mut tree).unwrap();
        let node = tree
            .node(NamespaceId::ROOT, NodeKind::Media, "img.1336687823.jpg")
            .unwrap();
        assert_eq!(node.current_size(), MISSING);
        assert_eq!(node.revision(Timestamp(1)).unwrap().size, 5);

        let kinds: Vec<WarningKind> = tree.warnings().iter().map(|w| w.kind).collect();
        assert!(kinds.contains(&WarningKind::AmbiguousMediaRevision));
        assert!(kinds.contains(&WarningKind::OrphanNode));
    }

    #[test]
    fn test_meta_facets() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/meta/start.changes", b"100\t::1\tC\tstart\tadmin\tcreated\t\n");
        write(temp.path(), "data/meta/start.indexed", b"7");
        write(temp.path(), "data/meta/start.meta", b"a:1:{s:1:\"k\";i:1;}");
        write(temp.path(), "data/meta/start.trimmed", b"");
        write(temp.path(), "data/meta/_htcookiesalt", b"salt");
        write(temp.path(), "data/meta/start.weird", b"");

        let mut tree = NamespaceTree::new();
        tree.add_page(NamespaceId::ROOT, "start", 1).unwrap();
        let stats = walk(TreeKind::Meta, &temp, &mut tree).unwrap();
        assert_eq!(stats.skipped, 2);

        let node = tree.node(NamespaceId::ROOT, NodeKind::Page, "start").unwrap();
        assert_eq!(node.indexed().unwrap().size, 1);
        assert!(node.meta().is_some());
        assert_eq!(node.changes().unwrap().entries, vec![Timestamp(100)]);

        let kinds: Vec<WarningKind> = tree.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::OrphanRevision, WarningKind::UnexpectedMetaEntry]
        );
    }

    #[test]
    fn test_facet_sizes_match_files_on_disk() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/meta/start.changes", b"100\t::1\tC\tstart\t\xff\xfe\n");
        write(temp.path(), "data/meta/start.meta", b"s:3:\"\xe9t\xe9\";");

        let mut tree = NamespaceTree::new();
        walk(TreeKind::Meta, &temp, &mut tree).unwrap();

        let node = tree.node(NamespaceId::ROOT, NodeKind::Page, "start").unwrap();
        let on_disk = |rel: &str| fs::metadata(temp.path().join(rel)).unwrap().len();
        assert_eq!(node.changes().unwrap().size, on_disk("data/meta/start.changes"));
        assert_eq!(node.meta().unwrap().size, on_disk("data/meta/start.meta"));
    }

    #[test]
    fn test_corrupt_meta_is_recorded_not_fatal() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "data/meta/start.meta", b"garbage");

        let mut tree = NamespaceTree::new();
        walk(TreeKind::Meta, &temp, &mut tree).unwrap();
        assert!(tree.warnings().iter().any(|w| w.kind == WarningKind::MetaParse));
    }
}
