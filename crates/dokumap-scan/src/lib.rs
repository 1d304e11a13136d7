//! DokuWiki data directory scanning for dokumap.
//!
//! A DokuWiki keeps each facet of its content in its own directory tree
//! under `data/`, all mirroring the same namespace layout:
//!
//! - `pages/`: current page text (`start.txt`)
//! - `media/`: current media files (`logo.png`)
//! - `attic/`: page history (`start.1367320658.txt.gz`)
//! - `media_attic/`: media history (`logo.1336687823.png`)
//! - `meta/`: change logs, index markers and serialized metadata
//!
//! [`Site::load`] walks them in that order over one shared namespace tree,
//! using one [`TreeWalker`] per tree.
//!
//! # Example
//!
//! ```rust,no_run
//! use dokumap_scan::Site;
//!
//! let mut site = Site::open("/var/www/dokuwiki");
//! let report = site.load().unwrap();
//!
//! println!("{} pages and media items", report.nodes);
//! print!("{}", site.summary());
//! ```

mod site;
mod walker;

pub use site::{LoadReport, Site};
pub use walker::{TreeKind, TreeWalker, WalkStats};

// Re-export core types for convenience
pub use dokumap_core::{
    Namespace, NamespaceId, NamespaceTree, Node, NodeKind, ScanError, ScanWarning, SiteConfig,
    Timestamp, WarningKind,
};
