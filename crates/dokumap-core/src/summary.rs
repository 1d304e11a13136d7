//! Plain-text dump of a namespace tree.

use std::fmt::Write;

use crate::namespace::NamespaceTree;
use crate::node::Node;

impl NamespaceTree {
    /// Render the tree depth first: each namespace, its pages, its media
    /// (when any), then its children.
    ///
    /// Output depends only on the tree contents, so the same snapshot always
    /// renders the same text.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for id in self.depth_first() {
            let namespace = self.namespace(id);
            let _ = writeln!(out, "* Namespace: {}", namespace.full_name());
            let _ = writeln!(out, "** pages: {}", namespace.pages().len());
            for page in namespace.pages().values() {
                write_node(&mut out, page);
            }
            if !namespace.media().is_empty() {
                let _ = writeln!(out, "** media: {}", namespace.media().len());
                for media in namespace.media().values() {
                    write_node(&mut out, media);
                }
            }
        }
        out
    }
}

fn write_node(out: &mut String, node: &Node) {
    let size = if node.is_missing() {
        "MISSING".to_string()
    } else {
        format!("{} bytes", node.current_size())
    };
    let _ = write!(
        out,
        "  - [{}] {} - {} - {} revisions",
        node.kind(),
        node.name(),
        size,
        node.revision_count()
    );
    if let Some(date) = node
        .latest_revision()
        .and_then(|rev| rev.timestamp.to_datetime())
    {
        let _ = write!(out, " - last {}", date.format("%Y-%m-%d"));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use crate::namespace::{NamespaceId, NamespaceTree};
    use crate::node::Timestamp;

    #[test]
    fn test_summary_layout() {
        let mut tree = NamespaceTree::new();
        let sub = tree.get_or_create_namespace(NamespaceId::ROOT, "sub");
        tree.add_page(NamespaceId::ROOT, "foo", 12)
            .unwrap()
            .add_revision(Timestamp(1700000000), 8)
            .unwrap();
        tree.get_page(NamespaceId::ROOT, "bar");
        tree.add_media(sub, "img.1.jpg", 30).unwrap();

        let expected = "\
* Namespace: :
** pages: 2
  - [Page] foo - 12 bytes - 1 revisions - last 2023-11-14
  - [Page] bar - MISSING - 0 revisions
* Namespace: :sub:
** pages: 0
** media: 1
  - [Media] img.1.jpg - 30 bytes - 0 revisions
";
        assert_eq!(tree.summary(), expected);
    }

    #[test]
    fn test_summary_is_stable() {
        let mut tree = NamespaceTree::new();
        tree.add_page(NamespaceId::ROOT, "a", 1).unwrap();
        assert_eq!(tree.summary(), tree.summary());
    }
}
