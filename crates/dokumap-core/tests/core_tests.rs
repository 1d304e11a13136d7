use dokumap_core::{
    ChangeType, Grammar, GrammarError, MISSING, MetaData, ModelError, NamespaceId, NamespaceTree,
    NodeKind, SiteConfig, Timestamp, WarningKind, parse_change_log, unserialize,
};

#[test]
fn test_namespace_id_operations() {
    let id1 = NamespaceId(3);
    let id2 = NamespaceId(3);

    assert_eq!(id1, id2);
    assert_ne!(id1, NamespaceId::ROOT);
    assert_eq!(NamespaceId::ROOT.0, 0);
}

#[test]
fn test_timestamp_ordering_and_dates() {
    let older = Timestamp(1336687823);
    let newer = Timestamp::from(1367320658);

    assert!(older < newer);
    assert_eq!(newer.to_string(), "1367320658");

    let date = older.to_datetime().unwrap();
    assert_eq!(date.format("%Y-%m-%d").to_string(), "2012-05-11");
    assert!(Timestamp(u64::MAX).to_datetime().is_none());
}

#[test]
fn test_namespace_reuse_across_trees() {
    let mut tree = NamespaceTree::new();

    // Same directory seen by the pages walk and the attic walk.
    let from_pages = tree.get_or_create_namespace(NamespaceId::ROOT, "wiki");
    let nested = tree.get_or_create_namespace(from_pages, "dokuwiki");
    let from_attic = tree.get_or_create_namespace(NamespaceId::ROOT, "wiki");

    assert_eq!(from_pages, from_attic);
    assert_eq!(tree.namespace_count(), 3);
    assert_eq!(tree.namespace(nested).full_name(), ":wiki:dokuwiki:");
    assert_eq!(tree.namespace(nested).name(), "dokuwiki");
}

#[test]
fn test_node_full_names() {
    let mut tree = NamespaceTree::new();
    let wiki = tree.get_or_create_namespace(NamespaceId::ROOT, "wiki");

    let root_page = tree.add_page(NamespaceId::ROOT, "start", 1).unwrap();
    assert_eq!(root_page.full_name(), ":start");

    let media = tree.add_media(wiki, "dokuwiki-128.png", 1).unwrap();
    assert_eq!(media.full_name(), ":wiki:dokuwiki-128.png");
    assert_eq!(media.namespace(), wiki);
    assert_eq!(media.kind(), NodeKind::Media);
}

#[test]
fn test_history_for_unknown_page_creates_orphan() {
    let mut tree = NamespaceTree::new();
    tree.get_page(NamespaceId::ROOT, "deleted")
        .add_revision(Timestamp(1600000000), 42)
        .unwrap();

    let node = tree
        .node(NamespaceId::ROOT, NodeKind::Page, "deleted")
        .unwrap();
    assert_eq!(node.current_size(), MISSING);
    assert!(node.is_missing());
    assert_eq!(node.revision_count(), 1);

    let warning = &tree.warnings()[0];
    assert_eq!(warning.kind, WarningKind::OrphanNode);
}

#[test]
fn test_duplicate_revision_is_rejected() {
    let mut tree = NamespaceTree::new();
    let node = tree.add_page(NamespaceId::ROOT, "start", 10).unwrap();
    node.add_revision(Timestamp(5), 1).unwrap();

    let err = node.add_revision(Timestamp(5), 2).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateRevision { timestamp: Timestamp(5), .. }));
    assert_eq!(node.revision(Timestamp(5)).unwrap().size, 1);
}

#[test]
fn test_revisions_are_time_ordered() {
    let mut tree = NamespaceTree::new();
    let node = tree.add_page(NamespaceId::ROOT, "start", 10).unwrap();
    for ts in [30, 10, 20] {
        node.add_revision(Timestamp(ts), 1).unwrap();
    }

    let order: Vec<u64> = node.revisions().map(|r| r.timestamp.0).collect();
    assert_eq!(order, vec![10, 20, 30]);
    assert_eq!(node.latest_revision().unwrap().timestamp, Timestamp(30));
}

#[test]
fn test_change_log_onto_revisions() {
    let mut tree = NamespaceTree::new();
    let node = tree.add_page(NamespaceId::ROOT, "start", 10).unwrap();
    node.add_revision(Timestamp(100), 4).unwrap();

    let raw = "100\t127.0.0.1\tC\tstart\tadmin\tcreated\t\n\
               200\t127.0.0.1\te\tstart\tadmin\ttypo\t\t-3\n\
               garbage\n";
    let report = node.set_changes_facet(raw).unwrap();

    assert_eq!(report.applied, 2);
    assert_eq!(report.orphan_revisions, vec![Timestamp(200)]);
    assert_eq!(report.malformed.len(), 1);
    assert_eq!(report.malformed[0].0, 3);

    let created = node.revision(Timestamp(100)).unwrap();
    assert_eq!(created.size, 4);
    assert_eq!(created.change.as_ref().unwrap().change_type, ChangeType::Create);

    let typo = node.revision(Timestamp(200)).unwrap();
    assert!(typo.is_missing());
    assert_eq!(typo.change.as_ref().unwrap().size_change, Some(-3));

    assert!(matches!(
        node.set_changes_facet(raw),
        Err(ModelError::DuplicateFacet { facet: "changes", .. })
    ));
}

#[test]
fn test_change_log_line_numbers_skip_blanks() {
    let parsed = parse_change_log("\n1\t::1\tE\tp\tu\n\nbad\n");
    let lines: Vec<usize> = parsed.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![2, 4]);
    assert!(parsed[0].1.is_ok());
    assert!(parsed[1].1.is_err());
}

#[test]
fn test_meta_facet_keeps_raw_on_failure() {
    let mut tree = NamespaceTree::new();
    let node = tree.get_page(NamespaceId::ROOT, "start");

    let err = node.set_meta_facet("a:1:{broken").unwrap_err();
    assert!(matches!(err, ModelError::MetaParse { .. }));
    match &node.meta().unwrap().data {
        MetaData::Raw(raw) => assert_eq!(raw, "a:1:{broken"),
        MetaData::Parsed(_) => panic!("expected raw fallback"),
    }
}

#[test]
fn test_unserialize_page_metadata() {
    let raw = r#"a:2:{s:7:"current";a:2:{s:5:"title";s:4:"Home";s:4:"date";a:1:{s:7:"created";i:1336687823;}}s:10:"persistent";a:0:{}}"#;
    let value = unserialize(raw).unwrap();

    assert_eq!(value["current"]["title"], "Home");
    assert_eq!(value["current"]["date"]["created"], 1336687823);
    assert!(value["persistent"].as_array().unwrap().is_empty());
}

#[test]
fn test_grammar_from_config() {
    let config = SiteConfig::builder()
        .root("/srv/wiki")
        .page_suffix(".md")
        .archive_suffix(".bz2")
        .build()
        .unwrap();
    let grammar = config.grammar();

    assert_eq!(grammar.parse_page("start.md").unwrap().name, "start");
    let revision = grammar.parse_attic("start.1700000000.md.bz2").unwrap();
    assert_eq!(revision.key(), "start");
    assert_eq!(revision.timestamp, Timestamp(1700000000));
}

#[test]
fn test_grammar_tree_keys_agree() {
    let grammar = Grammar::default();

    // Every tree decodes to the same key for the same logical item.
    let page = grammar.parse_page("syntax.txt").unwrap();
    let attic = grammar.parse_attic("syntax.1367320658.txt.gz").unwrap();
    let meta = grammar.parse_meta("syntax.changes").unwrap();
    assert_eq!(page.name, attic.key());
    assert_eq!(page.name, meta.name);

    let media = grammar.parse_media("logo.png");
    let media_attic = grammar.parse_media_attic("logo.1336687823.png").unwrap();
    assert_eq!(media.name, media_attic.key());
}

#[test]
fn test_grammar_rejects_foreign_entries() {
    let grammar = Grammar::default();
    assert!(matches!(
        grammar.parse_page("logo.png"),
        Err(GrammarError::MissingSuffix { .. })
    ));
    assert!(matches!(
        grammar.parse_attic("start.txt"),
        Err(GrammarError::NoMatch { tree: "attic", .. })
    ));
    assert!(matches!(
        grammar.parse_media_attic("logo.png"),
        Err(GrammarError::NoMatch { .. })
    ));
}
