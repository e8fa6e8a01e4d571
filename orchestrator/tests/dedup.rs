mod common;

use std::fs;

use common::{rooms_with_duplicates, write_partition};
use dataset::reader;
use orchestrator::{OrchestratorError, configs::DedupConfig, deduplicate};

#[test]
fn compacts_every_partition_into_the_target() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("raw");
    write_partition(&source, "a.json", &rooms_with_duplicates(&["hall", "office"], 5));
    write_partition(&source, "b.json", &rooms_with_duplicates(&["kitchen"], 3));
    write_partition(&source, "c.json", &[]);

    let config = DedupConfig::new(root.path(), "raw", "clean");
    let report = deduplicate(&config).unwrap();

    assert_eq!(report.total.original, 26);
    assert_eq!(report.total.removed, 13);
    assert_eq!(
        report
            .partitions
            .iter()
            .map(|(name, stats)| (name.as_str(), stats.compacted()))
            .collect::<Vec<_>>(),
        [("a.json", 10), ("b.json", 3), ("c.json", 0)]
    );

    let written = reader::read_partitions(&config.target_dir()).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(written[0].len(), 10);
    assert_eq!(written[0].samples()[0].extra["time"], 0);

    let again = deduplicate(&DedupConfig::new(root.path(), "clean", "cleaner")).unwrap();
    assert_eq!(again.total.removed, 0);
}

#[test]
fn missing_source_is_fatal() {
    let root = tempfile::tempdir().unwrap();

    let result = deduplicate(&DedupConfig::new(root.path(), "raw", "clean"));

    assert!(matches!(result, Err(OrchestratorError::Data(_))));
    assert!(!root.path().join("clean").exists());
}

#[test]
fn empty_source_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("raw")).unwrap();

    assert!(deduplicate(&DedupConfig::new(root.path(), "raw", "clean")).is_err());
}
