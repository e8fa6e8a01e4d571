mod common;

use std::fs;

use common::{catalog, rooms_with_duplicates, sample, write_partition};
use machine_learning::BackendKind;
use orchestrator::{
    OrchestratorError, RoomPredictor,
    configs::TrainingConfig,
    export::{CONFUSION_FILE, PORTABLE_FILE, REPORT_FILE},
    metadata::{METADATA_FILE, MetadataRecord, artifact_file},
};
use tempfile::TempDir;

fn setup(partitions: &[(&str, Vec<serde_json::Value>)]) -> (TempDir, TrainingConfig) {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    for (name, samples) in partitions {
        write_partition(&data.join("clean"), name, samples);
    }

    let config = TrainingConfig::new(
        data,
        "clean",
        root.path().join("output"),
        BackendKind::ALL.to_vec(),
    );
    (root, config)
}

fn three_rooms() -> (TempDir, TrainingConfig) {
    setup(&[
        ("a.json", rooms_with_duplicates(&["kitchen", "hall"], 15)),
        ("b.json", rooms_with_duplicates(&["office", "hall"], 15)),
    ])
}

#[test]
fn trains_and_exports_every_available_backend() {
    let (_root, config) = three_rooms();

    let run = orchestrator::train(&config, &catalog()).unwrap();
    let dir = config.run_dir();

    assert_eq!(run.data.dedup.original, 120);
    assert_eq!(run.data.dedup.removed, 60);
    assert_eq!(run.data.y.len(), 60);

    assert_eq!(run.metadata.num_features, 4);
    assert_eq!(run.metadata.num_classes, 3);
    assert_eq!(
        run.metadata.idx_to_room.values().collect::<Vec<_>>(),
        ["hall", "kitchen", "office"]
    );

    for file in [
        artifact_file(BackendKind::Forest),
        artifact_file(BackendKind::Boosted),
        PORTABLE_FILE.into(),
        REPORT_FILE.into(),
        CONFUSION_FILE.into(),
        METADATA_FILE.into(),
    ] {
        assert!(dir.join(&file).is_file(), "{file} was not written");
    }

    let network_file = dir.join(artifact_file(BackendKind::Network));
    assert_eq!(network_file.is_file(), cfg!(feature = "network"));

    let on_disk = MetadataRecord::load(&dir.join(METADATA_FILE)).unwrap();
    assert_eq!(on_disk, run.metadata);
    assert!(on_disk.best.is_some());
    assert_eq!(
        on_disk.artifacts.len(),
        if cfg!(feature = "network") { 3 } else { 2 }
    );

    let report = fs::read_to_string(dir.join(REPORT_FILE)).unwrap();
    assert!(report.contains("<- best"));
    assert!(!report.contains("bedroom"));
}

#[test]
fn predictions_map_back_through_the_metadata() {
    let (_root, config) = three_rooms();
    let run = orchestrator::train(&config, &catalog()).unwrap();

    for &kind in run.metadata.artifacts.keys() {
        let predictor = RoomPredictor::load(&config.run_dir(), kind).unwrap();
        assert_eq!(predictor.rooms(), ["hall", "kitchen", "office"]);
        assert_eq!(predictor.sensor_order(), ["s1", "s2"]);

        for (idx, room) in &run.metadata.idx_to_room {
            assert_eq!(run.metadata.room_to_idx[room], *idx);
        }

        let room = predictor.predict(&[1.2, 1.0, 8.8, 0.0]).unwrap();
        assert!(run.metadata.room_to_idx.contains_key(room));
        assert!(predictor.predict(&[1.0, 1.0]).is_err());
    }
}

#[test]
fn tree_backends_recognise_their_rooms() {
    let (_root, config) = three_rooms();
    orchestrator::train(&config, &catalog()).unwrap();

    let predictor = RoomPredictor::load(&config.run_dir(), BackendKind::Forest).unwrap();

    assert_eq!(predictor.predict(&[1.1, 1.0, 8.9, 1.0]).unwrap(), "hall");
    assert_eq!(predictor.predict(&[4.2, 1.0, 5.8, 0.0]).unwrap(), "kitchen");
    assert_eq!(predictor.predict(&[7.3, 1.0, 2.7, 1.0]).unwrap(), "office");
}

#[test]
fn single_room_aborts_before_writing_anything() {
    let (_root, config) = setup(&[(
        "a.json",
        vec![sample("hall", 0), sample("hall", 1), sample("garage", 2)],
    )]);

    let result = orchestrator::train(&config, &catalog());

    assert!(matches!(
        result,
        Err(OrchestratorError::InsufficientClasses { found: 1 })
    ));
    assert!(!config.run_dir().exists());
}

#[test]
fn missing_source_is_fatal() {
    let (_root, config) = setup(&[]);

    assert!(matches!(
        orchestrator::train(&config, &catalog()),
        Err(OrchestratorError::Data(dataset::DataErr::SourceMissing { .. }))
    ));
}

#[test]
fn artifacts_of_another_run_are_refused() {
    let (_root, config) = three_rooms();
    let config = TrainingConfig {
        backends: vec![BackendKind::Forest],
        ..config
    };
    orchestrator::train(&config, &catalog()).unwrap();

    let path = config.run_dir().join(METADATA_FILE);
    let mut record = MetadataRecord::load(&path).unwrap();
    record.run_id = "0000000000000000".into();
    record.save(&path).unwrap();

    assert!(matches!(
        RoomPredictor::load(&config.run_dir(), BackendKind::Forest),
        Err(OrchestratorError::MetadataMismatch(_))
    ));
}

#[test]
fn a_later_run_leaves_nothing_of_the_earlier_one() {
    let (_root, config) = three_rooms();
    let dir = config.run_dir();

    let first = orchestrator::train(
        &TrainingConfig {
            backends: vec![BackendKind::Boosted],
            ..config.clone()
        },
        &catalog(),
    )
    .unwrap();
    let portable: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join(PORTABLE_FILE)).unwrap()).unwrap();
    assert_eq!(portable["run_id"], first.metadata.run_id.as_str());
    assert_eq!(portable["num_class"], 3);

    fs::remove_file(config.source_dir().join("b.json")).unwrap();
    let second = orchestrator::train(
        &TrainingConfig {
            backends: vec![BackendKind::Forest],
            ..config
        },
        &catalog(),
    )
    .unwrap();

    assert_ne!(second.metadata.run_id, first.metadata.run_id);
    assert_eq!(second.metadata.num_classes, 2);
    assert!(!dir.join(PORTABLE_FILE).exists());
    assert!(!dir.join(artifact_file(BackendKind::Boosted)).exists());
    assert!(dir.join(artifact_file(BackendKind::Forest)).is_file());

    let confusion = fs::read_to_string(dir.join(CONFUSION_FILE)).unwrap();
    assert!(!confusion.contains("office"));
    assert!(RoomPredictor::load(&dir, BackendKind::Boosted).is_err());
}

#[test]
fn unreadable_partitions_are_skipped() {
    let (_root, config) = three_rooms();
    fs::write(config.source_dir().join("broken.json"), "[{").unwrap();

    let run = orchestrator::train(
        &TrainingConfig {
            backends: vec![BackendKind::Forest],
            ..config
        },
        &catalog(),
    )
    .unwrap();

    assert_eq!(run.data.y.len(), 60);
}
