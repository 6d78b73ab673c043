//! Integration tests for the detection pipeline.
//!
//! Tests cover:
//! - Filtering and localisation of detector output before storage
//! - Validation and inference failures leaving the store untouched
//! - Automatic fallback to simulated detections without a model file
//! - History and statistics through the detector

mod common;

use std::io::Write;
use std::path::Path;

use common::*;
use seatrash::pipeline::record_filename;
use seatrash::{InferenceProvider, SimulatedProvider, TrashCategory, select_provider};

#[tokio::test]
async fn test_detect_filters_and_stores_localized_labels() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let provider = FixedProvider::returning(&[("bottle", 0.80), ("person", 0.90), ("cup", 0.20)]);
    let detector = TrashDetector::new(db, provider);
    let image = create_test_image();

    let report = detector.detect_file(image.path(), Some("beach.jpg")).await?;

    assert_eq!(report.mode, InferenceMode::Model);
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].category, TrashCategory::PlasticBottle);
    assert_eq!(report.detections[0].confidence, 0.80);

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.filename, "beach.jpg");
    assert_eq!(record.label, "塑料瓶");
    assert_eq!(record.confidence, 0.8);

    let stored = detector.history(0, 10, None).await?;
    assert_eq!(stored, report.records);
    Ok(())
}

#[tokio::test]
async fn test_confidences_are_rounded_and_ordered() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let provider = FixedProvider::returning(&[("book", 0.51234), ("kite", 0.98765), ("cup", 0.7)]);
    let detector = TrashDetector::new(db, provider);
    let image = create_test_image();

    let report = detector.detect_file(image.path(), None).await?;
    let labels: Vec<&str> = report.records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["其他垃圾", "塑料瓶", "纸张"]);
    let confidences: Vec<f64> = report.records.iter().map(|r| r.confidence).collect();
    assert_eq!(confidences, vec![0.988, 0.7, 0.512]);
    Ok(())
}

#[tokio::test]
async fn test_zero_detections_is_a_successful_empty_report() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let provider = FixedProvider::returning(&[("person", 0.99), ("bottle", 0.1)]);
    let detector = TrashDetector::new(db, provider);
    let image = create_test_image();

    let report = detector.detect_file(image.path(), None).await?;
    assert!(report.detections.is_empty());
    assert!(report.records.is_empty());
    assert_eq!(detector.count(None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_images_fail_validation_without_inference() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    // the provider would fail loudly if it were ever called
    let detector = TrashDetector::new(db, FixedProvider::failing());

    let missing = detector
        .detect_file(Path::new("/nowhere/photo.jpg"), None)
        .await;
    assert!(matches!(
        missing,
        Err(DetectError::Validation(ValidationFailure::Missing(_)))
    ));

    let wrong_ext = create_test_image_with_suffix(".gif");
    let result = detector.detect_file(wrong_ext.path(), None).await;
    assert!(matches!(
        result,
        Err(DetectError::Validation(ValidationFailure::UnsupportedExtension(_)))
    ));

    let mut garbage = tempfile::Builder::new().suffix(".jpg").tempfile()?;
    garbage.write_all(b"\xff\xd8 truncated jpeg")?;
    let result = detector.detect_file(garbage.path(), None).await;
    assert!(matches!(
        result,
        Err(DetectError::Validation(ValidationFailure::Undecodable(_)))
    ));

    assert_eq!(detector.count(None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_inference_failure_is_reported_and_persists_nothing() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let detector = TrashDetector::new(db, FixedProvider::failing());
    let image = create_test_image();

    let result = detector.detect_file(image.path(), None).await;
    match result {
        Err(DetectError::Inference(e)) => assert!(format!("{:#}", e).contains("detector crashed")),
        other => panic!("expected inference failure, got {:?}", other.map(|r| r.records.len())),
    }
    assert_eq!(detector.count(None).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_persistence_failure_is_reported() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let detector = TrashDetector::new(db, FixedProvider::returning(&[("bottle", 0.9)]));
    detector.store().close().await?;
    let image = create_test_image();

    let result = detector.detect_file(image.path(), None).await;
    assert!(matches!(result, Err(DetectError::Persistence(_))));
    Ok(())
}

#[tokio::test]
async fn test_missing_model_selects_simulated_provider() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = DetectorConfig {
        model_path: missing_model_path(&dir),
        database_path: dir.path().join("detections.db"),
        ..Default::default()
    };
    let provider = select_provider(&config);
    assert_eq!(provider.mode(), InferenceMode::Simulated);

    let image = create_test_image();
    let allowed = ["plastic_bottle", "plastic_bag", "can", "paper"];
    for _ in 0..50 {
        let detections = provider.detect(image.path())?;
        assert!((1..=3).contains(&detections.len()));
        for d in &detections {
            assert!(allowed.contains(&d.label.as_str()));
            assert!((0.4..=0.95).contains(&d.confidence));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_present_model_file_selects_model_provider() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let model_path = dir.path().join("weights.rten");
    std::fs::write(&model_path, b"placeholder")?;
    let config = DetectorConfig {
        model_path,
        ..Default::default()
    };
    assert_eq!(select_provider(&config).mode(), InferenceMode::Model);
    Ok(())
}

#[tokio::test]
async fn test_simulated_pipeline_never_drops_detections() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let detector = TrashDetector::new(db, std::sync::Arc::new(SimulatedProvider::with_seed(3)));
    let image = create_test_image();
    let allowed = ["塑料瓶", "塑料袋", "罐头", "纸张"];

    let mut total = 0;
    for _ in 0..10 {
        let report = detector.detect_file(image.path(), None).await?;
        assert_eq!(report.mode, InferenceMode::Simulated);
        assert!((1..=3).contains(&report.records.len()));
        assert!(report.records.iter().all(|r| allowed.contains(&r.label.as_str())));
        total += report.records.len() as u64;
    }

    let stats = detector.stats().await?;
    assert_eq!(stats.total_count, total);
    assert_eq!(stats.recent_count, total);
    assert_eq!(stats.category_counts.values().sum::<u64>(), total);
    Ok(())
}

#[tokio::test]
async fn test_from_config_opens_store_and_detects() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = DetectorConfig {
        model_path: missing_model_path(&dir),
        database_path: dir.path().join("detections.db"),
        ..Default::default()
    };
    let detector = TrashDetector::from_config(&config).await?;
    assert_eq!(detector.mode(), InferenceMode::Simulated);

    let image = create_test_image_with_suffix(".PNG");
    let report = detector.detect_file(image.path(), None).await?;
    assert!(!report.records.is_empty());
    detector.store().close().await?;
    Ok(())
}

#[tokio::test]
async fn test_history_filters_by_category_key_or_label() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let detector = TrashDetector::new(
        db,
        FixedProvider::returning(&[("bottle", 0.9), ("book", 0.8), ("cup", 0.7)]),
    );
    let image = create_test_image();
    detector.detect_file(image.path(), None).await?;

    assert_eq!(detector.history(0, 10, Some("plastic_bottle")).await?.len(), 2);
    assert_eq!(detector.history(0, 10, Some("塑料瓶")).await?.len(), 2);
    assert_eq!(detector.history(0, 10, Some("paper")).await?.len(), 1);
    assert_eq!(detector.count(Some("plastic_bottle")).await?, 2);
    // a zero limit is clamped up to one record
    assert_eq!(detector.history(0, 0, None).await?.len(), 1);
    assert_eq!(detector.recent(0).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_through_detector() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_db().await;
    let detector = TrashDetector::new(db, FixedProvider::returning(&[("bottle", 0.9)]));
    let image = create_test_image();
    let report = detector.detect_file(image.path(), None).await?;

    let id = report.records[0].id;
    assert!(detector.delete(id).await?);
    assert!(!detector.delete(id).await?);
    assert_eq!(detector.stats().await?.total_count, 0);
    Ok(())
}

#[test]
fn test_record_filename_normalisation() {
    assert_eq!(record_filename(Some("shore.png")), "shore.png");
    assert_eq!(record_filename(Some("   ")), "unknown.jpg");
    assert_eq!(record_filename(None), "unknown.jpg");
    let long = "浪".repeat(300);
    assert_eq!(record_filename(Some(&long)).chars().count(), 255);
}
