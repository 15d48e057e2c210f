//! Tests for the tuning pipeline: validation, risk gate, patching and packaging

use async_trait::async_trait;
use ecutune_serialization::{ChecksumAlgorithm, ChecksumKind, ChecksumRegistry, Crc32};
use ecutune_services::{
    AssessorError, CancelSignal, ErrorClass, PipelineConfig, RiskAssessor, RuleBasedRiskAssessor,
    TuningError, TuningOutcome, TuningPipeline,
};
use ecutune_structures::{
    ElementEncoding, Image, MapDescriptor, MapGrid, RiskAssessment, RiskLevel, Strategy,
    TuningRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

//region Fake assessors

struct FixedAssessor {
    level: RiskLevel,
    calls: AtomicUsize,
}

impl FixedAssessor {
    fn new(level: RiskLevel) -> Arc<Self> {
        Arc::new(FixedAssessor {
            level,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskAssessor for FixedAssessor {
    async fn assess(
        &self,
        maps: &[MapDescriptor],
        requests: &[TuningRequest],
    ) -> Result<RiskAssessment, AssessorError> {
        assert_eq!(maps.len(), requests.len());
        for (map, request) in maps.iter().zip(requests) {
            assert_eq!(map.name, request.map_name);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RiskAssessment::new(self.level).with_issue(format!("{} risk", self.level)))
    }
}

struct SlowAssessor;

#[async_trait]
impl RiskAssessor for SlowAssessor {
    async fn assess(
        &self,
        _maps: &[MapDescriptor],
        _requests: &[TuningRequest],
    ) -> Result<RiskAssessment, AssessorError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(RiskAssessment::new(RiskLevel::Low))
    }
}

struct FailingAssessor(AssessorError);

#[async_trait]
impl RiskAssessor for FailingAssessor {
    async fn assess(
        &self,
        _maps: &[MapDescriptor],
        _requests: &[TuningRequest],
    ) -> Result<RiskAssessment, AssessorError> {
        Err(self.0.clone())
    }
}

//endregion

fn scenario_image() -> Image {
    let mut bytes = vec![0u8; 16];
    bytes[4..8].copy_from_slice(&[0x03, 0xE8, 0x07, 0xD0]);
    Image::new(bytes).with_filename("stock.bin")
}

fn boost() -> MapDescriptor {
    MapDescriptor::new("boost", 4, 2, 1, ElementEncoding::U16Be, 0.1).unwrap()
}

fn pipeline(assessor: Arc<dyn RiskAssessor>) -> TuningPipeline {
    TuningPipeline::new(assessor)
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let image = scenario_image();
    let assessor = FixedAssessor::new(RiskLevel::Low);
    let request = TuningRequest::new("boost", 100.0, 150.0, Strategy::Manual)
        .with_grid(MapGrid::from_rows(vec![vec![150.0, 200.0]]));

    let outcome = pipeline(assessor.clone())
        .run(&image, &[boost()], &[request])
        .await
        .unwrap();
    let artifact = outcome.into_artifact().unwrap();

    assert_eq!(&artifact.image.bytes()[4..8], &[0x05, 0xDC, 0x07, 0xD0]);
    assert_eq!(&artifact.image.bytes()[..4], &[0u8; 4]);
    assert_eq!(&artifact.image.bytes()[8..], &[0u8; 8]);
    assert_eq!(artifact.checksum.to_string(), "0x000001B8");
    assert_eq!(artifact.original_checksum.to_string(), "0x000001C2");
    assert_eq!(artifact.filename, "tuned_stock.bin");
    assert_eq!(artifact.patched_maps, vec!["boost".to_string()]);
    assert_eq!(artifact.risk_report.risk_level, RiskLevel::Low);
    // evidence says "at the limit" even though the assessor let it through
    assert_eq!(artifact.limit_reports[0].risk_score, 100.0);
    assert_eq!(assessor.calls(), 1);

    assert_eq!(&image.bytes()[4..8], &[0x03, 0xE8, 0x07, 0xD0]);
}

#[tokio::test]
async fn test_proportional_adjustment_without_grid() {
    let image = scenario_image();
    let request = TuningRequest::new("boost", 100.0, 110.0, Strategy::Eco);
    let outcome = pipeline(FixedAssessor::new(RiskLevel::Medium))
        .run(&image, &[boost()], &[request])
        .await
        .unwrap();
    let artifact = outcome.artifact().unwrap();
    // 110.0 / 0.1 = 1100, 220.0 / 0.1 = 2200
    assert_eq!(&artifact.image.bytes()[4..8], &[0x04, 0x4C, 0x08, 0x98]);
}

#[tokio::test]
async fn test_critical_gate_leaves_source_untouched() {
    let image = scenario_image();
    let before = image.bytes().to_vec();
    let request = TuningRequest::new("boost", 100.0, 150.0, Strategy::Eco);

    let outcome = pipeline(FixedAssessor::new(RiskLevel::Critical))
        .run(&image, &[boost()], &[request])
        .await
        .unwrap();

    assert_eq!(image.bytes(), before.as_slice());
    match &outcome {
        TuningOutcome::Rejected(rejected) => {
            assert_eq!(rejected.assessment.risk_level, RiskLevel::Critical);
            assert_eq!(rejected.limit_reports.len(), 1);
            assert!(!rejected.limit_reports[0].is_safe);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(outcome.artifact().is_none());

    let err = outcome.into_artifact().unwrap_err();
    assert!(matches!(err, TuningError::CriticalRiskRejected(_)));
    assert_eq!(err.class(), ErrorClass::Denied);
}

#[tokio::test]
async fn test_high_risk_proceeds_and_is_surfaced() {
    let image = scenario_image();
    let request = TuningRequest::new("boost", 100.0, 104.5, Strategy::Eco);
    let outcome = pipeline(FixedAssessor::new(RiskLevel::High))
        .run(&image, &[boost()], &[request])
        .await
        .unwrap();
    let artifact = outcome.into_artifact().unwrap();
    assert_eq!(artifact.risk_report.risk_level, RiskLevel::High);
    assert_eq!(artifact.risk_report.issues, vec!["High risk".to_string()]);
}

#[tokio::test]
async fn test_rule_based_assessor_rejects_over_limit() {
    let image = scenario_image();
    let request = TuningRequest::new("boost", 100.0, 110.0, Strategy::Eco);
    let outcome = pipeline(Arc::new(RuleBasedRiskAssessor))
        .run(&image, &[boost()], &[request])
        .await
        .unwrap();
    assert!(!outcome.is_packaged());
    assert_eq!(outcome.risk_assessment().risk_level, RiskLevel::Critical);
}

#[tokio::test]
async fn test_overlapping_maps_rejected_before_assessment() {
    let image = Image::new(vec![0u8; 4]);
    let a = MapDescriptor::new("a", 0, 2, 1, ElementEncoding::U8, 1.0).unwrap();
    let b = MapDescriptor::new("b", 1, 2, 1, ElementEncoding::U8, 1.0).unwrap();
    let assessor = FixedAssessor::new(RiskLevel::Low);

    let result = pipeline(assessor.clone())
        .run(
            &image,
            &[a, b],
            &[
                TuningRequest::new("a", 1.0, 1.0, Strategy::Eco),
                TuningRequest::new("b", 1.0, 1.0, Strategy::Eco),
            ],
        )
        .await;

    match result {
        Err(TuningError::OverlappingMapRegions { first, second }) => {
            assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
        }
        other => panic!("expected overlap, got {:?}", other),
    }
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn test_same_map_twice_overlaps() {
    let image = scenario_image();
    let assessor = FixedAssessor::new(RiskLevel::Low);
    let request = TuningRequest::new("boost", 100.0, 101.0, Strategy::Eco);
    let result = pipeline(assessor.clone())
        .run(&image, &[boost()], &[request.clone(), request])
        .await;
    assert!(matches!(result, Err(TuningError::OverlappingMapRegions { .. })));
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn test_adjacent_maps_are_fine() {
    let image = Image::new(vec![1u8, 2, 3, 4]);
    let a = MapDescriptor::new("a", 0, 2, 1, ElementEncoding::U8, 1.0).unwrap();
    let b = MapDescriptor::new("b", 2, 2, 1, ElementEncoding::U8, 1.0).unwrap();
    let outcome = pipeline(FixedAssessor::new(RiskLevel::Low))
        .run(
            &image,
            &[a, b],
            &[
                TuningRequest::new("a", 1.0, 2.0, Strategy::Eco),
                TuningRequest::new("b", 0.0, 1.0, Strategy::Eco),
            ],
        )
        .await
        .unwrap();
    let artifact = outcome.into_artifact().unwrap();
    assert_eq!(artifact.image.bytes(), &[2, 4, 4, 5]);
    assert_eq!(artifact.patched_maps, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_unknown_map() {
    let assessor = FixedAssessor::new(RiskLevel::Low);
    let result = pipeline(assessor.clone())
        .run(
            &scenario_image(),
            &[boost()],
            &[TuningRequest::new("fuel", 1.0, 2.0, Strategy::Eco)],
        )
        .await;
    match result {
        Err(err @ TuningError::UnknownMap(_)) => assert_eq!(err.class(), ErrorClass::InvalidRequest),
        other => panic!("expected unknown map, got {:?}", other),
    }
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn test_map_outside_image() {
    let tail = MapDescriptor::new("tail", 14, 2, 1, ElementEncoding::U16Be, 1.0).unwrap();
    let result = pipeline(FixedAssessor::new(RiskLevel::Low))
        .run(
            &scenario_image(),
            &[tail],
            &[TuningRequest::new("tail", 1.0, 2.0, Strategy::Eco)],
        )
        .await;
    assert!(matches!(result, Err(TuningError::AddressOutOfBounds { .. })));
}

#[tokio::test]
async fn test_invalid_descriptor() {
    let mut broken = boost();
    broken.factor = 0.0;
    let result = pipeline(FixedAssessor::new(RiskLevel::Low))
        .run(
            &scenario_image(),
            &[broken],
            &[TuningRequest::new("boost", 1.0, 2.0, Strategy::Eco)],
        )
        .await;
    assert!(matches!(result, Err(TuningError::InvalidDescriptor { .. })));
}

#[tokio::test]
async fn test_grid_shape_checked_before_assessment() {
    let assessor = FixedAssessor::new(RiskLevel::Low);
    let request = TuningRequest::new("boost", 100.0, 150.0, Strategy::Eco)
        .with_grid(MapGrid::from_rows(vec![vec![150.0]]));
    let result = pipeline(assessor.clone())
        .run(&scenario_image(), &[boost()], &[request])
        .await;
    assert!(matches!(result, Err(TuningError::GridShapeMismatch { .. })));
    assert_eq!(assessor.calls(), 0);
}

#[tokio::test]
async fn test_encoding_overflow_produces_no_artifact() {
    let image = scenario_image();
    let request = TuningRequest::new("boost", 100.0, 7000.0, Strategy::Manual)
        .with_grid(MapGrid::from_rows(vec![vec![7000.0, 200.0]]));
    let result = pipeline(FixedAssessor::new(RiskLevel::Low))
        .run(&image, &[boost()], &[request])
        .await;
    match result {
        Err(TuningError::EncodingOverflow { map, row, col, .. }) => {
            assert_eq!(map, "boost");
            assert_eq!((row, col), (0, 0));
        }
        other => panic!("expected overflow, got {:?}", other),
    }
    assert_eq!(&image.bytes()[4..6], &[0x03, 0xE8]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_assessor_times_out() {
    let config = PipelineConfig {
        assessment_timeout: Duration::from_millis(50),
        ..PipelineConfig::default()
    };
    let result = pipeline(Arc::new(SlowAssessor))
        .with_config(config)
        .run(
            &scenario_image(),
            &[boost()],
            &[TuningRequest::new("boost", 100.0, 101.0, Strategy::Eco)],
        )
        .await;
    match result {
        Err(err @ TuningError::RiskAssessmentTimeout { .. }) => assert!(err.is_retryable()),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_assessor_failures() {
    let request = TuningRequest::new("boost", 100.0, 101.0, Strategy::Eco);

    let unavailable = pipeline(Arc::new(FailingAssessor(AssessorError::Unavailable(
        "connection refused".into(),
    ))))
    .run(&scenario_image(), &[boost()], &[request.clone()])
    .await;
    match unavailable {
        Err(TuningError::RiskAssessmentUnavailable(reason)) => {
            assert_eq!(reason, "connection refused")
        }
        other => panic!("expected unavailable, got {:?}", other),
    }

    let timed_out = pipeline(Arc::new(FailingAssessor(AssessorError::Timeout)))
        .run(&scenario_image(), &[boost()], &[request])
        .await;
    assert!(matches!(timed_out, Err(TuningError::RiskAssessmentTimeout { .. })));
}

#[tokio::test]
async fn test_cancel_before_run() {
    let cancel = CancelSignal::new();
    cancel.cancel();
    let image = scenario_image();
    let result = pipeline(FixedAssessor::new(RiskLevel::Low))
        .run_with_cancel(
            &image,
            &[boost()],
            &[TuningRequest::new("boost", 100.0, 101.0, Strategy::Eco)],
            &cancel,
        )
        .await;
    assert!(matches!(result, Err(TuningError::Cancelled)));
    assert_eq!(&image.bytes()[4..6], &[0x03, 0xE8]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_assessment() {
    let pipeline = Arc::new(pipeline(Arc::new(SlowAssessor)));
    let cancel = CancelSignal::new();
    let image = scenario_image();

    let handle = {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        let image = image.clone();
        tokio::spawn(async move {
            pipeline
                .run_with_cancel(
                    &image,
                    &[boost()],
                    &[TuningRequest::new("boost", 100.0, 101.0, Strategy::Eco)],
                    &cancel,
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();
    let result = handle.await.unwrap();
    assert!(matches!(result, Err(TuningError::Cancelled)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_share_source() {
    let pipeline = Arc::new(pipeline(FixedAssessor::new(RiskLevel::Low)));
    let image = scenario_image();

    let mut handles = Vec::new();
    for i in 0..8u16 {
        let pipeline = Arc::clone(&pipeline);
        let image = image.clone();
        handles.push(tokio::spawn(async move {
            let value = 100.0 + i as f64;
            let request = TuningRequest::new("boost", 100.0, value, Strategy::Manual)
                .with_grid(MapGrid::from_rows(vec![vec![value, 200.0]]));
            let outcome = pipeline.run(&image, &[boost()], &[request]).await.unwrap();
            (i, outcome.into_artifact().unwrap())
        }));
    }

    for handle in handles {
        let (i, artifact) = handle.await.unwrap();
        let raw = 1000 + i * 10;
        assert_eq!(&artifact.image.bytes()[4..6], &raw.to_be_bytes());
    }
    assert_eq!(&image.bytes()[4..8], &[0x03, 0xE8, 0x07, 0xD0]);
}

#[tokio::test]
async fn test_checksum_follows_declared_family() {
    let image = scenario_image().with_declared_type("EDC17");
    let registry = ChecksumRegistry::default().with_family("edc17", ChecksumKind::Crc32);
    let request = TuningRequest::new("boost", 100.0, 101.0, Strategy::Eco);

    let artifact = pipeline(FixedAssessor::new(RiskLevel::Low))
        .with_checksums(registry)
        .run(&image, &[boost()], &[request])
        .await
        .unwrap()
        .into_artifact()
        .unwrap();

    assert_eq!(artifact.checksum, Crc32.compute(&artifact.image));
    assert_eq!(artifact.original_checksum, Crc32.compute(&image));
    assert_eq!(artifact.image.declared_type(), Some("EDC17"));
}

#[tokio::test]
async fn test_unnamed_image_gets_default_filename() {
    let image = Image::new(vec![10u8, 20]);
    let map = MapDescriptor::new("m", 0, 2, 1, ElementEncoding::U8, 1.0).unwrap();
    let artifact = pipeline(FixedAssessor::new(RiskLevel::Low))
        .run(&image, &[map], &[TuningRequest::new("m", 10.0, 11.0, Strategy::Eco)])
        .await
        .unwrap()
        .into_artifact()
        .unwrap();
    assert_eq!(artifact.filename, "tuned_ecu.bin");
    assert_eq!(artifact.image.bytes(), &[11, 22]);
}
