// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
The tuning pipeline.

```text
Received ──► RiskEvaluated ──► Rejected            (Critical)
                  │
                  └──► Patching ──► Checksumming ──► Packaged
```

A run validates the batch, asks the injected [`RiskAssessor`] for a verdict,
and only then derives a new image. The source image is never modified, and
a rejected, failed or cancelled run leaves nothing behind.
*/

use crate::limits::SafeLimitEngine;
use crate::traits::{AssessorError, RiskAssessor};
use crate::types::{
    tuned_filename, RejectedTuning, TunedArtifact, TuningError, TuningOutcome, TuningResult,
};
use ecutune_serialization::{ChecksumRegistry, ImagePatch, MapCodec};
use ecutune_structures::image::{DEFAULT_SIZE_TOLERANCE, STANDARD_FLASH_SIZES_KB};
use ecutune_structures::{Image, MapDescriptor, MapGrid, RiskAssessment, TuningRequest};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_ASSESSMENT_TIMEOUT: Duration = Duration::from_secs(30);

//region State Machine

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Received,
    RiskEvaluated,
    Rejected,
    Patching,
    Checksumming,
    Packaged,
}

impl PipelineState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Rejected | PipelineState::Packaged)
    }

    pub const fn can_transition_to(&self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (PipelineState::Received, PipelineState::RiskEvaluated)
                | (PipelineState::RiskEvaluated, PipelineState::Rejected)
                | (PipelineState::RiskEvaluated, PipelineState::Patching)
                | (PipelineState::Patching, PipelineState::Checksumming)
                | (PipelineState::Checksumming, PipelineState::Packaged)
        )
    }
}

/// Tracks one run's progress and refuses out-of-order transitions.
#[derive(Debug, Clone)]
pub struct PipelineStateMachine {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl PipelineStateMachine {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Received,
            history: vec![PipelineState::Received],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state visited so far, starting with `Received`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn transition(&mut self, next: PipelineState) -> TuningResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(TuningError::IllegalStateTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(target: "ecutune-services", "[PIPELINE] {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

//endregion

//region Cancellation

/// Cooperative cancellation shared between a caller and a running pipeline.
///
/// Cloning yields a handle to the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelSignal::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = std::pin::pin!(self.inner.notify.notified());
            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

//endregion

//region Pipeline

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on the assessor call; exceeding it is `RiskAssessmentTimeout`
    pub assessment_timeout: Duration,
    /// Flash sizes (KB) the image is expected to match; a mismatch only warns
    pub standard_sizes_kb: Vec<u64>,
    pub size_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assessment_timeout: DEFAULT_ASSESSMENT_TIMEOUT,
            standard_sizes_kb: STANDARD_FLASH_SIZES_KB.to_vec(),
            size_tolerance: DEFAULT_SIZE_TOLERANCE,
        }
    }
}

/// Runs tuning batches against an injected risk assessor.
///
/// Holds no per-run state: one pipeline can be shared through an `Arc` and
/// run concurrently on the same source image.
///
/// # Example
/// ```
/// use ecutune_services::{RuleBasedRiskAssessor, TuningPipeline};
/// use ecutune_structures::{ElementEncoding, Image, MapDescriptor, Strategy, TuningRequest};
/// use std::sync::Arc;
///
/// let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
/// runtime.block_on(async {
///     let image = Image::new(vec![0, 0, 0, 0, 0x03, 0xE8, 0x07, 0xD0]).with_filename("stock.bin");
///     let boost = MapDescriptor::new("boost", 4, 2, 1, ElementEncoding::U16Be, 0.1).unwrap();
///     let pipeline = TuningPipeline::new(Arc::new(RuleBasedRiskAssessor));
///
///     let request = TuningRequest::new("boost", 100.0, 102.0, Strategy::Eco);
///     let outcome = pipeline.run(&image, &[boost], &[request]).await.unwrap();
///     let artifact = outcome.into_artifact().unwrap();
///     assert_eq!(artifact.filename, "tuned_stock.bin");
///     assert_eq!(&artifact.image.bytes()[4..6], &[0x03, 0xFC]);
/// });
/// ```
pub struct TuningPipeline {
    assessor: Arc<dyn RiskAssessor>,
    checksums: ChecksumRegistry,
    config: PipelineConfig,
}

impl TuningPipeline {
    pub fn new(assessor: Arc<dyn RiskAssessor>) -> Self {
        Self {
            assessor,
            checksums: ChecksumRegistry::default(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_checksums(mut self, checksums: ChecksumRegistry) -> Self {
        self.checksums = checksums;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn checksums(&self) -> &ChecksumRegistry {
        &self.checksums
    }

    /// Runs a batch without a cancellation signal.
    ///
    /// `maps` are the known descriptors; each request is resolved by name.
    pub async fn run(
        &self,
        image: &Image,
        maps: &[MapDescriptor],
        requests: &[TuningRequest],
    ) -> TuningResult<TuningOutcome> {
        self.run_with_cancel(image, maps, requests, &CancelSignal::new())
            .await
    }

    /// Runs a batch that `cancel` can abort.
    ///
    /// A cancel observed while waiting on the assessor, before patching or
    /// after checksumming returns [`TuningError::Cancelled`] and drops any
    /// derived image.
    pub async fn run_with_cancel(
        &self,
        image: &Image,
        maps: &[MapDescriptor],
        requests: &[TuningRequest],
        cancel: &CancelSignal,
    ) -> TuningResult<TuningOutcome> {
        let mut machine = PipelineStateMachine::new();
        debug!(
            target: "ecutune-services",
            "[PIPELINE] Received {} request(s) for {} ({} bytes)",
            requests.len(),
            image.filename().unwrap_or("<unnamed>"),
            image.len()
        );

        // Received
        let descriptors = self.resolve(image, maps, requests)?;
        let limit_reports = SafeLimitEngine::evaluate_all(requests);
        if !image.matches_flash_size(&self.config.standard_sizes_kb, self.config.size_tolerance) {
            warn!(
                target: "ecutune-services",
                "Image size {} bytes is not a standard ECU flash size",
                image.len()
            );
        }

        // RiskEvaluated
        let assessment = self.assess(&descriptors, requests, cancel).await?;
        machine.transition(PipelineState::RiskEvaluated)?;

        if assessment.risk_level.blocks_tuning() {
            machine.transition(PipelineState::Rejected)?;
            warn!(
                target: "ecutune-services",
                "Tuning rejected: {} risk, {} issue(s)",
                assessment.risk_level,
                assessment.issues.len()
            );
            return Ok(TuningOutcome::Rejected(RejectedTuning {
                assessment,
                limit_reports,
            }));
        }
        info!(
            target: "ecutune-services",
            "Risk gate passed at {} risk",
            assessment.risk_level
        );

        if cancel.is_cancelled() {
            info!(target: "ecutune-services", "Tuning cancelled before patching");
            return Err(TuningError::Cancelled);
        }

        // Patching
        machine.transition(PipelineState::Patching)?;
        let mut patch = ImagePatch::new(image);
        let mut patched_maps = Vec::with_capacity(requests.len());
        for (request, descriptor) in requests.iter().zip(&descriptors) {
            let grid = match &request.grid {
                Some(grid) => grid.clone(),
                None => adjusted_grid(&MapCodec::decode(image, descriptor)?, request),
            };
            MapCodec::write_grid(&mut patch, descriptor, &grid)?;
            patched_maps.push(descriptor.name.clone());
        }
        let tuned = patch.finish();

        // Checksumming
        machine.transition(PipelineState::Checksumming)?;
        let checksum = self.checksums.compute(&tuned);
        let original_checksum = self.checksums.compute(image);

        if cancel.is_cancelled() {
            info!(target: "ecutune-services", "Tuning cancelled, discarding derived image");
            return Err(TuningError::Cancelled);
        }

        // Packaged
        machine.transition(PipelineState::Packaged)?;
        let filename = tuned_filename(image.filename());
        info!(
            target: "ecutune-services",
            "Packaged {} with checksum {} (was {})",
            filename,
            checksum,
            original_checksum
        );
        Ok(TuningOutcome::Packaged(TunedArtifact {
            checksum,
            original_checksum,
            image: tuned,
            filename,
            risk_report: assessment,
            limit_reports,
            patched_maps,
        }))
    }

    /// Resolves every request to its descriptor and rejects batches that could not be applied.
    fn resolve(
        &self,
        image: &Image,
        maps: &[MapDescriptor],
        requests: &[TuningRequest],
    ) -> TuningResult<Vec<MapDescriptor>> {
        let mut descriptors = Vec::with_capacity(requests.len());
        for request in requests {
            let descriptor = maps
                .iter()
                .find(|m| m.name == request.map_name)
                .ok_or_else(|| TuningError::UnknownMap(request.map_name.clone()))?;
            descriptor.validate()?;
            descriptor.check_bounds(image.len())?;
            if let Some(grid) = &request.grid {
                if !grid.has_shape(descriptor.rows, descriptor.cols) {
                    return Err(TuningError::GridShapeMismatch {
                        map: descriptor.name.clone(),
                        rows: descriptor.rows,
                        cols: descriptor.cols,
                        detail: format!("got {} rows", grid.row_count()),
                    });
                }
            }
            descriptors.push(descriptor.clone());
        }

        for (i, first) in descriptors.iter().enumerate() {
            if let Some(second) = descriptors[i + 1..].iter().find(|d| first.overlaps(d)) {
                return Err(TuningError::OverlappingMapRegions {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }
        Ok(descriptors)
    }

    async fn assess(
        &self,
        maps: &[MapDescriptor],
        requests: &[TuningRequest],
        cancel: &CancelSignal,
    ) -> TuningResult<RiskAssessment> {
        let started = Instant::now();
        let call = tokio::time::timeout(
            self.config.assessment_timeout,
            self.assessor.assess(maps, requests),
        );

        tokio::select! {
            result = call => {
                let waited_ms = started.elapsed().as_millis() as u64;
                match result {
                    Ok(Ok(assessment)) => Ok(assessment),
                    Ok(Err(AssessorError::Unavailable(reason))) => {
                        warn!(target: "ecutune-services", "Risk assessor unavailable: {}", reason);
                        Err(TuningError::RiskAssessmentUnavailable(reason))
                    }
                    Ok(Err(AssessorError::Timeout)) | Err(_) => {
                        warn!(target: "ecutune-services", "Risk assessment timed out after {} ms", waited_ms);
                        Err(TuningError::RiskAssessmentTimeout { waited_ms })
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!(target: "ecutune-services", "Tuning cancelled during risk assessment");
                Err(TuningError::Cancelled)
            }
        }
    }
}

/// Applies a scalar request to every cell of the decoded map.
///
/// Cells are scaled by `requested / current`; with a zero current value the
/// difference is added instead.
pub fn adjusted_grid(current_grid: &MapGrid, request: &TuningRequest) -> MapGrid {
    if request.current_value == 0.0 {
        let delta = request.requested_value - request.current_value;
        current_grid.map_cells(|v| v + delta)
    } else {
        let ratio = request.requested_value / request.current_value;
        current_grid.map_cells(|v| v * ratio)
    }
}

//endregion
