// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Transport-agnostic Data Transfer Objects (DTOs).

These types are what a tuning run hands back to adapters. They serialize to
JSON with camelCase field names.
*/

use crate::types::errors::{TuningError, TuningResult};
use ecutune_serialization::Checksum;
use ecutune_structures::{Image, RiskAssessment};
use serde::{Deserialize, Serialize};

// ============================================================================
// SAFE LIMIT DTOs
// ============================================================================

/// Safe-limit evidence for one tuning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeLimitReport {
    pub map_name: String,
    pub hard_limit: f64,
    /// 0..=100
    pub risk_score: f64,
    pub is_safe: bool,
    pub message: String,
}

// ============================================================================
// OUTCOME DTOs
// ============================================================================

/// Result of a successful tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunedArtifact {
    /// Checksum of the tuned image
    pub checksum: Checksum,
    /// Checksum of the source image, for compare/rollback
    pub original_checksum: Checksum,
    pub image: Image,
    /// `tuned_<source filename>`, or `tuned_ecu.bin` when the source had none
    pub filename: String,
    pub risk_report: RiskAssessment,
    pub limit_reports: Vec<SafeLimitReport>,
    /// Names of the maps written, in request order
    pub patched_maps: Vec<String>,
}

/// Evidence returned when the risk gate refuses a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedTuning {
    pub assessment: RiskAssessment,
    pub limit_reports: Vec<SafeLimitReport>,
}

/// Terminal value of a tuning run that got past validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TuningOutcome {
    Packaged(TunedArtifact),
    Rejected(RejectedTuning),
}

impl TuningOutcome {
    pub fn is_packaged(&self) -> bool {
        matches!(self, TuningOutcome::Packaged(_))
    }

    pub fn artifact(&self) -> Option<&TunedArtifact> {
        match self {
            TuningOutcome::Packaged(artifact) => Some(artifact),
            TuningOutcome::Rejected(_) => None,
        }
    }

    pub fn risk_assessment(&self) -> &RiskAssessment {
        match self {
            TuningOutcome::Packaged(artifact) => &artifact.risk_report,
            TuningOutcome::Rejected(rejected) => &rejected.assessment,
        }
    }

    pub fn limit_reports(&self) -> &[SafeLimitReport] {
        match self {
            TuningOutcome::Packaged(artifact) => &artifact.limit_reports,
            TuningOutcome::Rejected(rejected) => &rejected.limit_reports,
        }
    }

    /// The artifact, or [`TuningError::CriticalRiskRejected`] for callers that prefer `?`.
    pub fn into_artifact(self) -> TuningResult<TunedArtifact> {
        match self {
            TuningOutcome::Packaged(artifact) => Ok(artifact),
            TuningOutcome::Rejected(rejected) => {
                Err(TuningError::CriticalRiskRejected(Box::new(rejected)))
            }
        }
    }
}

/// Name of the tuned file derived from the source file name.
pub fn tuned_filename(source: Option<&str>) -> String {
    match source.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("tuned_{}", name),
        None => "tuned_ecu.bin".to_string(),
    }
}
