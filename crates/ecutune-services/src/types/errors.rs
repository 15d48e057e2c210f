// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Service layer error types.

Transport-agnostic errors that adapters map to HTTP status codes, CLI exit
codes or UI messages via [`TuningError::class`].
*/

use crate::pipeline::PipelineState;
use crate::types::dtos::RejectedTuning;
use ecutune_structures::{EcuDataError, ElementEncoding};
use thiserror::Error;

/// How a caller should react to a [`TuningError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Nothing is wrong with the request; running it again may succeed
    Retryable,
    /// The request itself is wrong and will fail the same way again
    InvalidRequest,
    /// The request was judged too risky to apply
    Denied,
    /// Data-layer failure or broken invariant inside the pipeline
    Internal,
}

/// Errors produced by a tuning run
#[derive(Error, Debug, Clone)]
pub enum TuningError {
    /// A requested map does not fit inside the image (400 in HTTP)
    #[error("Map '{map}' at 0x{address:X} spans {span} bytes but the image holds only {image_len}")]
    AddressOutOfBounds {
        map: String,
        address: usize,
        span: usize,
        image_len: usize,
    },

    /// A new cell value does not fit the map's element encoding
    #[error("Map '{map}' cell [{row}][{col}]: value {value} does not fit {encoding}")]
    EncodingOverflow {
        map: String,
        row: usize,
        col: usize,
        value: f64,
        encoding: ElementEncoding,
    },

    #[error("Map '{map}' expects a {rows}x{cols} grid: {detail}")]
    GridShapeMismatch {
        map: String,
        rows: usize,
        cols: usize,
        detail: String,
    },

    #[error("Invalid descriptor '{map}': {reason}")]
    InvalidDescriptor { map: String, reason: String },

    /// A request names a map that is not in the supplied descriptors (404 in HTTP)
    #[error("Unknown map: '{0}'")]
    UnknownMap(String),

    /// Two requests in one batch touch the same bytes
    #[error("Maps '{first}' and '{second}' cover overlapping bytes")]
    OverlappingMapRegions { first: String, second: String },

    /// The assessor did not answer in time; the risk is undetermined
    #[error("Risk assessment timed out after {waited_ms} ms")]
    RiskAssessmentTimeout { waited_ms: u64 },

    #[error("Risk assessment unavailable: {0}")]
    RiskAssessmentUnavailable(String),

    #[error("Tuning run cancelled")]
    Cancelled,

    /// The gate refused the batch; carries the same evidence as the rejected outcome
    #[error("Tuning rejected at {} risk", .0.assessment.risk_level)]
    CriticalRiskRejected(Box<RejectedTuning>),

    /// Catalog/image loading problems surfaced through the service layer
    #[error("Data error: {0}")]
    Data(String),

    #[error("Illegal pipeline transition {from:?} -> {to:?}")]
    IllegalStateTransition { from: PipelineState, to: PipelineState },
}

impl TuningError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TuningError::RiskAssessmentTimeout { .. }
            | TuningError::RiskAssessmentUnavailable(_)
            | TuningError::Cancelled => ErrorClass::Retryable,
            TuningError::CriticalRiskRejected(_) => ErrorClass::Denied,
            TuningError::IllegalStateTransition { .. } | TuningError::Data(_) => {
                ErrorClass::Internal
            }
            TuningError::AddressOutOfBounds { .. }
            | TuningError::EncodingOverflow { .. }
            | TuningError::GridShapeMismatch { .. }
            | TuningError::InvalidDescriptor { .. }
            | TuningError::UnknownMap(_)
            | TuningError::OverlappingMapRegions { .. } => ErrorClass::InvalidRequest,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }
}

/// Result type for tuning operations
pub type TuningResult<T> = Result<T, TuningError>;

// ============================================================================
// ERROR CONVERSIONS FROM DATA LAYER
// ============================================================================

impl From<EcuDataError> for TuningError {
    fn from(err: EcuDataError) -> Self {
        match err {
            EcuDataError::AddressOutOfBounds {
                map,
                address,
                span,
                image_len,
            } => TuningError::AddressOutOfBounds {
                map,
                address,
                span,
                image_len,
            },
            EcuDataError::EncodingOverflow {
                map,
                row,
                col,
                value,
                encoding,
            } => TuningError::EncodingOverflow {
                map,
                row,
                col,
                value,
                encoding,
            },
            EcuDataError::GridShapeMismatch {
                map,
                rows,
                cols,
                detail,
            } => TuningError::GridShapeMismatch {
                map,
                rows,
                cols,
                detail,
            },
            EcuDataError::InvalidDescriptor { map, reason } => {
                TuningError::InvalidDescriptor { map, reason }
            }
            other => TuningError::Data(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_errors_keep_their_fields() {
        let err: TuningError = EcuDataError::AddressOutOfBounds {
            map: "boost".into(),
            address: 14,
            span: 4,
            image_len: 16,
        }
        .into();
        match err {
            TuningError::AddressOutOfBounds { map, span, .. } => {
                assert_eq!(map, "boost");
                assert_eq!(span, 4);
            }
            other => panic!("unexpected {:?}", other),
        }

        let err: TuningError = EcuDataError::FileNotFound("a.bin".into()).into();
        assert!(matches!(err, TuningError::Data(_)));
        assert_eq!(err.class(), ErrorClass::Internal);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_classes() {
        assert!(TuningError::RiskAssessmentTimeout { waited_ms: 10 }.is_retryable());
        assert!(TuningError::Cancelled.is_retryable());
        assert_eq!(
            TuningError::UnknownMap("x".into()).class(),
            ErrorClass::InvalidRequest
        );
        assert_eq!(
            TuningError::OverlappingMapRegions {
                first: "a".into(),
                second: "b".into()
            }
            .class(),
            ErrorClass::InvalidRequest
        );
        assert_eq!(
            TuningError::IllegalStateTransition {
                from: PipelineState::Received,
                to: PipelineState::Packaged
            }
            .class(),
            ErrorClass::Internal
        );
    }
}
