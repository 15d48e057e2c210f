// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::map::ElementEncoding;
use thiserror::Error;

/// Common error type for ecutune data operations.
///
/// Covers descriptor validation, byte-level decoding/encoding of calibration
/// maps and loading of images and map catalogs.
///
/// # Examples
/// ```
/// use ecutune_structures::EcuDataError;
///
/// fn validate_rows(rows: usize) -> Result<(), EcuDataError> {
///     if rows == 0 {
///         return Err(EcuDataError::BadParameters("Rows must be > 0".into()));
///     }
///     Ok(())
/// }
///
/// assert!(validate_rows(0).is_err());
/// assert!(validate_rows(5).is_ok());
/// ```
#[derive(Error, Debug)]
pub enum EcuDataError {
    /// The descriptor's byte range does not fit inside the image
    #[error("Map '{map}' at 0x{address:X} spans {span} bytes but the image holds only {image_len}")]
    AddressOutOfBounds {
        map: String,
        address: usize,
        span: usize,
        image_len: usize,
    },

    /// A physical value does not fit the element width after unscaling and rounding
    #[error("Map '{map}' cell [{row}][{col}]: value {value} does not fit {encoding}")]
    EncodingOverflow {
        map: String,
        row: usize,
        col: usize,
        value: f64,
        encoding: ElementEncoding,
    },

    /// A grid handed to the encoder does not match the descriptor dimensions
    #[error("Map '{map}' expects a {rows}x{cols} grid: {detail}")]
    GridShapeMismatch {
        map: String,
        rows: usize,
        cols: usize,
        detail: String,
    },

    /// Descriptor fields are unusable (non-positive factor, empty name, ...)
    #[error("Invalid descriptor '{map}': {reason}")]
    InvalidDescriptor { map: String, reason: String },

    /// Failed to deserialize catalog or descriptor data
    #[error("Failed to deserialize: {0}")]
    DeserializationError(String),

    /// Invalid parameters provided to a function
    #[error("Bad parameters: {0}")]
    BadParameters(String),

    #[error("ECU file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EcuDataError {
    fn from(err: serde_json::Error) -> Self {
        EcuDataError::DeserializationError(err.to_string())
    }
}
