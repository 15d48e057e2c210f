// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core data types for ecutune.
//!
//! - [`Image`]: immutable, cheaply shared firmware bytes plus provenance
//! - [`MapDescriptor`] / [`ElementEncoding`]: where a calibration map lives and how it is stored
//! - [`MapGrid`]: decoded physical values of one map
//! - [`TuningRequest`], [`Strategy`], [`RiskAssessment`]: the inputs and judgement of a tuning run
//! - [`MapCatalog`]: map definitions loaded from JSON
//!
//! Everything here is plain data; byte-level work lives in `ecutune-serialization`.

pub mod catalog;
mod error;
pub mod image;
pub mod map;
pub mod tuning;

pub use catalog::MapCatalog;
pub use error::EcuDataError;
pub use image::Image;
pub use map::{ElementEncoding, MapDescriptor, MapGrid};
pub use tuning::{RiskAssessment, RiskLevel, Strategy, TuningRequest};
