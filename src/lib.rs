// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ecutune - ECU calibration map tuning
//!
//! Reads calibration maps out of ECU firmware images, scores requested
//! changes against safe limits, gates them through a risk assessor and
//! packages a checksummed copy of the image. The source image is never
//! modified.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! ecutune = "0.1"
//! ```
//!
//! ```rust,no_run
//! use ecutune::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let image = Image::from_file("stock.bin")?;
//! let catalog = MapCatalog::from_file("maps.json")?;
//! let pipeline = TuningPipeline::new(Arc::new(RuleBasedRiskAssessor));
//!
//! let request = TuningRequest::new("boost_target", 1.2, 1.3, Strategy::HeavyDuty);
//! let outcome = pipeline.run(&image, catalog.descriptors(), &[request]).await?;
//! if let Some(artifact) = outcome.artifact() {
//!     std::fs::write(&artifact.filename, artifact.image.bytes())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: ecutune-structures                         │
//! │  (Image, MapDescriptor, MapGrid, TuningRequest)         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Data: ecutune-serialization                            │
//! │  (MapCodec, ImagePatch, checksums)                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Services: ecutune-services                             │
//! │  (SafeLimitEngine, RiskAssessor, TuningPipeline)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Tools: ecutune CLI (config + observability)            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub mod setup;

pub use ecutune_config as config;
pub use ecutune_observability as observability;
pub use ecutune_serialization as serialization;
pub use ecutune_services as services;
pub use ecutune_structures as structures;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::serialization::{
        compute_checksum, Checksum, ChecksumAlgorithm, ChecksumKind, ChecksumRegistry, ImagePatch,
        MapCodec,
    };
    pub use crate::services::{
        RiskAssessor, RuleBasedRiskAssessor, SafeLimitEngine, TunedArtifact, TuningError,
        TuningOutcome, TuningPipeline,
    };
    pub use crate::structures::{
        ElementEncoding, Image, MapCatalog, MapDescriptor, MapGrid, RiskAssessment, RiskLevel,
        Strategy, TuningRequest,
    };
}
