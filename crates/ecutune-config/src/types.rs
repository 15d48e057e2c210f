// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `ecutune.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EcuTuneConfig {
    pub system: SystemConfig,
    pub pipeline: PipelineSettings,
    pub checksum: ChecksumConfig,
    pub image: ImageConfig,
}

/// System-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
    /// "text" or "json"
    pub log_format: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// Tuning pipeline configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Upper bound on one risk assessor call
    pub assessment_timeout_ms: u64,
}

impl PipelineSettings {
    pub fn assessment_timeout(&self) -> Duration {
        Duration::from_millis(self.assessment_timeout_ms)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            assessment_timeout_ms: 30_000,
        }
    }
}

/// Checksum algorithm selection
///
/// ```toml
/// [checksum]
/// default = "additive-sum"
///
/// [checksum.families]
/// edc17 = "crc32"
/// me7 = "twos-complement-sum"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChecksumConfig {
    pub default: String,
    /// ECU family (declared image type) -> algorithm name
    pub families: BTreeMap<String, String>,
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        Self {
            default: "additive-sum".to_string(),
            families: BTreeMap::new(),
        }
    }
}

/// Firmware image expectations
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageConfig {
    pub standard_sizes_kb: Vec<u64>,
    /// Allowed relative deviation from a standard size
    pub size_tolerance: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            standard_sizes_kb: vec![512, 1024, 2048, 4096],
            size_tolerance: 0.05,
        }
    }
}
