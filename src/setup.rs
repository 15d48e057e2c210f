// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Turns a loaded [`EcuTuneConfig`] into the runtime objects the pipeline
//! and the logger take.

use crate::config::EcuTuneConfig;
use crate::observability::{LogFormat, LoggingConfig};
use crate::serialization::{ChecksumKind, ChecksumRegistry};
use crate::services::PipelineConfig;
use crate::structures::EcuDataError;
use std::str::FromStr;

/// Registry with the configured default and every `[checksum.families]` entry.
///
/// # Errors
///
/// Returns the parse error for the first unknown algorithm name.
pub fn checksum_registry(config: &EcuTuneConfig) -> Result<ChecksumRegistry, EcuDataError> {
    let default = ChecksumKind::from_str(&config.checksum.default)?;
    let mut registry = ChecksumRegistry::new(default);
    for (family, algorithm) in &config.checksum.families {
        registry = registry.with_family(family, ChecksumKind::from_str(algorithm)?);
    }
    Ok(registry)
}

pub fn pipeline_config(config: &EcuTuneConfig) -> PipelineConfig {
    PipelineConfig {
        assessment_timeout: config.pipeline.assessment_timeout(),
        standard_sizes_kb: config.image.standard_sizes_kb.clone(),
        size_tolerance: config.image.size_tolerance,
    }
}

pub fn logging_config(config: &EcuTuneConfig) -> Result<LoggingConfig, String> {
    let format = LogFormat::from_str(&config.system.log_format)?;
    Ok(LoggingConfig::new(config.system.log_level.clone(), format))
}
