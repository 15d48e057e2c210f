// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks every section and reports all problems at once rather than
//! stopping at the first one.

use crate::{ConfigError, ConfigResult, EcuTuneConfig};

/// Names accepted for `checksum.default` and `checksum.families.*`
pub const KNOWN_CHECKSUM_ALGORITHMS: [&str; 3] = ["additive-sum", "twos-complement-sum", "crc32"];

pub const KNOWN_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub const KNOWN_LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    UnknownName {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownName {
                field,
                value,
                allowed,
            } => {
                write!(
                    f,
                    "{} = '{}' is not one of: {}",
                    field,
                    value,
                    allowed.join(", ")
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &EcuTuneConfig) -> ConfigResult<()> {
    let errors = collect_validation_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every problem in `config`, in section order.
pub fn collect_validation_errors(config: &EcuTuneConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_system(config, &mut errors);
    validate_pipeline(config, &mut errors);
    validate_checksum(config, &mut errors);
    validate_image(config, &mut errors);
    errors
}

fn check_name(
    field: &str,
    value: &str,
    allowed: &[&str],
    errors: &mut Vec<ConfigValidationError>,
) {
    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim())) {
        errors.push(ConfigValidationError::UnknownName {
            field: field.to_string(),
            value: value.to_string(),
            allowed: allowed.iter().map(|a| a.to_string()).collect(),
        });
    }
}

fn validate_system(config: &EcuTuneConfig, errors: &mut Vec<ConfigValidationError>) {
    check_name("system.log_level", &config.system.log_level, &KNOWN_LOG_LEVELS, errors);
    check_name("system.log_format", &config.system.log_format, &KNOWN_LOG_FORMATS, errors);
}

fn validate_pipeline(config: &EcuTuneConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.pipeline.assessment_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "pipeline.assessment_timeout_ms".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
}

fn validate_checksum(config: &EcuTuneConfig, errors: &mut Vec<ConfigValidationError>) {
    check_name(
        "checksum.default",
        &config.checksum.default,
        &KNOWN_CHECKSUM_ALGORITHMS,
        errors,
    );
    for (family, algorithm) in &config.checksum.families {
        check_name(
            &format!("checksum.families.{}", family),
            algorithm,
            &KNOWN_CHECKSUM_ALGORITHMS,
            errors,
        );
    }
}

fn validate_image(config: &EcuTuneConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.image.standard_sizes_kb.is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "image.standard_sizes_kb".to_string(),
            reason: "must list at least one size".to_string(),
        });
    }
    if config.image.standard_sizes_kb.contains(&0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "image.standard_sizes_kb".to_string(),
            reason: "sizes must be greater than 0".to_string(),
        });
    }
    let tolerance = config.image.size_tolerance;
    if !(0.0..1.0).contains(&tolerance) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "image.size_tolerance".to_string(),
            reason: format!("must be in [0, 1), got {}", tolerance),
        });
    }
}
