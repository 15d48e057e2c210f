// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, EcuTuneConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "ecutune.toml";
pub const CONFIG_PATH_ENV: &str = "ECUTUNE_CONFIG_PATH";

/// Find the ecutune configuration file
///
/// Search order:
/// 1. `ECUTUNE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./ecutune.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "ecutune configuration file '{}' not found in any of these locations:\n{}\n\nSet {} environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<EcuTuneConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: EcuTuneConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`] with search, but falls back to built-in defaults when
/// no file exists and `ECUTUNE_CONFIG_PATH` is unset.
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<EcuTuneConfig> {
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) if env::var(CONFIG_PATH_ENV).is_err() => {
            let mut config = EcuTuneConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `ECUTUNE_LOG_LEVEL` -> `system.log_level`
/// - `ECUTUNE_LOG_FORMAT` -> `system.log_format`
/// - `ECUTUNE_ASSESSMENT_TIMEOUT_MS` -> `pipeline.assessment_timeout_ms`
/// - `ECUTUNE_CHECKSUM_DEFAULT` -> `checksum.default`
/// - `ECUTUNE_SIZE_TOLERANCE` -> `image.size_tolerance`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut EcuTuneConfig) {
    if let Ok(value) = env::var("ECUTUNE_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("ECUTUNE_LOG_FORMAT") {
        config.system.log_format = value;
    }
    if let Ok(value) = env::var("ECUTUNE_ASSESSMENT_TIMEOUT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.pipeline.assessment_timeout_ms = ms;
        }
    }
    if let Ok(value) = env::var("ECUTUNE_CHECKSUM_DEFAULT") {
        config.checksum.default = value;
    }
    if let Ok(value) = env::var("ECUTUNE_SIZE_TOLERANCE") {
        if let Ok(tolerance) = value.parse::<f64>() {
            config.image.size_tolerance = tolerance;
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"log_level": "debug", "checksum_default": "crc32"}`)
pub fn apply_cli_overrides(config: &mut EcuTuneConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        config.system.log_format = value.clone();
    }
    if let Some(value) = cli_args.get("assessment_timeout_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.pipeline.assessment_timeout_ms = ms;
        }
    }
    if let Some(value) = cli_args.get("checksum_default") {
        config.checksum.default = value.clone();
    }
    if let Some(value) = cli_args.get("size_tolerance") {
        if let Ok(tolerance) = value.parse::<f64>() {
            config.image.size_tolerance = tolerance;
        }
    }
}
