// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
ecutune command line tool

Decodes calibration maps, computes image checksums, scores requested
changes against safe limits and runs the full tuning pipeline.

Usage:
  cargo run --bin ecutune -- decode --image stock.bin --catalog maps.json --map boost_target
  cargo run --bin ecutune -- checksum --image stock.bin --declared-type EDC17
  cargo run --bin ecutune -- limits --current 1.2 --requested 1.3 --strategy Eco
  cargo run --bin ecutune -- tune --image stock.bin --catalog maps.json --requests requests.json --output out/

Results are printed to stdout as JSON; logs go to stderr.
*/

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ecutune::config::{load_config, load_config_or_default, validate_config, EcuTuneConfig};
use ecutune::observability::{init_logging, CrateDebugFlags, DEBUG_ENV};
use ecutune::prelude::*;
use ecutune::services::CancelSignal;
use ecutune::setup;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// Exit status for a batch the risk gate refused
const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "ecutune", about = "ECU calibration map tuning", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to ecutune.toml (searched for when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// text or json
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Default checksum algorithm (additive-sum, twos-complement-sum, crc32)
    #[arg(long, global = true)]
    checksum_default: Option<String>,

    /// Raise one crate to debug level, e.g. `--debug ecutune-services` (repeatable)
    #[arg(long = "debug", value_name = "CRATE", global = true)]
    debug_crates: Vec<String>,

    #[arg(long, global = true)]
    debug_all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one map from the image as a grid of physical values
    Decode {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        map: String,
    },
    /// Print the checksum of an image
    Checksum {
        #[arg(long)]
        image: PathBuf,
        /// ECU family used to pick the algorithm
        #[arg(long)]
        declared_type: Option<String>,
    },
    /// Score one requested change against its hard limit
    Limits {
        #[arg(long, default_value = "limit")]
        map: String,
        #[arg(long, allow_hyphen_values = true)]
        current: f64,
        #[arg(long, allow_hyphen_values = true)]
        requested: f64,
        #[arg(long, default_value = "Default")]
        strategy: String,
    },
    /// Validate, risk-gate, patch and checksum a batch of requests
    Tune {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        catalog: PathBuf,
        /// JSON array of tuning requests
        #[arg(long)]
        requests: PathBuf,
        #[arg(long)]
        declared_type: Option<String>,
        /// Directory the tuned image is written to
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
}

impl GlobalArgs {
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(level) = &self.log_level {
            overrides.insert("log_level".to_string(), level.clone());
        }
        if let Some(format) = &self.log_format {
            overrides.insert("log_format".to_string(), format.clone());
        }
        if let Some(algorithm) = &self.checksum_default {
            overrides.insert("checksum_default".to_string(), algorithm.clone());
        }
        overrides
    }

    fn debug_flags(&self) -> CrateDebugFlags {
        let mut flags = CrateDebugFlags::default();
        if self.debug_all {
            flags.enable_all();
        }
        for crate_name in &self.debug_crates {
            flags.enable(crate_name);
        }
        if let Ok(value) = std::env::var(DEBUG_ENV) {
            flags.merge_env_value(&value);
        }
        flags
    }

    fn load_config(&self) -> Result<EcuTuneConfig> {
        let overrides = self.overrides();
        let config = match &self.config {
            Some(path) => load_config(Some(path), Some(&overrides)),
            None => load_config_or_default(Some(&overrides)),
        }
        .context("Failed to load configuration")?;
        validate_config(&config)?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.global.load_config()?;
    let logging = setup::logging_config(&config).map_err(anyhow::Error::msg)?;
    init_logging(&cli.global.debug_flags(), &logging)?;

    match cli.command {
        Commands::Decode {
            image,
            catalog,
            map,
        } => decode(&image, &catalog, &map),
        Commands::Checksum {
            image,
            declared_type,
        } => checksum(&config, &image, declared_type),
        Commands::Limits {
            map,
            current,
            requested,
            strategy,
        } => limits(map, current, requested, &strategy),
        Commands::Tune {
            image,
            catalog,
            requests,
            declared_type,
            output,
        } => tune(&config, &image, &catalog, &requests, declared_type, &output),
    }
}

fn load_image(path: &Path, declared_type: Option<String>) -> Result<Image> {
    let image = Image::from_file(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(match declared_type {
        Some(declared_type) => image.with_declared_type(declared_type),
        None => image,
    })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn decode(image_path: &Path, catalog_path: &Path, map: &str) -> Result<ExitCode> {
    let image = load_image(image_path, None)?;
    let catalog = MapCatalog::from_file(catalog_path)
        .with_context(|| format!("Failed to read catalog {}", catalog_path.display()))?;
    let Some(descriptor) = catalog.get(map) else {
        bail!("Map '{}' is not in {}", map, catalog_path.display());
    };

    let grid = MapCodec::decode(&image, descriptor)?;
    print_json(&json!({
        "map": descriptor.name,
        "address": format!("0x{:X}", descriptor.address),
        "encoding": descriptor.encoding,
        "factor": descriptor.factor,
        "grid": grid,
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn checksum(
    config: &EcuTuneConfig,
    image_path: &Path,
    declared_type: Option<String>,
) -> Result<ExitCode> {
    let registry = setup::checksum_registry(config)?;
    let image = load_image(image_path, declared_type)?;
    let algorithm = registry.algorithm_for(&image);

    print_json(&json!({
        "algorithm": algorithm.name(),
        "checksum": algorithm.compute(&image),
        "size": image.len(),
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn limits(map: String, current: f64, requested: f64, strategy: &str) -> Result<ExitCode> {
    let request = TuningRequest::new(map, current, requested, Strategy::from_name(strategy));
    let report = SafeLimitEngine::evaluate(&request);
    print_json(&serde_json::to_value(&report)?)?;
    Ok(ExitCode::SUCCESS)
}

fn tune(
    config: &EcuTuneConfig,
    image_path: &Path,
    catalog_path: &Path,
    requests_path: &Path,
    declared_type: Option<String>,
    output: &Path,
) -> Result<ExitCode> {
    let image = load_image(image_path, declared_type)?;
    let catalog = MapCatalog::from_file(catalog_path)
        .with_context(|| format!("Failed to read catalog {}", catalog_path.display()))?;
    let requests_json = std::fs::read_to_string(requests_path)
        .with_context(|| format!("Failed to read requests {}", requests_path.display()))?;
    let requests: Vec<TuningRequest> =
        serde_json::from_str(&requests_json).context("Invalid tuning requests")?;

    let pipeline = TuningPipeline::new(Arc::new(RuleBasedRiskAssessor))
        .with_checksums(setup::checksum_registry(config)?)
        .with_config(setup::pipeline_config(config));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let outcome = runtime.block_on(async {
        let cancel = CancelSignal::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: "ecutune", "Interrupted, cancelling tuning run");
                on_interrupt.cancel();
            }
        });
        pipeline
            .run_with_cancel(&image, catalog.descriptors(), &requests, &cancel)
            .await
    })?;

    match outcome {
        TuningOutcome::Packaged(artifact) => {
            std::fs::create_dir_all(output)?;
            let path = output.join(&artifact.filename);
            std::fs::write(&path, artifact.image.bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(target: "ecutune", "Wrote tuned image to {}", path.display());

            print_json(&json!({
                "outcome": "packaged",
                "path": path.display().to_string(),
                "checksum": artifact.checksum,
                "originalChecksum": artifact.original_checksum,
                "patchedMaps": artifact.patched_maps,
                "riskReport": artifact.risk_report,
                "limitReports": artifact.limit_reports,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        rejected @ TuningOutcome::Rejected(_) => {
            print_json(&serde_json::to_value(&rejected)?)?;
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}
