// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ecutune-observability
//!
//! Logging infrastructure for ecutune.
//!
//! Provides consistent logging across all ecutune crates with per-crate
//! debug flag support (`--debug-ecutune-services`, `ECUTUNE_DEBUG=all`) and
//! text or JSON output.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known ecutune crate names (tracing targets) for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "ecutune",
    "ecutune-structures",
    "ecutune-serialization",
    "ecutune-services",
    "ecutune-config",
];
