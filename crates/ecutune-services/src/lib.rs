// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# ecutune Service Layer

The application boundary for ECU tuning: safe-limit evidence, the risk gate
and the tuning pipeline. Transport adapters (HTTP upload handlers, the CLI,
a desktop UI) call into this crate and never touch image bytes directly.

## Architecture

```text
┌─────────────────────────────────────────────────────────────────┐
│                    TRANSPORT ADAPTERS                            │
│  HTTP handlers, ecutune CLI, ...                                 │
└────────────────────────────┬────────────────────────────────────┘
                             ↓
┌─────────────────────────────────────────────────────────────────┐
│              SERVICE LAYER (This Crate)                          │
│  • SafeLimitEngine   - hard limits and risk scores              │
│  • RiskAssessor      - injected risk judgement (trait)          │
│  • TuningPipeline    - validate, gate, patch, checksum, package │
└────────────────────────────┬────────────────────────────────────┘
                             ↓
┌─────────────────────────────────────────────────────────────────┐
│                   DATA LAYER                                     │
│  ecutune-structures, ecutune-serialization                       │
└─────────────────────────────────────────────────────────────────┘
```

## Design Principles

1. **Evidence, not decisions**: the limit engine scores, the assessor decides
2. **Only Critical blocks**: lower levels are surfaced in the artifact
3. **Copy-on-write**: the source image is never modified
4. **Error Translation**: data-layer errors become [`TuningError`]
*/

pub mod impls;
pub mod limits;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use impls::RuleBasedRiskAssessor;
pub use limits::{SafeLimitEngine, RISK_THRESHOLD};
pub use pipeline::{
    adjusted_grid, CancelSignal, PipelineConfig, PipelineState, PipelineStateMachine,
    TuningPipeline,
};
pub use traits::{AssessorError, RiskAssessor};
pub use types::*;
