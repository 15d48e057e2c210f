// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Capability traits injected into the tuning pipeline.
*/

pub mod risk_assessor;

pub use risk_assessor::{AssessorError, RiskAssessor};
