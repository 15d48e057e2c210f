// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Built-in capability implementations.
*/

pub mod rule_based_assessor;

pub use rule_based_assessor::RuleBasedRiskAssessor;
