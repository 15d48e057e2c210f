// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Risk assessor capability.

The pipeline never decides on its own whether a batch is too risky; it asks
an injected [`RiskAssessor`] (an AI service, a rule engine, a test double)
and gates on the returned [`RiskLevel`](ecutune_structures::RiskLevel).
*/

use async_trait::async_trait;
use ecutune_structures::{MapDescriptor, RiskAssessment, TuningRequest};
use thiserror::Error;

/// Transport-level failure of an assessor. Neither variant is a verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssessorError {
    #[error("Risk assessor unavailable: {0}")]
    Unavailable(String),

    /// The assessor gave up waiting on its own backend
    #[error("Risk assessor timed out")]
    Timeout,
}

/// Judges the risk of a whole batch of tuning requests
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    /// Assess a batch
    ///
    /// `maps[i]` is the resolved descriptor of `requests[i]`.
    ///
    /// # Errors
    /// * `AssessorError::Unavailable` - Backend could not be reached
    /// * `AssessorError::Timeout` - Backend did not answer in time
    ///
    async fn assess(
        &self,
        maps: &[MapDescriptor],
        requests: &[TuningRequest],
    ) -> Result<RiskAssessment, AssessorError>;
}
