// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Strategy-dependent safe limits and risk scores.

The engine never blocks a request; it produces [`SafeLimitReport`]s that the
risk assessor and the caller use as evidence.
*/

use crate::types::SafeLimitReport;
use ecutune_structures::{Strategy, TuningRequest};

/// Scores at or above this are unsafe.
pub const RISK_THRESHOLD: f64 = 80.0;

pub const MAX_RISK_SCORE: f64 = 100.0;

pub const WITHIN_LIMITS_MESSAGE: &str = "Within acceptable limits";

pub struct SafeLimitEngine;

impl SafeLimitEngine {
    /// Highest value the strategy allows starting from `current`: `current * multiplier`.
    ///
    /// The formula is applied to negative values unchanged, so their limit
    /// lies below `current`.
    ///
    /// # Example
    /// ```
    /// use ecutune_services::SafeLimitEngine;
    /// use ecutune_structures::Strategy;
    ///
    /// assert_eq!(SafeLimitEngine::hard_limit(100.0, Strategy::Eco), 105.0);
    /// assert_eq!(SafeLimitEngine::hard_limit(-100.0, Strategy::Manual), -150.0);
    /// ```
    pub fn hard_limit(current: f64, strategy: Strategy) -> f64 {
        current * strategy.multiplier()
    }

    /// Share of the allowed headroom the request uses, 0..=100.
    ///
    /// Anything above the hard limit (or any non-finite input) scores 100.
    pub fn risk_score(current: f64, requested: f64, hard_limit: f64) -> f64 {
        if !current.is_finite() || !requested.is_finite() || !hard_limit.is_finite() {
            return MAX_RISK_SCORE;
        }
        if requested > hard_limit {
            return MAX_RISK_SCORE;
        }
        let span = hard_limit - current;
        if span <= 0.0 {
            return if requested <= current { 0.0 } else { MAX_RISK_SCORE };
        }
        ((requested - current) / span * 100.0).clamp(0.0, MAX_RISK_SCORE)
    }

    pub fn is_safe(risk_score: f64) -> bool {
        risk_score < RISK_THRESHOLD
    }

    /// Full evidence for one request.
    ///
    /// # Example
    /// ```
    /// use ecutune_services::SafeLimitEngine;
    /// use ecutune_structures::{Strategy, TuningRequest};
    ///
    /// let report = SafeLimitEngine::evaluate(&TuningRequest::new("boost", 100.0, 102.5, Strategy::Eco));
    /// assert_eq!(report.risk_score, 50.0);
    /// assert!(report.is_safe);
    /// assert_eq!(report.message, "Within acceptable limits");
    /// ```
    pub fn evaluate(request: &TuningRequest) -> SafeLimitReport {
        let hard_limit = Self::hard_limit(request.current_value, request.strategy);
        let risk_score =
            Self::risk_score(request.current_value, request.requested_value, hard_limit);
        let message = if risk_score >= MAX_RISK_SCORE {
            format!("Requested value exceeds hard limit of {}", hard_limit)
        } else {
            WITHIN_LIMITS_MESSAGE.to_string()
        };
        SafeLimitReport {
            map_name: request.map_name.clone(),
            hard_limit,
            risk_score,
            is_safe: Self::is_safe(risk_score),
            message,
        }
    }

    pub fn evaluate_all(requests: &[TuningRequest]) -> Vec<SafeLimitReport> {
        requests.iter().map(Self::evaluate).collect()
    }
}
