// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Local risk assessor built only from safe-limit evidence.

Used when no external assessor is wired (CLI, offline tooling).
*/

use crate::limits::{SafeLimitEngine, MAX_RISK_SCORE, RISK_THRESHOLD};
use crate::traits::{AssessorError, RiskAssessor};
use crate::types::SafeLimitReport;
use async_trait::async_trait;
use ecutune_structures::{MapDescriptor, RiskAssessment, RiskLevel, TuningRequest};
use tracing::debug;

const MEDIUM_RISK_SCORE: f64 = 50.0;

/// Maps the highest risk score of a batch onto a [`RiskLevel`]:
/// 100 is Critical, 80 High, 50 Medium, anything lower Low.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedRiskAssessor;

impl RuleBasedRiskAssessor {
    pub fn new() -> Self {
        RuleBasedRiskAssessor
    }

    pub fn level_for_score(score: f64) -> RiskLevel {
        if score >= MAX_RISK_SCORE {
            RiskLevel::Critical
        } else if score >= RISK_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_RISK_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn assess_reports(reports: &[SafeLimitReport]) -> RiskAssessment {
        let max_score = reports
            .iter()
            .map(|r| r.risk_score)
            .fold(0.0, f64::max);

        let mut assessment = RiskAssessment::new(Self::level_for_score(max_score));
        for report in reports.iter().filter(|r| !r.is_safe) {
            assessment = assessment
                .with_issue(format!(
                    "{}: risk score {:.0} ({})",
                    report.map_name, report.risk_score, report.message
                ))
                .with_recommendation(format!(
                    "Keep {} below its hard limit of {}",
                    report.map_name, report.hard_limit
                ));
        }
        assessment.is_safe = reports.iter().all(|r| r.is_safe);
        assessment
    }
}

#[async_trait]
impl RiskAssessor for RuleBasedRiskAssessor {
    async fn assess(
        &self,
        _maps: &[MapDescriptor],
        requests: &[TuningRequest],
    ) -> Result<RiskAssessment, AssessorError> {
        let reports = SafeLimitEngine::evaluate_all(requests);
        let assessment = Self::assess_reports(&reports);
        debug!(
            target: "ecutune-services",
            "Rule-based assessment of {} request(s): {}",
            requests.len(),
            assessment.risk_level
        );
        Ok(assessment)
    }
}
