// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::MapGrid;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

//region Strategy

/// Tuning strategy selected by the user; decides how far a value may be raised.
///
/// Parsed from the catalog names `Eco`, `Heavy Duty`, `Gasoline`, `Diesel` and
/// `Manual`. Anything else, including an absent strategy, is `Unspecified`.
///
/// # Example
/// ```
/// use ecutune_structures::Strategy;
///
/// assert_eq!(Strategy::from_name("Heavy Duty"), Strategy::HeavyDuty);
/// assert_eq!(Strategy::from_name("Stage 3"), Strategy::Unspecified);
/// assert_eq!(Strategy::Eco.multiplier(), 1.05);
/// assert_eq!(Strategy::Diesel.multiplier(), 1.20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Strategy {
    Eco,
    HeavyDuty,
    Gasoline,
    Diesel,
    Manual,
    #[default]
    Unspecified,
}

impl Strategy {
    pub fn from_name(name: &str) -> Strategy {
        match name.trim() {
            "Eco" => Strategy::Eco,
            "Heavy Duty" => Strategy::HeavyDuty,
            "Gasoline" => Strategy::Gasoline,
            "Diesel" => Strategy::Diesel,
            "Manual" => Strategy::Manual,
            _ => Strategy::Unspecified,
        }
    }

    /// Maximum increase over the current value, as a factor.
    ///
    /// Gasoline and Diesel have no factor of their own yet and use the default.
    pub const fn multiplier(&self) -> f64 {
        match self {
            Strategy::Eco => 1.05,
            Strategy::HeavyDuty => 1.15,
            Strategy::Manual => 1.50,
            Strategy::Gasoline | Strategy::Diesel | Strategy::Unspecified => 1.20,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Strategy::Eco => "Eco",
            Strategy::HeavyDuty => "Heavy Duty",
            Strategy::Gasoline => "Gasoline",
            Strategy::Diesel => "Diesel",
            Strategy::Manual => "Manual",
            Strategy::Unspecified => "Default",
        }
    }
}

impl From<String> for Strategy {
    fn from(value: String) -> Self {
        Strategy::from_name(&value)
    }
}

impl From<Strategy> for String {
    fn from(value: Strategy) -> Self {
        value.as_str().to_string()
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//endregion

//region Tuning Request

/// One proposed adjustment to one map.
///
/// `current_value` / `requested_value` describe the change as a scalar (the
/// value the user saw and the value they asked for). If `grid` is present it
/// is written as-is; otherwise the decoded map is adjusted proportionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningRequest {
    pub map_name: String,
    pub current_value: f64,
    pub requested_value: f64,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<MapGrid>,
}

impl TuningRequest {
    pub fn new(
        map_name: impl Into<String>,
        current_value: f64,
        requested_value: f64,
        strategy: Strategy,
    ) -> Self {
        TuningRequest {
            map_name: map_name.into(),
            current_value,
            requested_value,
            strategy,
            grid: None,
        }
    }

    pub fn with_grid(mut self, grid: MapGrid) -> Self {
        self.grid = Some(grid);
        self
    }
}

//endregion

//region Risk Assessment

/// Severity reported by a risk assessor. Only `Critical` stops a tuning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn blocks_tuning(&self) -> bool {
        matches!(self, RiskLevel::Critical)
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        };
        write!(f, "{name}")
    }
}

/// Judgement returned by a risk assessor for a whole batch of requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub is_safe: bool,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    pub fn new(risk_level: RiskLevel) -> Self {
        RiskAssessment {
            is_safe: !risk_level.blocks_tuning(),
            risk_level,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }
}

//endregion

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_serde_accepts_any_name() {
        let s: Strategy = serde_json::from_str("\"Heavy Duty\"").unwrap();
        assert_eq!(s, Strategy::HeavyDuty);
        let s: Strategy = serde_json::from_str("\"turbo\"").unwrap();
        assert_eq!(s, Strategy::Unspecified);
        assert_eq!(serde_json::to_string(&Strategy::HeavyDuty).unwrap(), "\"Heavy Duty\"");
    }

    #[test]
    fn test_request_without_strategy_defaults() {
        let req: TuningRequest = serde_json::from_str(
            r#"{"mapName": "boost", "currentValue": 100.0, "requestedValue": 110.0}"#,
        )
        .unwrap();
        assert_eq!(req.strategy, Strategy::Unspecified);
        assert!(req.grid.is_none());
    }

    #[test]
    fn test_only_critical_blocks() {
        assert!(!RiskLevel::Low.blocks_tuning());
        assert!(!RiskLevel::Medium.blocks_tuning());
        assert!(!RiskLevel::High.blocks_tuning());
        assert!(RiskLevel::Critical.blocks_tuning());
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_assessment_wire_names() {
        let json = r#"{"isSafe": false, "riskLevel": "High", "issues": ["EGT"], "recommendations": []}"#;
        let a: RiskAssessment = serde_json::from_str(json).unwrap();
        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(a.issues, vec!["EGT".to_string()]);
    }
}
