use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::risk_settings::RiskLevelSource;

/// Risk level classification, stored on positions as a tag and produced by
/// every assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Medium
    }
}

impl RiskLevel {
    /// Classification of a single position's total score.
    pub fn from_position_score(score: f64) -> Self {
        if score > 70.0 {
            RiskLevel::High
        } else if score > 40.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Classification used for sector and portfolio rollups.
    pub fn from_aggregate_score(score: f64) -> Self {
        if score > 60.0 {
            RiskLevel::High
        } else if score > 35.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Numeric stand-in used when averaging levels across a sector.
    pub fn level_score(&self) -> f64 {
        match self {
            RiskLevel::High => 80.0,
            RiskLevel::Medium => 50.0,
            RiskLevel::Low => 20.0,
        }
    }
}

/// Severity of a single risk factor. Ordered, so `max` escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Safe,
    Info,
    Warning,
    Danger,
}

impl RiskStatus {
    /// Raise to `other` if it is more severe; never lowers.
    pub fn escalate(self, other: RiskStatus) -> RiskStatus {
        self.max(other)
    }
}

/// One of the three sub-scores making up a position's risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub score: f64,
    pub status: RiskStatus,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub position_id: Uuid,
    pub stock_code: String,
    pub stock_name: String,
    pub sector: String,
    pub weight: f64,
    pub risk_level: RiskLevel,
    /// Weighted sum of the sub-scores. Not clamped.
    pub total_risk_score: f64,
    pub price_risk: RiskFactor,
    pub concentration_risk: RiskFactor,
    pub volatility_risk: RiskFactor,
    pub holding_days: i64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRisk {
    pub sector: String,
    pub total_weight: f64,
    pub avg_risk_score: f64,
    pub position_count: usize,
    pub high_risk_count: usize,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }
}

/// Portfolio-wide risk picture. Always recomputed; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub portfolio_id: Uuid,
    pub overall_risk_level: RiskLevel,
    pub weighted_risk_score: f64,
    pub risk_distribution: RiskDistribution,
    pub sector_risks: Vec<SectorRisk>,
    pub position_risks: Vec<PositionRisk>,
    pub recommendations: Vec<String>,
    pub level_source: RiskLevelSource,
    pub last_updated: DateTime<Utc>,
}
