use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::{RebalanceSuggestion, TriggerAlerts};
use super::portfolio::PortfolioSummary;
use super::risk::RiskAssessment;

/// Everything the dashboard shows for one portfolio, built from a single
/// load of its positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub summary: PortfolioSummary,
    pub risk: RiskAssessment,
    pub alerts: TriggerAlerts,
    pub rebalance_suggestions: Vec<RebalanceSuggestion>,
    pub generated_at: DateTime<Utc>,
}
