use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopLossAlert {
    pub position_id: Uuid,
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    pub stop_loss: f64,
    /// Overall return against average cost, not distance from the stop price.
    pub loss_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeProfitAlert {
    pub position_id: Uuid,
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    pub take_profit: f64,
    pub profit_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAlerts {
    pub stop_loss_alerts: Vec<StopLossAlert>,
    pub take_profit_alerts: Vec<TakeProfitAlert>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceAction {
    Reduce,
    Diversify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceSuggestion {
    pub action: RebalanceAction,
    /// Stock code for `reduce`, sector label for `diversify`.
    pub target: String,
    pub position_id: Option<Uuid>,
    pub current_weight: f64,
    pub suggested_weight: f64,
    pub reason: String,
}
