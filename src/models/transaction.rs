use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::position::Position;
use super::risk::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

// A buy or sell that has been applied to the portfolio's holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub stock_code: String,
    pub stock_name: String,
    pub sector: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub note: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub stock_code: String,
    pub stock_name: String,
    pub sector: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub fee: Option<f64>,
    pub note: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
    /// Risk tag for a position opened by this trade.
    pub risk_level: Option<RiskLevel>,
}

impl Transaction {
    pub(crate) fn new(portfolio_id: Uuid, input: CreateTransaction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            portfolio_id,
            stock_code: input.stock_code.trim().to_string(),
            stock_name: input.stock_name.trim().to_string(),
            sector: input.sector,
            side: input.side,
            quantity: input.quantity,
            price: input.price,
            fee: input.fee.unwrap_or(0.0),
            note: input.note,
            executed_at: input.executed_at.unwrap_or(now),
            created_at: now,
        }
    }
}

/// Result of recording a trade: the ledger entry plus the position it left
/// behind (`None` when a sell closed the position).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    pub transaction: Transaction,
    pub position: Option<Position>,
    pub position_closed: bool,
}
