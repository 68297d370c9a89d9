use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::risk::RiskLevel;

// Current holding of one stock within a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub stock_code: String,
    pub stock_name: String,
    pub sector: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub current_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_level: RiskLevel,
    pub last_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePosition {
    pub stock_code: String,
    pub stock_name: String,
    pub sector: String,
    pub quantity: f64,
    pub avg_cost: f64,
    /// Defaults to `avg_cost` when omitted.
    pub current_price: Option<f64>,
    /// Derived from the portfolio's risk settings when omitted.
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePosition {
    pub stock_name: Option<String>,
    pub quantity: Option<f64>,
    pub avg_cost: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPrice {
    pub stock_code: String,
    pub price: f64,
}

impl Position {
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_cost
    }

    /// Returns a copy with the provided fields replaced.
    pub fn apply(&self, update: &UpdatePosition) -> Self {
        Self {
            stock_name: update.stock_name.clone().unwrap_or_else(|| self.stock_name.clone()),
            quantity: update.quantity.unwrap_or(self.quantity),
            avg_cost: update.avg_cost.unwrap_or(self.avg_cost),
            stop_loss: update.stop_loss.unwrap_or(self.stop_loss),
            take_profit: update.take_profit.unwrap_or(self.take_profit),
            risk_level: update.risk_level.unwrap_or(self.risk_level),
            ..self.clone()
        }
    }
}

/// A position together with the figures derived from its portfolio context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuedPosition {
    #[serde(flatten)]
    pub position: Position,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
    /// Share of the portfolio's total market value, 0..1.
    pub weight: f64,
}

impl ValuedPosition {
    /// Values every position against the combined market value of the slice.
    pub fn value_all(positions: Vec<Position>) -> Vec<ValuedPosition> {
        let total_value: f64 = positions.iter().map(Position::market_value).sum();

        positions
            .into_iter()
            .map(|position| {
                let market_value = position.market_value();
                let cost = position.cost_basis();
                let unrealized_pnl = market_value - cost;
                let unrealized_pnl_percent = if cost != 0.0 {
                    unrealized_pnl / cost * 100.0
                } else {
                    0.0
                };
                let weight = if total_value > 0.0 {
                    market_value / total_value
                } else {
                    0.0
                };
                ValuedPosition {
                    position,
                    market_value,
                    unrealized_pnl,
                    unrealized_pnl_percent,
                    weight,
                }
            })
            .collect()
    }
}
