use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::position::ValuedPosition;

// A named grouping of holdings (e.g. "Core A-shares", "Dividend").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePortfolio {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePortfolio {
    pub name: String,
    pub description: Option<String>,
}

impl Portfolio {
    pub(crate) fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Totals and sector weights for a portfolio, computed from its positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub portfolio: Portfolio,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub position_count: usize,
    pub sector_weights: BTreeMap<String, f64>,
    pub positions: Vec<ValuedPosition>,
}

impl PortfolioSummary {
    pub fn build(portfolio: Portfolio, positions: Vec<ValuedPosition>) -> Self {
        let total_value: f64 = positions.iter().map(|p| p.market_value).sum();
        let total_cost: f64 = positions.iter().map(|p| p.position.cost_basis()).sum();
        let total_pnl = total_value - total_cost;
        let total_pnl_percent = if total_cost > 0.0 {
            total_pnl / total_cost * 100.0
        } else {
            0.0
        };

        let mut sector_weights = BTreeMap::new();
        for p in &positions {
            *sector_weights.entry(p.position.sector.clone()).or_insert(0.0) += p.weight;
        }

        Self {
            portfolio,
            total_value,
            total_cost,
            total_pnl,
            total_pnl_percent,
            position_count: positions.len(),
            sector_weights,
            positions,
        }
    }
}
