use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_STOP_LOSS_PERCENT: f64 = 0.10;
pub const DEFAULT_TAKE_PROFIT_PERCENT: f64 = 0.20;

/// Which risk level feeds the distribution counts and sector rollups:
/// the tag stored on each position, or the level the scorer just assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RiskLevelSource {
    Stored,
    Assessed,
}

impl Default for RiskLevelSource {
    fn default() -> Self {
        RiskLevelSource::Stored
    }
}

/// Per-portfolio trading discipline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RiskSettings {
    pub portfolio_id: Uuid,
    /// Fraction below average cost at which a new position's stop-loss sits.
    pub stop_loss_percent: f64,
    /// Fraction above average cost at which a new position's take-profit sits.
    pub take_profit_percent: f64,
    pub risk_level_source: RiskLevelSource,
    pub updated_at: DateTime<Utc>,
}

impl RiskSettings {
    pub fn defaults_for(portfolio_id: Uuid) -> Self {
        Self {
            portfolio_id,
            stop_loss_percent: DEFAULT_STOP_LOSS_PERCENT,
            take_profit_percent: DEFAULT_TAKE_PROFIT_PERCENT,
            risk_level_source: RiskLevelSource::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn stop_loss_price(&self, avg_cost: f64) -> f64 {
        avg_cost * (1.0 - self.stop_loss_percent)
    }

    pub fn take_profit_price(&self, avg_cost: f64) -> f64 {
        avg_cost * (1.0 + self.take_profit_percent)
    }

    /// Returns a copy with the provided fields replaced.
    pub fn apply(&self, update: &UpdateRiskSettings) -> Self {
        Self {
            portfolio_id: self.portfolio_id,
            stop_loss_percent: update.stop_loss_percent.unwrap_or(self.stop_loss_percent),
            take_profit_percent: update.take_profit_percent.unwrap_or(self.take_profit_percent),
            risk_level_source: update.risk_level_source.unwrap_or(self.risk_level_source),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRiskSettings {
    pub stop_loss_percent: Option<f64>,
    pub take_profit_percent: Option<f64>,
    pub risk_level_source: Option<RiskLevelSource>,
}

impl UpdateRiskSettings {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(stop) = self.stop_loss_percent {
            if !(stop > 0.0 && stop < 1.0) {
                return Err("stopLossPercent must be between 0 and 1 (exclusive)".to_string());
            }
        }
        if let Some(take) = self.take_profit_percent {
            if !(take > 0.0 && take.is_finite()) {
                return Err("takeProfitPercent must be greater than 0".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_from_avg_cost() {
        let settings = RiskSettings::defaults_for(Uuid::new_v4());
        assert!((settings.stop_loss_price(180.5) - 162.45).abs() < 1e-9);
        assert!((settings.take_profit_price(180.5) - 216.6).abs() < 1e-9);
    }

    #[test]
    fn test_update_validation() {
        let bad_stop = UpdateRiskSettings {
            stop_loss_percent: Some(1.0),
            ..Default::default()
        };
        assert!(bad_stop.validate().is_err());

        let bad_take = UpdateRiskSettings {
            take_profit_percent: Some(0.0),
            ..Default::default()
        };
        assert!(bad_take.validate().is_err());

        let ok = UpdateRiskSettings {
            stop_loss_percent: Some(0.08),
            take_profit_percent: Some(0.3),
            risk_level_source: Some(RiskLevelSource::Assessed),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let settings = RiskSettings::defaults_for(Uuid::new_v4());
        let updated = settings.apply(&UpdateRiskSettings {
            risk_level_source: Some(RiskLevelSource::Assessed),
            ..Default::default()
        });
        assert_eq!(updated.stop_loss_percent, DEFAULT_STOP_LOSS_PERCENT);
        assert_eq!(updated.take_profit_percent, DEFAULT_TAKE_PROFIT_PERCENT);
        assert_eq!(updated.risk_level_source, RiskLevelSource::Assessed);
    }
}
