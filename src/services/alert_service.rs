use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, RiskError};
use crate::models::{
    RebalanceAction, RebalanceSuggestion, StopLossAlert, TakeProfitAlert, TriggerAlerts,
    ValuedPosition,
};
use crate::services::{position_service, risk_service};

const POSITION_WEIGHT_CAP: f64 = 0.2;
const POSITION_TARGET_WEIGHT: f64 = 0.15;
const SECTOR_WEIGHT_CAP: f64 = 0.4;
const SECTOR_TARGET_WEIGHT: f64 = 0.3;

/// Check every position of a portfolio against its stop-loss and take-profit prices.
pub async fn check_alerts(pool: &SqlitePool, portfolio_id: Uuid) -> Result<TriggerAlerts, AppError> {
    let positions = position_service::list_valued(pool, portfolio_id).await?;
    let alerts = scan_price_triggers(&positions, Utc::now())?;

    info!(
        "Portfolio {}: {} stop-loss and {} take-profit alerts",
        portfolio_id,
        alerts.stop_loss_alerts.len(),
        alerts.take_profit_alerts.len()
    );
    Ok(alerts)
}

pub async fn rebalance_suggestions(
    pool: &SqlitePool,
    portfolio_id: Uuid,
) -> Result<Vec<RebalanceSuggestion>, AppError> {
    let positions = position_service::list_valued(pool, portfolio_id).await?;
    Ok(suggest_rebalance(&positions))
}

/// Single pass over the positions. The two checks are independent, so a
/// position whose stop-loss sits above its take-profit can raise both.
pub fn scan_price_triggers(
    positions: &[ValuedPosition],
    now: DateTime<Utc>,
) -> Result<TriggerAlerts, RiskError> {
    let mut stop_loss_alerts = Vec::new();
    let mut take_profit_alerts = Vec::new();

    for p in positions {
        risk_service::validate_position(p)?;
        let pos = &p.position;
        let return_percent = (pos.current_price - pos.avg_cost) / pos.avg_cost * 100.0;

        if pos.current_price <= pos.stop_loss {
            stop_loss_alerts.push(StopLossAlert {
                position_id: pos.id,
                stock_code: pos.stock_code.clone(),
                stock_name: pos.stock_name.clone(),
                current_price: pos.current_price,
                stop_loss: pos.stop_loss,
                loss_percent: return_percent,
            });
        }

        if pos.current_price >= pos.take_profit {
            take_profit_alerts.push(TakeProfitAlert {
                position_id: pos.id,
                stock_code: pos.stock_code.clone(),
                stock_name: pos.stock_name.clone(),
                current_price: pos.current_price,
                take_profit: pos.take_profit,
                profit_percent: return_percent,
            });
        }
    }

    Ok(TriggerAlerts {
        stop_loss_alerts,
        take_profit_alerts,
        checked_at: now,
    })
}

/// Flag oversized positions and sectors. Target weights are fixed caps, not
/// the output of any optimizer.
pub fn suggest_rebalance(positions: &[ValuedPosition]) -> Vec<RebalanceSuggestion> {
    let mut suggestions = Vec::new();

    for p in positions {
        if p.weight > POSITION_WEIGHT_CAP {
            suggestions.push(RebalanceSuggestion {
                action: RebalanceAction::Reduce,
                target: p.position.stock_code.clone(),
                position_id: Some(p.position.id),
                current_weight: p.weight,
                suggested_weight: POSITION_TARGET_WEIGHT,
                reason: format!(
                    "{} is {:.1}% of the portfolio, above the {:.0}% single-position cap",
                    p.position.stock_name,
                    p.weight * 100.0,
                    POSITION_WEIGHT_CAP * 100.0
                ),
            });
        }
    }

    let mut sector_weights: Vec<(&str, f64)> = Vec::new();
    for p in positions {
        let sector = p.position.sector.as_str();
        match sector_weights.iter_mut().find(|(name, _)| *name == sector) {
            Some((_, weight)) => *weight += p.weight,
            None => sector_weights.push((sector, p.weight)),
        }
    }

    for (sector, weight) in sector_weights {
        if weight > SECTOR_WEIGHT_CAP {
            suggestions.push(RebalanceSuggestion {
                action: RebalanceAction::Diversify,
                target: sector.to_string(),
                position_id: None,
                current_weight: weight,
                suggested_weight: SECTOR_TARGET_WEIGHT,
                reason: format!(
                    "{} holdings make up {:.1}% of the portfolio, above the {:.0}% sector cap",
                    sector,
                    weight * 100.0,
                    SECTOR_WEIGHT_CAP * 100.0
                ),
            });
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, RiskLevel};

    fn holding(
        code: &str,
        sector: &str,
        avg_cost: f64,
        current_price: f64,
        stop_loss: f64,
        take_profit: f64,
        weight: f64,
    ) -> ValuedPosition {
        let now = Utc::now();
        let position = Position {
            id: Uuid::new_v4(),
            portfolio_id: Uuid::nil(),
            stock_code: code.to_string(),
            stock_name: format!("Stock {}", code),
            sector: sector.to_string(),
            quantity: 100.0,
            avg_cost,
            current_price,
            stop_loss,
            take_profit,
            risk_level: RiskLevel::Medium,
            last_update: now,
            created_at: now,
        };
        ValuedPosition {
            market_value: position.market_value(),
            unrealized_pnl: position.market_value() - position.cost_basis(),
            unrealized_pnl_percent: 0.0,
            position,
            weight,
        }
    }

    #[test]
    fn test_reference_position_raises_nothing() {
        let positions = vec![holding("000858", "消费", 180.5, 185.2, 162.45, 216.6, 0.148)];
        let alerts = scan_price_triggers(&positions, Utc::now()).unwrap();
        assert!(alerts.stop_loss_alerts.is_empty());
        assert!(alerts.take_profit_alerts.is_empty());
        assert!(suggest_rebalance(&positions).is_empty());
    }

    #[test]
    fn test_price_exactly_at_thresholds_triggers() {
        let positions = vec![
            holding("600036", "金融", 40.0, 36.0, 36.0, 48.0, 0.1),
            holding("300750", "新能源", 200.0, 240.0, 180.0, 240.0, 0.1),
        ];
        let alerts = scan_price_triggers(&positions, Utc::now()).unwrap();

        assert_eq!(alerts.stop_loss_alerts.len(), 1);
        let stop = &alerts.stop_loss_alerts[0];
        assert_eq!(stop.stock_code, "600036");
        // overall return on cost, not distance from the stop price
        assert!((stop.loss_percent - (-10.0)).abs() < 1e-9);

        assert_eq!(alerts.take_profit_alerts.len(), 1);
        let take = &alerts.take_profit_alerts[0];
        assert_eq!(take.stock_code, "300750");
        assert!((take.profit_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_misconfigured_thresholds_raise_both_alerts() {
        // stop loss above take profit
        let positions = vec![holding("601318", "金融", 50.0, 50.0, 55.0, 45.0, 0.1)];
        let alerts = scan_price_triggers(&positions, Utc::now()).unwrap();
        assert_eq!(alerts.stop_loss_alerts.len(), 1);
        assert_eq!(alerts.take_profit_alerts.len(), 1);
    }

    #[test]
    fn test_zero_cost_is_rejected() {
        let positions = vec![holding("601318", "金融", 0.0, 50.0, 45.0, 60.0, 0.1)];
        assert!(matches!(
            scan_price_triggers(&positions, Utc::now()),
            Err(RiskError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rebalance_flags_position_and_sector_caps() {
        let positions = vec![
            holding("688981", "科技", 50.0, 50.0, 45.0, 60.0, 0.25),
            holding("002415", "科技", 30.0, 30.0, 27.0, 36.0, 0.2),
            holding("600276", "医药", 40.0, 40.0, 36.0, 48.0, 0.55),
        ];
        let suggestions = suggest_rebalance(&positions);

        let reduce: Vec<&RebalanceSuggestion> = suggestions
            .iter()
            .filter(|s| s.action == RebalanceAction::Reduce)
            .collect();
        // 0.2 is not above the cap
        assert_eq!(reduce.len(), 2);
        assert_eq!(reduce[0].target, "688981");
        assert_eq!(reduce[1].target, "600276");
        assert!(reduce.iter().all(|s| s.suggested_weight == 0.15));

        let diversify: Vec<&RebalanceSuggestion> = suggestions
            .iter()
            .filter(|s| s.action == RebalanceAction::Diversify)
            .collect();
        assert_eq!(diversify.len(), 2);
        assert_eq!(diversify[0].target, "科技");
        assert!((diversify[0].current_weight - 0.45).abs() < 1e-9);
        assert_eq!(diversify[1].target, "医药");
        assert!(diversify.iter().all(|s| s.suggested_weight == 0.3));
        assert!(diversify.iter().all(|s| s.position_id.is_none()));
    }

    #[test]
    fn test_sector_exactly_at_cap_is_not_flagged() {
        let positions = vec![
            holding("600519", "消费", 10.0, 10.0, 9.0, 12.0, 0.2),
            holding("000858", "消费", 10.0, 10.0, 9.0, 12.0, 0.2),
        ];
        let suggestions = suggest_rebalance(&positions);
        assert!(suggestions.is_empty());
    }
}
