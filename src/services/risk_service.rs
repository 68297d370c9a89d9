use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, RiskError};
use crate::models::{
    PositionRisk, RiskAssessment, RiskDistribution, RiskFactor, RiskLevel, RiskLevelSource,
    RiskStatus, SectorRisk, ValuedPosition,
};
use crate::services::{portfolio_service, position_service, risk_settings_service};

const PRICE_RISK_WEIGHT: f64 = 0.4;
const CONCENTRATION_RISK_WEIGHT: f64 = 0.3;
const VOLATILITY_RISK_WEIGHT: f64 = 0.3;

const SHORT_TERM_HOLDING_DAYS: i64 = 30;
const LONG_TERM_HOLDING_DAYS: i64 = 180;

const SECTOR_WEIGHT_WARNING: f64 = 0.4;

/// Assess the full risk picture of a portfolio from its current positions.
///
/// Loads the portfolio's positions and discipline settings and runs the pure
/// scoring pipeline over them. Nothing is written back: the assessment is
/// recomputed from scratch on every call.
pub async fn assess(pool: &SqlitePool, portfolio_id: Uuid) -> Result<RiskAssessment, AppError> {
    let portfolio = portfolio_service::fetch_one(pool, portfolio_id).await?;
    let settings = risk_settings_service::get(pool, portfolio_id).await?;
    let positions = position_service::list_valued(pool, portfolio_id).await?;

    let assessment = assess_portfolio(
        portfolio.id,
        &positions,
        settings.risk_level_source,
        Utc::now(),
    )?;

    info!(
        "Assessed portfolio {} ({} positions): score {:.2}, level {:?}",
        portfolio_id,
        positions.len(),
        assessment.weighted_risk_score,
        assessment.overall_risk_level
    );
    Ok(assessment)
}

/// Score a single position in the context of its portfolio.
pub async fn assess_position(
    pool: &SqlitePool,
    portfolio_id: Uuid,
    position_id: Uuid,
) -> Result<PositionRisk, AppError> {
    let positions = position_service::list_valued(pool, portfolio_id).await?;
    let position = positions
        .iter()
        .find(|p| p.position.id == position_id)
        .ok_or_else(|| {
            warn!("Position {} not in portfolio {}", position_id, portfolio_id);
            AppError::NotFound(format!("Position {} not found in portfolio", position_id))
        })?;

    Ok(score_position(position, Utc::now())?)
}

/// Reject figures that would otherwise turn every derived percentage into
/// NaN or infinity.
pub(crate) fn validate_position(p: &ValuedPosition) -> Result<(), RiskError> {
    let pos = &p.position;
    if !(pos.avg_cost.is_finite() && pos.avg_cost > 0.0) {
        return Err(RiskError::InvalidInput(format!(
            "position {} has average cost {}, expected a positive number",
            pos.stock_code, pos.avg_cost
        )));
    }

    let prices = [
        ("current price", pos.current_price),
        ("stop loss", pos.stop_loss),
        ("take profit", pos.take_profit),
    ];
    for (label, value) in prices {
        if !value.is_finite() {
            return Err(RiskError::InvalidInput(format!(
                "position {} has a non-finite {}",
                pos.stock_code, label
            )));
        }
    }

    if !(p.weight.is_finite() && p.weight >= 0.0) {
        return Err(RiskError::InvalidInput(format!(
            "position {} has weight {}, expected a non-negative number",
            pos.stock_code, p.weight
        )));
    }
    Ok(())
}

/// Score one position from price proximity, concentration and volatility.
///
/// `now` fixes the instant holding days are measured against.
pub fn score_position(p: &ValuedPosition, now: DateTime<Utc>) -> Result<PositionRisk, RiskError> {
    validate_position(p)?;

    let holding_days = (now - p.position.last_update).num_days();

    let price_risk = score_price_risk(p);
    let concentration_risk = score_concentration_risk(p.weight);
    let volatility_risk = score_volatility_risk(p.position.risk_level, holding_days);

    let total_risk_score = price_risk.score * PRICE_RISK_WEIGHT
        + concentration_risk.score * CONCENTRATION_RISK_WEIGHT
        + volatility_risk.score * VOLATILITY_RISK_WEIGHT;

    let recommendations =
        position_recommendations(&price_risk, &concentration_risk, &volatility_risk);

    Ok(PositionRisk {
        position_id: p.position.id,
        stock_code: p.position.stock_code.clone(),
        stock_name: p.position.stock_name.clone(),
        sector: p.position.sector.clone(),
        weight: p.weight,
        risk_level: RiskLevel::from_position_score(total_risk_score),
        total_risk_score,
        price_risk,
        concentration_risk,
        volatility_risk,
        holding_days,
        recommendations,
    })
}

/// Distance of the current price from the stop-loss and take-profit levels,
/// both measured as a percentage of average cost, plus a penalty for
/// positions under water.
fn score_price_risk(p: &ValuedPosition) -> RiskFactor {
    let pos = &p.position;
    let mut score = 0.0;
    let mut status = RiskStatus::Safe;
    let mut notes = Vec::new();

    let loss_distance = (pos.current_price - pos.stop_loss) / pos.avg_cost * 100.0;
    if loss_distance <= 5.0 {
        score += 40.0;
        status = status.escalate(RiskStatus::Danger);
        notes.push(format!("{:.2}% away from stop loss", loss_distance));
    } else if loss_distance <= 10.0 {
        score += 25.0;
        status = status.escalate(RiskStatus::Warning);
        notes.push(format!("{:.2}% away from stop loss", loss_distance));
    }

    let profit_distance = (pos.take_profit - pos.current_price) / pos.avg_cost * 100.0;
    if profit_distance <= 5.0 {
        score += 20.0;
        let near = if profit_distance <= 2.0 {
            RiskStatus::Warning
        } else {
            RiskStatus::Info
        };
        status = status.escalate(near);
        notes.push(format!("{:.2}% away from take profit", profit_distance));
    }

    let current_return = (pos.current_price - pos.avg_cost) / pos.avg_cost * 100.0;
    if current_return < 0.0 {
        score += (current_return.abs() * 2.0).min(30.0);
        notes.push(format!("Unrealized loss of {:.2}%", current_return.abs()));
    }

    RiskFactor { score, status, notes }
}

fn score_concentration_risk(weight: f64) -> RiskFactor {
    let (score, status) = if weight > 0.25 {
        (50.0, RiskStatus::Danger)
    } else if weight > 0.15 {
        (30.0, RiskStatus::Warning)
    } else if weight > 0.10 {
        (15.0, RiskStatus::Info)
    } else {
        (5.0, RiskStatus::Safe)
    };

    RiskFactor {
        score,
        status,
        notes: vec![format!("{:.2}% of portfolio value", weight * 100.0)],
    }
}

fn score_volatility_risk(level: RiskLevel, holding_days: i64) -> RiskFactor {
    let (mut score, status) = match level {
        RiskLevel::High => (35.0, RiskStatus::Danger),
        RiskLevel::Medium => (20.0, RiskStatus::Warning),
        RiskLevel::Low => (10.0, RiskStatus::Safe),
    };
    let mut notes = Vec::new();

    if holding_days < SHORT_TERM_HOLDING_DAYS {
        score += 10.0;
        notes.push(format!("Short-term holding ({} days)", holding_days));
    } else if holding_days > LONG_TERM_HOLDING_DAYS {
        score = f64::max(score - 5.0, 0.0);
        notes.push(format!("Stable long-term holding ({} days)", holding_days));
    }

    RiskFactor { score, status, notes }
}

fn position_recommendations(
    price: &RiskFactor,
    concentration: &RiskFactor,
    volatility: &RiskFactor,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match price.status {
        RiskStatus::Danger => recommendations.push(
            "Price is close to the stop loss: reduce the position or set a stop-loss order immediately"
                .to_string(),
        ),
        RiskStatus::Warning => recommendations.push(
            "Price is approaching a stop-loss or take-profit level: review the trading plan"
                .to_string(),
        ),
        RiskStatus::Info => recommendations.push(
            "Price is near the take-profit target: consider locking in part of the gains"
                .to_string(),
        ),
        RiskStatus::Safe => {}
    }

    match concentration.status {
        RiskStatus::Danger => recommendations.push(
            "Position is over 25% of the portfolio: trim it to reduce concentration".to_string(),
        ),
        RiskStatus::Warning => recommendations
            .push("Position is over 15% of the portfolio: avoid adding to it".to_string()),
        _ => {}
    }

    if volatility.status == RiskStatus::Danger {
        recommendations.push(
            "High-volatility holding: tighten the stop loss and keep the size small".to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push("Risk is under control: keep holding according to plan".to_string());
    }
    recommendations
}

#[derive(Debug, Default)]
struct SectorAccumulator {
    total_weight: f64,
    weighted_level_score: f64,
    position_count: usize,
    high_risk_count: usize,
}

/// Roll positions up by sector label.
///
/// Each entry is `(sector, weight, level)`. Sectors come back ordered by
/// total weight, heaviest first.
pub fn aggregate_sectors<'a, I>(entries: I) -> Vec<SectorRisk>
where
    I: IntoIterator<Item = (&'a str, f64, RiskLevel)>,
{
    // At most six sectors, so a linear scan keeps first-seen order cheaply.
    let mut groups: Vec<(String, SectorAccumulator)> = Vec::new();

    for (sector, weight, level) in entries {
        let idx = match groups.iter().position(|(name, _)| name == sector) {
            Some(idx) => idx,
            None => {
                groups.push((sector.to_string(), SectorAccumulator::default()));
                groups.len() - 1
            }
        };
        let acc = &mut groups[idx].1;
        acc.total_weight += weight;
        acc.weighted_level_score += weight * level.level_score();
        acc.position_count += 1;
        if level == RiskLevel::High {
            acc.high_risk_count += 1;
        }
    }

    let mut sectors: Vec<SectorRisk> = groups
        .into_iter()
        .map(|(sector, acc)| build_sector_risk(sector, acc))
        .collect();
    sectors.sort_by(|a, b| b.total_weight.total_cmp(&a.total_weight));
    sectors
}

fn build_sector_risk(sector: String, acc: SectorAccumulator) -> SectorRisk {
    let avg_risk_score = if acc.total_weight > 0.0 {
        acc.weighted_level_score / acc.total_weight
    } else {
        0.0
    };
    let high_risk_ratio = if acc.position_count > 0 {
        acc.high_risk_count as f64 / acc.position_count as f64
    } else {
        0.0
    };

    let risk_level = if avg_risk_score > 60.0 || high_risk_ratio > 0.5 {
        RiskLevel::High
    } else if avg_risk_score > 35.0 || high_risk_ratio > 0.2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let mut recommendations = Vec::new();
    if acc.total_weight > SECTOR_WEIGHT_WARNING {
        recommendations.push(format!(
            "{} makes up {:.1}% of the portfolio: diversify into other sectors",
            sector,
            acc.total_weight * 100.0
        ));
    }
    if high_risk_ratio > 0.5 {
        recommendations.push(format!(
            "More than half of the {} holdings are high risk: reduce exposure",
            sector
        ));
    }
    if risk_level == RiskLevel::High {
        recommendations.push(format!("Re-evaluate the {} allocation", sector));
    }
    if recommendations.is_empty() {
        recommendations.push(format!("{} sector risk is within an acceptable range", sector));
    }

    SectorRisk {
        sector,
        total_weight: acc.total_weight,
        avg_risk_score,
        position_count: acc.position_count,
        high_risk_count: acc.high_risk_count,
        risk_level,
        recommendations,
    }
}

/// Combine per-position scores and sector rollups into one assessment.
///
/// An empty portfolio yields a zero score at low risk. A non-empty portfolio
/// whose weights sum to zero cannot be averaged and is an error.
pub fn assess_portfolio(
    portfolio_id: Uuid,
    positions: &[ValuedPosition],
    level_source: RiskLevelSource,
    now: DateTime<Utc>,
) -> Result<RiskAssessment, RiskError> {
    let position_risks = positions
        .iter()
        .map(|p| score_position(p, now))
        .collect::<Result<Vec<_>, _>>()?;

    let total_weight: f64 = positions.iter().map(|p| p.weight).sum();
    let weighted_risk_score = if positions.is_empty() {
        0.0
    } else if total_weight > 0.0 {
        position_risks
            .iter()
            .map(|r| r.total_risk_score * r.weight)
            .sum::<f64>()
            / total_weight
    } else {
        return Err(RiskError::DivisionByZero(format!(
            "portfolio {} has {} positions but zero total weight",
            portfolio_id,
            positions.len()
        )));
    };

    let levels: Vec<RiskLevel> = positions
        .iter()
        .zip(&position_risks)
        .map(|(p, risk)| match level_source {
            RiskLevelSource::Stored => p.position.risk_level,
            RiskLevelSource::Assessed => risk.risk_level,
        })
        .collect();

    let mut risk_distribution = RiskDistribution::default();
    for level in &levels {
        risk_distribution.record(*level);
    }

    let sector_risks = aggregate_sectors(
        positions
            .iter()
            .zip(&levels)
            .map(|(p, level)| (p.position.sector.as_str(), p.weight, *level)),
    );

    let recommendations =
        portfolio_recommendations(weighted_risk_score, &risk_distribution, &sector_risks);

    Ok(RiskAssessment {
        portfolio_id,
        overall_risk_level: RiskLevel::from_aggregate_score(weighted_risk_score),
        weighted_risk_score,
        risk_distribution,
        sector_risks,
        position_risks,
        recommendations,
        level_source,
        last_updated: now,
    })
}

fn portfolio_recommendations(
    score: f64,
    distribution: &RiskDistribution,
    sectors: &[SectorRisk],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if score > 60.0 {
        recommendations
            .push("Overall risk is high: cut exposure and raise the cash buffer".to_string());
    } else if score > 35.0 {
        recommendations
            .push("Overall risk is moderate: keep a close eye on the largest positions".to_string());
    }

    if distribution.high > distribution.low {
        recommendations.push(
            "High-risk positions outnumber low-risk ones: rebalance toward steadier holdings"
                .to_string(),
        );
    }

    let high_sectors: Vec<&str> = sectors
        .iter()
        .filter(|s| s.risk_level == RiskLevel::High)
        .map(|s| s.sector.as_str())
        .collect();
    if !high_sectors.is_empty() {
        recommendations.push(format!(
            "High-risk sectors present ({}): consider trimming them",
            high_sectors.join(", ")
        ));
    }

    if recommendations.is_empty() {
        recommendations.push("Portfolio risk is well controlled: keep following the plan".to_string());
    }
    recommendations
}
