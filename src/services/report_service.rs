use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, RiskError};
use crate::models::{Portfolio, PortfolioReport, PortfolioSummary, RiskSettings, ValuedPosition};
use crate::services::{
    alert_service, portfolio_service, position_service, risk_service, risk_settings_service,
};

/// Summary, risk assessment, alerts and rebalance suggestions in one document.
pub async fn generate(pool: &SqlitePool, portfolio_id: Uuid) -> Result<PortfolioReport, AppError> {
    let portfolio = portfolio_service::fetch_one(pool, portfolio_id).await?;
    let settings = risk_settings_service::get(pool, portfolio_id).await?;
    let positions = position_service::list_valued(pool, portfolio_id).await?;

    let report = compose(portfolio, &settings, positions, Utc::now())?;

    info!(
        "Generated report for portfolio {}: {} positions, {} alerts, {} suggestions",
        portfolio_id,
        report.summary.position_count,
        report.alerts.stop_loss_alerts.len() + report.alerts.take_profit_alerts.len(),
        report.rebalance_suggestions.len()
    );
    Ok(report)
}

/// Every section is derived from the same position snapshot.
fn compose(
    portfolio: Portfolio,
    settings: &RiskSettings,
    positions: Vec<ValuedPosition>,
    now: DateTime<Utc>,
) -> Result<PortfolioReport, RiskError> {
    let risk = risk_service::assess_portfolio(
        portfolio.id,
        &positions,
        settings.risk_level_source,
        now,
    )?;
    let alerts = alert_service::scan_price_triggers(&positions, now)?;
    let rebalance_suggestions = alert_service::suggest_rebalance(&positions);

    Ok(PortfolioReport {
        summary: PortfolioSummary::build(portfolio, positions),
        risk,
        alerts,
        rebalance_suggestions,
        generated_at: now,
    })
}
