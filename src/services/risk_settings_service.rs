use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{RiskSettings, UpdateRiskSettings};
use crate::services::portfolio_service;

/// Returns the portfolio's discipline settings, storing the defaults the
/// first time they are asked for.
pub async fn get(pool: &SqlitePool, portfolio_id: Uuid) -> Result<RiskSettings, AppError> {
    if let Some(settings) = db::risk_settings_queries::fetch(pool, portfolio_id).await? {
        return Ok(settings);
    }

    portfolio_service::ensure_exists(pool, portfolio_id).await?;
    let defaults = RiskSettings::defaults_for(portfolio_id);
    let settings = db::risk_settings_queries::upsert(pool, &defaults).await?;
    info!("Created default risk settings for portfolio {}", portfolio_id);
    Ok(settings)
}

pub async fn update(
    pool: &SqlitePool,
    portfolio_id: Uuid,
    input: UpdateRiskSettings,
) -> Result<RiskSettings, AppError> {
    input.validate()?;
    let current = get(pool, portfolio_id).await?;
    let updated = db::risk_settings_queries::upsert(pool, &current.apply(&input)).await?;
    info!(
        "Updated risk settings for portfolio {}: stop {:.2}, take {:.2}, source {:?}",
        portfolio_id,
        updated.stop_loss_percent,
        updated.take_profit_percent,
        updated.risk_level_source
    );
    Ok(updated)
}
