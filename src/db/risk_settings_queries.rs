use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::RiskSettings;

pub async fn fetch<'e, E>(executor: E, portfolio_id: Uuid) -> Result<Option<RiskSettings>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RiskSettings>(
        "SELECT portfolio_id, stop_loss_percent, take_profit_percent, risk_level_source, updated_at
         FROM risk_settings
         WHERE portfolio_id = ?1",
    )
    .bind(portfolio_id)
    .fetch_optional(executor)
    .await
}

/// Insert or replace the settings row for a portfolio.
pub async fn upsert(pool: &SqlitePool, settings: &RiskSettings) -> Result<RiskSettings, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    sqlx::query(
        "INSERT INTO risk_settings (portfolio_id, stop_loss_percent, take_profit_percent,
                                   risk_level_source, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (portfolio_id) DO UPDATE SET
             stop_loss_percent = excluded.stop_loss_percent,
             take_profit_percent = excluded.take_profit_percent,
             risk_level_source = excluded.risk_level_source,
             updated_at = excluded.updated_at",
    )
    .bind(settings.portfolio_id)
    .bind(settings.stop_loss_percent)
    .bind(settings.take_profit_percent)
    .bind(settings.risk_level_source)
    .bind(settings.updated_at)
    .execute(&mut *conn)
    .await?;

    fetch(&mut *conn, settings.portfolio_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}
