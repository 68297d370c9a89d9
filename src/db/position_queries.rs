use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::Position;

pub async fn fetch_all(pool: &SqlitePool, portfolio_id: Uuid) -> Result<Vec<Position>, sqlx::Error> {
    sqlx::query_as::<_, Position>(
        "SELECT id, portfolio_id, stock_code, stock_name, sector, quantity, avg_cost,
                current_price, stop_loss, take_profit, risk_level, last_update, created_at
         FROM positions
         WHERE portfolio_id = ?1
         ORDER BY created_at ASC",
    )
    .bind(portfolio_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one<'e, E>(executor: E, id: Uuid) -> Result<Option<Position>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Position>(
        "SELECT id, portfolio_id, stock_code, stock_name, sector, quantity, avg_cost,
                current_price, stop_loss, take_profit, risk_level, last_update, created_at
         FROM positions
         WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn fetch_by_code<'e, E>(
    executor: E,
    portfolio_id: Uuid,
    stock_code: &str,
) -> Result<Option<Position>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Position>(
        "SELECT id, portfolio_id, stock_code, stock_name, sector, quantity, avg_cost,
                current_price, stop_loss, take_profit, risk_level, last_update, created_at
         FROM positions
         WHERE portfolio_id = ?1 AND stock_code = ?2",
    )
    .bind(portfolio_id)
    .bind(stock_code)
    .fetch_optional(executor)
    .await
}

pub async fn insert(conn: &mut SqliteConnection, position: &Position) -> Result<Position, sqlx::Error> {
    sqlx::query(
        "INSERT INTO positions (id, portfolio_id, stock_code, stock_name, sector, quantity,
                               avg_cost, current_price, stop_loss, take_profit, risk_level,
                               last_update, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(position.id)
    .bind(position.portfolio_id)
    .bind(position.stock_code.as_str())
    .bind(position.stock_name.as_str())
    .bind(position.sector.as_str())
    .bind(position.quantity)
    .bind(position.avg_cost)
    .bind(position.current_price)
    .bind(position.stop_loss)
    .bind(position.take_profit)
    .bind(position.risk_level)
    .bind(position.last_update)
    .bind(position.created_at)
    .execute(&mut *conn)
    .await?;

    fetch_one(&mut *conn, position.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Overwrite every mutable column of an existing position.
pub async fn update(
    conn: &mut SqliteConnection,
    position: &Position,
) -> Result<Option<Position>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE positions
         SET stock_name = ?2, quantity = ?3, avg_cost = ?4, current_price = ?5,
             stop_loss = ?6, take_profit = ?7, risk_level = ?8, last_update = ?9
         WHERE id = ?1",
    )
    .bind(position.id)
    .bind(position.stock_name.as_str())
    .bind(position.quantity)
    .bind(position.avg_cost)
    .bind(position.current_price)
    .bind(position.stop_loss)
    .bind(position.take_profit)
    .bind(position.risk_level)
    .bind(position.last_update)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_one(&mut *conn, position.id).await
}

pub async fn update_price_by_code(
    conn: &mut SqliteConnection,
    portfolio_id: Uuid,
    stock_code: &str,
    price: f64,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE positions
         SET current_price = ?3, last_update = ?4
         WHERE portfolio_id = ?1 AND stock_code = ?2",
    )
    .bind(portfolio_id)
    .bind(stock_code)
    .bind(price)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM positions WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
