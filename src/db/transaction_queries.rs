use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::Transaction;

pub async fn fetch_all(pool: &SqlitePool, portfolio_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, portfolio_id, stock_code, stock_name, sector, side, quantity, price,
                fee, note, executed_at, created_at
         FROM transactions
         WHERE portfolio_id = ?1
         ORDER BY executed_at DESC, created_at DESC",
    )
    .bind(portfolio_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one<'e, E>(executor: E, id: Uuid) -> Result<Option<Transaction>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Transaction>(
        "SELECT id, portfolio_id, stock_code, stock_name, sector, side, quantity, price,
                fee, note, executed_at, created_at
         FROM transactions
         WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert(conn: &mut SqliteConnection, tx: &Transaction) -> Result<Transaction, sqlx::Error> {
    sqlx::query(
        "INSERT INTO transactions (id, portfolio_id, stock_code, stock_name, sector, side,
                                  quantity, price, fee, note, executed_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(tx.id)
    .bind(tx.portfolio_id)
    .bind(tx.stock_code.as_str())
    .bind(tx.stock_name.as_str())
    .bind(tx.sector.as_str())
    .bind(tx.side)
    .bind(tx.quantity)
    .bind(tx.price)
    .bind(tx.fee)
    .bind(tx.note.as_deref())
    .bind(tx.executed_at)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;

    fetch_one(&mut *conn, tx.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}
