use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{Portfolio, UpdatePortfolio};

pub async fn fetch_all(pool: &SqlitePool) -> Result<Vec<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(
        "SELECT id, name, description, created_at, updated_at
         FROM portfolios
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_one<'e, E>(executor: E, id: Uuid) -> Result<Option<Portfolio>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Portfolio>(
        "SELECT id, name, description, created_at, updated_at
         FROM portfolios
         WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

// Writes run to completion with `execute` and are read back on the same
// connection; a RETURNING row fetched with `fetch_one` leaves the statement
// unfinished and the write uncommitted.
pub async fn insert(pool: &SqlitePool, input: Portfolio) -> Result<Portfolio, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    sqlx::query(
        "INSERT INTO portfolios (id, name, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(input.id)
    .bind(input.name)
    .bind(input.description)
    .bind(input.created_at)
    .bind(input.updated_at)
    .execute(&mut *conn)
    .await?;

    fetch_one(&mut *conn, input.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    input: UpdatePortfolio,
) -> Result<Option<Portfolio>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let result = sqlx::query(
        "UPDATE portfolios
         SET name = ?2, description = ?3, updated_at = ?4
         WHERE id = ?1",
    )
    .bind(id)
    .bind(input.name)
    .bind(input.description)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_one(&mut *conn, id).await
}

/// Bumps `updated_at`. Inside a transaction this is the first write, so the
/// connection holds the database write lock from then on.
pub async fn touch(
    conn: &mut SqliteConnection,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE portfolios SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(at)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portfolios WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn exists(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM portfolios WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}
