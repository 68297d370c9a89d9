use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreatePortfolio, Portfolio, PortfolioSummary, UpdatePortfolio};
use crate::services::position_service;

pub async fn create(pool: &SqlitePool, input: CreatePortfolio) -> Result<Portfolio, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Portfolio name cannot be empty".into()));
    }
    let new_portfolio = Portfolio::new(input.name.trim().to_string(), input.description);
    let portfolio = db::portfolio_queries::insert(pool, new_portfolio).await?;
    info!("Created portfolio {} ({})", portfolio.id, portfolio.name);
    Ok(portfolio)
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    input: UpdatePortfolio,
) -> Result<Portfolio, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Portfolio name cannot be empty".into()));
    }
    let input = UpdatePortfolio {
        name: input.name.trim().to_string(),
        description: input.description,
    };
    db::portfolio_queries::update(pool, id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

pub async fn fetch_all(pool: &SqlitePool) -> Result<Vec<Portfolio>, AppError> {
    let portfolios = db::portfolio_queries::fetch_all(pool).await?;
    Ok(portfolios)
}

pub(crate) async fn fetch_one(pool: &SqlitePool, id: Uuid) -> Result<Portfolio, AppError> {
    db::portfolio_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

pub(crate) async fn ensure_exists(pool: &SqlitePool, id: Uuid) -> Result<(), AppError> {
    if db::portfolio_queries::exists(pool, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Portfolio not found".to_string()))
    }
}

/// Deleting a portfolio cascades to its positions, trades and settings.
pub(crate) async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, AppError> {
    match db::portfolio_queries::delete(pool, id).await {
        Ok(0) => Err(AppError::NotFound("Portfolio not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn summary(pool: &SqlitePool, id: Uuid) -> Result<PortfolioSummary, AppError> {
    let portfolio = fetch_one(pool, id).await?;
    let positions = position_service::list_valued(pool, id).await?;
    Ok(PortfolioSummary::build(portfolio, positions))
}
