use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    CreatePosition, Position, PriceUpdate, Sector, StockPrice, UpdatePosition, ValuedPosition,
};
use crate::services::{portfolio_service, risk_settings_service};

pub(crate) fn require_positive(value: f64, field: &str) -> Result<(), AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be > 0", field)))
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn parse_sector(value: &str) -> Result<Sector, AppError> {
    Ok(value.trim().parse::<Sector>()?)
}

pub async fn create(
    pool: &SqlitePool,
    portfolio_id: Uuid,
    input: CreatePosition,
) -> Result<Position, AppError> {
    let stock_code = require_text(&input.stock_code, "Stock code")?;
    let stock_name = require_text(&input.stock_name, "Stock name")?;
    let sector = parse_sector(&input.sector)?;
    require_positive(input.quantity, "Quantity")?;
    require_positive(input.avg_cost, "Average cost")?;
    let current_price = input.current_price.unwrap_or(input.avg_cost);
    require_positive(current_price, "Current price")?;

    portfolio_service::ensure_exists(pool, portfolio_id).await?;
    if db::position_queries::fetch_by_code(pool, portfolio_id, &stock_code)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(format!(
            "Portfolio already holds {}; record a trade to change it",
            stock_code
        )));
    }

    let settings = risk_settings_service::get(pool, portfolio_id).await?;
    let stop_loss = input
        .stop_loss
        .unwrap_or_else(|| settings.stop_loss_price(input.avg_cost));
    let take_profit = input
        .take_profit
        .unwrap_or_else(|| settings.take_profit_price(input.avg_cost));
    require_positive(stop_loss, "Stop loss")?;
    require_positive(take_profit, "Take profit")?;

    let now = Utc::now();
    let position = Position {
        id: Uuid::new_v4(),
        portfolio_id,
        stock_code,
        stock_name,
        sector: sector.label().to_string(),
        quantity: input.quantity,
        avg_cost: input.avg_cost,
        current_price,
        stop_loss,
        take_profit,
        risk_level: input.risk_level.unwrap_or_default(),
        last_update: now,
        created_at: now,
    };

    let mut conn = pool.acquire().await?;
    match db::position_queries::insert(&mut conn, &position).await {
        Ok(position) => {
            info!(
                "Opened position {} in portfolio {} ({} @ {:.2})",
                position.stock_code, portfolio_id, position.quantity, position.avg_cost
            );
            Ok(position)
        }
        Err(e) => {
            error!("Failed to create position for portfolio {}: {:?}", portfolio_id, e);
            Err(AppError::Db(e))
        }
    }
}

/// Positions of a portfolio with market value, P&L and weight filled in.
pub async fn list_valued(
    pool: &SqlitePool,
    portfolio_id: Uuid,
) -> Result<Vec<ValuedPosition>, AppError> {
    portfolio_service::ensure_exists(pool, portfolio_id).await?;
    let positions = db::position_queries::fetch_all(pool, portfolio_id).await?;
    Ok(ValuedPosition::value_all(positions))
}

pub(crate) async fn fetch_one(pool: &SqlitePool, id: Uuid) -> Result<Position, AppError> {
    db::position_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Position not found".to_string()))
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    input: UpdatePosition,
) -> Result<Position, AppError> {
    let current = fetch_one(pool, id).await?;
    let mut updated = current.apply(&input);
    updated.stock_name = require_text(&updated.stock_name, "Stock name")?;
    require_positive(updated.quantity, "Quantity")?;
    require_positive(updated.avg_cost, "Average cost")?;
    require_positive(updated.stop_loss, "Stop loss")?;
    require_positive(updated.take_profit, "Take profit")?;
    updated.last_update = Utc::now();

    let mut conn = pool.acquire().await?;
    db::position_queries::update(&mut conn, &updated)
        .await?
        .ok_or_else(|| AppError::NotFound("Position not found".to_string()))
}

pub async fn update_price(
    pool: &SqlitePool,
    id: Uuid,
    input: PriceUpdate,
) -> Result<Position, AppError> {
    require_positive(input.price, "Price")?;
    let mut position = fetch_one(pool, id).await?;
    position.current_price = input.price;
    position.last_update = Utc::now();

    let mut conn = pool.acquire().await?;
    db::position_queries::update(&mut conn, &position)
        .await?
        .ok_or_else(|| AppError::NotFound("Position not found".to_string()))
}

/// Applies a batch of quotes to a portfolio by stock code in one
/// transaction. Codes the portfolio does not hold are skipped. Returns the
/// refreshed positions.
pub async fn bulk_update_prices(
    pool: &SqlitePool,
    portfolio_id: Uuid,
    prices: Vec<StockPrice>,
) -> Result<Vec<ValuedPosition>, AppError> {
    for quote in &prices {
        require_positive(quote.price, &format!("Price for {}", quote.stock_code))?;
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    if db::portfolio_queries::touch(&mut tx, portfolio_id, now).await? == 0 {
        return Err(AppError::NotFound("Portfolio not found".to_string()));
    }

    let mut matched = 0;
    for quote in &prices {
        let code = quote.stock_code.trim();
        let rows =
            db::position_queries::update_price_by_code(&mut tx, portfolio_id, code, quote.price, now)
                .await?;
        if rows == 0 {
            warn!("No position {} in portfolio {}, price ignored", code, portfolio_id);
        }
        matched += rows;
    }
    tx.commit().await?;

    info!(
        "Refreshed {} of {} prices for portfolio {}",
        matched,
        prices.len(),
        portfolio_id
    );

    list_valued(pool, portfolio_id).await
}

pub(crate) async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, AppError> {
    match db::position_queries::delete(pool, id).await {
        Ok(0) => Err(AppError::NotFound("Position not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}
