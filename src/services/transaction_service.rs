use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    CreateTransaction, Position, RiskLevel, RiskSettings, TradeOutcome, TradeSide, Transaction,
};
use crate::services::position_service::{parse_sector, require_positive, require_text};
use crate::services::{portfolio_service, risk_settings_service};

// Quantities below this are treated as zero when a sell drains a position.
const QUANTITY_EPSILON: f64 = 1e-9;

/// How a trade changes the holding of its stock.
#[derive(Debug, Clone, PartialEq)]
enum TradeEffect {
    Open(Position),
    Update(Position),
    Close(Uuid),
}

/// Records a trade in the ledger and applies it to the matching position,
/// all inside one database transaction.
pub async fn record_trade(
    pool: &SqlitePool,
    portfolio_id: Uuid,
    input: CreateTransaction,
) -> Result<TradeOutcome, AppError> {
    require_text(&input.stock_code, "Stock code")?;
    require_text(&input.stock_name, "Stock name")?;
    let sector = parse_sector(&input.sector)?;
    require_positive(input.quantity, "Quantity")?;
    require_positive(input.price, "Price")?;
    if let Some(fee) = input.fee {
        if !fee.is_finite() || fee < 0.0 {
            return Err(AppError::Validation("Fee cannot be negative".into()));
        }
    }

    let settings = risk_settings_service::get(pool, portfolio_id).await?;
    let risk_level = input.risk_level.unwrap_or_default();
    let mut record = Transaction::new(portfolio_id, input);
    record.sector = sector.label().to_string();

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    // The touch is the first statement, so the transaction takes the write
    // lock before reading the holding and concurrent trades queue up.
    if db::portfolio_queries::touch(&mut tx, portfolio_id, now).await? == 0 {
        return Err(AppError::NotFound("Portfolio not found".to_string()));
    }
    let existing =
        db::position_queries::fetch_by_code(&mut *tx, portfolio_id, &record.stock_code).await?;

    let (position, position_closed) =
        match apply_trade(existing, &record, &settings, risk_level, now)? {
            TradeEffect::Open(position) => {
                (Some(db::position_queries::insert(&mut tx, &position).await?), false)
            }
            TradeEffect::Update(position) => {
                let saved = db::position_queries::update(&mut tx, &position)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Position not found".to_string()))?;
                (Some(saved), false)
            }
            TradeEffect::Close(id) => {
                db::position_queries::delete(&mut *tx, id).await?;
                (None, true)
            }
        };

    let transaction = db::transaction_queries::insert(&mut tx, &record).await?;
    tx.commit().await?;

    info!(
        "Recorded {:?} of {} {} @ {:.2} in portfolio {}{}",
        transaction.side,
        transaction.quantity,
        transaction.stock_code,
        transaction.price,
        portfolio_id,
        if position_closed { " (position closed)" } else { "" }
    );

    Ok(TradeOutcome {
        transaction,
        position,
        position_closed,
    })
}

/// Works out the position a trade leaves behind. A buy opens the holding
/// or folds into it at a quantity-weighted average cost; a sell shrinks it
/// and closes it at zero. Stop and take prices are only set on open.
fn apply_trade(
    existing: Option<Position>,
    trade: &Transaction,
    settings: &RiskSettings,
    risk_level: RiskLevel,
    now: DateTime<Utc>,
) -> Result<TradeEffect, AppError> {
    if let Some(position) = &existing {
        if position.sector != trade.sector || position.stock_name != trade.stock_name {
            return Err(AppError::Validation(format!(
                "{} is held as {} ({}), trade says {} ({})",
                trade.stock_code,
                position.stock_name,
                position.sector,
                trade.stock_name,
                trade.sector
            )));
        }
    }

    match (trade.side, existing) {
        (TradeSide::Buy, None) => Ok(TradeEffect::Open(Position {
            id: Uuid::new_v4(),
            portfolio_id: trade.portfolio_id,
            stock_code: trade.stock_code.clone(),
            stock_name: trade.stock_name.clone(),
            sector: trade.sector.clone(),
            quantity: trade.quantity,
            avg_cost: trade.price,
            current_price: trade.price,
            stop_loss: settings.stop_loss_price(trade.price),
            take_profit: settings.take_profit_price(trade.price),
            risk_level,
            last_update: now,
            created_at: now,
        })),
        (TradeSide::Buy, Some(mut position)) => {
            let quantity = position.quantity + trade.quantity;
            position.avg_cost =
                (position.cost_basis() + trade.quantity * trade.price) / quantity;
            position.quantity = quantity;
            position.current_price = trade.price;
            position.last_update = now;
            Ok(TradeEffect::Update(position))
        }
        (TradeSide::Sell, None) => Err(AppError::Validation(format!(
            "No open position in {} to sell",
            trade.stock_code
        ))),
        (TradeSide::Sell, Some(mut position)) => {
            if trade.quantity > position.quantity + QUANTITY_EPSILON {
                return Err(AppError::Validation(format!(
                    "Cannot sell {} shares of {}, only {} held",
                    trade.quantity, trade.stock_code, position.quantity
                )));
            }
            let remaining = position.quantity - trade.quantity;
            if remaining <= QUANTITY_EPSILON {
                return Ok(TradeEffect::Close(position.id));
            }
            position.quantity = remaining;
            position.current_price = trade.price;
            position.last_update = now;
            Ok(TradeEffect::Update(position))
        }
    }
}

pub async fn list(pool: &SqlitePool, portfolio_id: Uuid) -> Result<Vec<Transaction>, AppError> {
    portfolio_service::ensure_exists(pool, portfolio_id).await?;
    let transactions = db::transaction_queries::fetch_all(pool, portfolio_id).await?;
    Ok(transactions)
}

pub(crate) async fn fetch_one(pool: &SqlitePool, id: Uuid) -> Result<Transaction, AppError> {
    db::transaction_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
}
