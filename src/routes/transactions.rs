use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ApiResponse, CreateTransaction, TradeOutcome, Transaction};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id", get(get_transaction))
}

pub fn portfolio_scoped() -> Router<AppState> {
    Router::new().route(
        "/:id/transactions",
        get(list_transactions).post(record_transaction),
    )
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    info!("GET /portfolios/{}/transactions - Listing trades", portfolio_id);
    let transactions = services::transaction_service::list(&state.pool, portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to list trades for portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(transactions)))
}

pub async fn record_transaction(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
    Json(data): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<ApiResponse<TradeOutcome>>), AppError> {
    info!(
        "POST /portfolios/{}/transactions - Recording {:?} of {}",
        portfolio_id, data.side, data.stock_code
    );
    let outcome = services::transaction_service::record_trade(&state.pool, portfolio_id, data)
        .await
        .map_err(|e| {
            error!("Failed to record trade in portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(outcome))))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    info!("GET /transactions/{} - Fetching trade", id);
    let transaction = services::transaction_service::fetch_one(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch trade {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(transaction)))
}
