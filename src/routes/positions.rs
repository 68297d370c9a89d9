use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use http::StatusCode;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    ApiResponse, CreatePosition, Position, PriceUpdate, StockPrice, UpdatePosition, ValuedPosition,
};
use crate::services;
use crate::state::AppState;

/// Routes addressed by position id, nested under `/api/positions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            get(get_position).put(update_position).delete(delete_position),
        )
        .route("/:id/price", put(update_price))
}

/// Routes under a portfolio, merged into the `/api/portfolios` router.
pub fn portfolio_scoped() -> Router<AppState> {
    Router::new()
        .route("/:id/positions", get(list_positions).post(create_position))
        .route("/:id/prices", post(refresh_prices))
}

pub async fn list_positions(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ValuedPosition>>>, AppError> {
    info!("GET /portfolios/{}/positions - Listing positions", portfolio_id);
    let positions = services::position_service::list_valued(&state.pool, portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to list positions for portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(positions)))
}

pub async fn create_position(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
    Json(data): Json<CreatePosition>,
) -> Result<(StatusCode, Json<ApiResponse<Position>>), AppError> {
    info!("POST /portfolios/{}/positions - Creating position", portfolio_id);
    let position = services::position_service::create(&state.pool, portfolio_id, data)
        .await
        .map_err(|e| {
            error!("Failed to create position in portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(position))))
}

pub async fn refresh_prices(
    State(state): State<AppState>,
    Path(portfolio_id): Path<Uuid>,
    Json(prices): Json<Vec<StockPrice>>,
) -> Result<Json<ApiResponse<Vec<ValuedPosition>>>, AppError> {
    info!(
        "POST /portfolios/{}/prices - Refreshing {} prices",
        portfolio_id,
        prices.len()
    );
    let positions = services::position_service::bulk_update_prices(&state.pool, portfolio_id, prices)
        .await
        .map_err(|e| {
            error!("Failed to refresh prices for portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(positions)))
}

pub async fn get_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    info!("GET /positions/{} - Fetching position", id);
    let position = services::position_service::fetch_one(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch position {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(position)))
}

pub async fn update_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdatePosition>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    info!("PUT /positions/{} - Updating position", id);
    let position = services::position_service::update(&state.pool, id, data)
        .await
        .map_err(|e| {
            error!("Failed to update position {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(position)))
}

pub async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<PriceUpdate>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    info!("PUT /positions/{}/price - Updating price to {}", id, data.price);
    let position = services::position_service::update_price(&state.pool, id, data)
        .await
        .map_err(|e| {
            error!("Failed to update price of position {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(position)))
}

pub async fn delete_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    info!("DELETE /positions/{} - Deleting position", id);
    services::position_service::delete(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to delete position {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::with_message(id, "Position deleted")))
}
