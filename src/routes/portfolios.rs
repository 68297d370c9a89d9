use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    ApiResponse, CreatePortfolio, Portfolio, PortfolioReport, PortfolioSummary, UpdatePortfolio,
};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(fetch_portfolios).post(create_portfolio))
        .route(
            "/:id",
            get(get_portfolio).put(update_portfolio).delete(delete_portfolio),
        )
        .route("/:id/summary", get(get_summary))
        .route("/:id/report", get(get_report))
}

pub async fn create_portfolio(
    State(state): State<AppState>,
    Json(data): Json<CreatePortfolio>,
) -> Result<(StatusCode, Json<ApiResponse<Portfolio>>), AppError> {
    info!("POST /portfolios - Creating new portfolio");
    let portfolio = services::portfolio_service::create(&state.pool, data)
        .await
        .map_err(|e| {
            error!("Failed to create portfolio: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(portfolio))))
}

pub async fn fetch_portfolios(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Portfolio>>>, AppError> {
    info!("GET /portfolios - Fetching all portfolios");
    let portfolios = services::portfolio_service::fetch_all(&state.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch portfolios: {}", e);
            e
        })?;
    Ok(Json(ApiResponse::ok(portfolios)))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Portfolio>>, AppError> {
    info!("GET /portfolios/{} - Fetching portfolio", id);
    let portfolio = services::portfolio_service::fetch_one(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(portfolio)))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdatePortfolio>,
) -> Result<Json<ApiResponse<Portfolio>>, AppError> {
    info!("PUT /portfolios/{} - Updating portfolio", id);
    let portfolio = services::portfolio_service::update(&state.pool, id, data)
        .await
        .map_err(|e| {
            error!("Failed to update portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(portfolio)))
}

pub async fn delete_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    info!("DELETE /portfolios/{} - Deleting portfolio", id);
    services::portfolio_service::delete(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to delete portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::with_message(id, "Portfolio deleted")))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PortfolioSummary>>, AppError> {
    info!("GET /portfolios/{}/summary - Building portfolio summary", id);
    let summary = services::portfolio_service::summary(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to build summary for portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(summary)))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PortfolioReport>>, AppError> {
    info!("GET /portfolios/{}/report - Generating portfolio report", id);
    let report = services::report_service::generate(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to generate report for portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(report)))
}
