use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    ApiResponse, PositionRisk, RebalanceSuggestion, RiskAssessment, RiskSettings, TriggerAlerts,
    UpdateRiskSettings,
};
use crate::services::{alert_service, risk_service, risk_settings_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portfolios/:portfolio_id", get(get_portfolio_risk))
        .route(
            "/portfolios/:portfolio_id/positions/:position_id",
            get(get_position_risk),
        )
        .route("/portfolios/:portfolio_id/alerts", get(get_trigger_alerts))
        .route("/portfolios/:portfolio_id/rebalance", get(get_rebalance_suggestions))
        .route(
            "/portfolios/:portfolio_id/settings",
            get(get_risk_settings).put(update_risk_settings),
        )
}

/// GET /api/risk/portfolios/:portfolio_id
///
/// Weighted risk score, overall level, level distribution, sector rollups
/// and per-position breakdown. Recomputed on every request.
pub async fn get_portfolio_risk(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RiskAssessment>>, AppError> {
    info!("GET /api/risk/portfolios/{} - Assessing portfolio risk", portfolio_id);
    let assessment = risk_service::assess(&state.pool, portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to assess portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(assessment)))
}

/// GET /api/risk/portfolios/:portfolio_id/positions/:position_id
///
/// Risk breakdown of one position, weighted against its portfolio.
pub async fn get_position_risk(
    Path((portfolio_id, position_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PositionRisk>>, AppError> {
    info!(
        "GET /api/risk/portfolios/{}/positions/{} - Scoring position",
        portfolio_id, position_id
    );
    let risk = risk_service::assess_position(&state.pool, portfolio_id, position_id)
        .await
        .map_err(|e| {
            error!("Failed to score position {}: {}", position_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(risk)))
}

/// GET /api/risk/portfolios/:portfolio_id/alerts
pub async fn get_trigger_alerts(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TriggerAlerts>>, AppError> {
    info!("GET /api/risk/portfolios/{}/alerts - Checking price triggers", portfolio_id);
    let alerts = alert_service::check_alerts(&state.pool, portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to check alerts for portfolio {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(alerts)))
}

/// GET /api/risk/portfolios/:portfolio_id/rebalance
pub async fn get_rebalance_suggestions(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RebalanceSuggestion>>>, AppError> {
    info!("GET /api/risk/portfolios/{}/rebalance - Suggesting rebalance", portfolio_id);
    let suggestions = alert_service::rebalance_suggestions(&state.pool, portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to build rebalance suggestions for {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(suggestions)))
}

/// GET /api/risk/portfolios/:portfolio_id/settings
///
/// Returns the stored settings, creating the defaults on first access.
pub async fn get_risk_settings(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RiskSettings>>, AppError> {
    info!("GET /api/risk/portfolios/{}/settings - Fetching risk settings", portfolio_id);
    let settings = risk_settings_service::get(&state.pool, portfolio_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch risk settings for {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::ok(settings)))
}

/// PUT /api/risk/portfolios/:portfolio_id/settings
///
/// Only the fields present in the body change. New percentages apply to
/// positions opened afterwards; existing stop and take prices stay put.
pub async fn update_risk_settings(
    Path(portfolio_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(data): Json<UpdateRiskSettings>,
) -> Result<Json<ApiResponse<RiskSettings>>, AppError> {
    info!("PUT /api/risk/portfolios/{}/settings - Updating risk settings", portfolio_id);
    let settings = risk_settings_service::update(&state.pool, portfolio_id, data)
        .await
        .map_err(|e| {
            error!("Failed to update risk settings for {}: {}", portfolio_id, e);
            e
        })?;
    Ok(Json(ApiResponse::with_message(settings, "Risk settings updated")))
}
