use axum::Router;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::AppConfig;
use crate::routes::{health, portfolios, positions, risk, transactions};
use crate::state::AppState;

pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let portfolio_routes = portfolios::router()
        .merge(positions::portfolio_scoped())
        .merge(transactions::portfolio_scoped());

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/portfolios", portfolio_routes)
        .nest("/api/positions", positions::router())
        .nest("/api/transactions", transactions::router())
        .nest("/api/risk", risk::router())
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
