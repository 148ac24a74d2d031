pub mod dto;
pub mod health;
pub mod performance;
pub mod pnl;
pub mod positions;

use crate::config::Config;
use crate::domain::{normalize_batch, AssetName, Execution, WireExecution};
use crate::engine::PnlEstimator;
use crate::error::AppError;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub estimator: PnlEstimator,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let estimator = PnlEstimator::new(config.tie_break);
        Self { config, estimator }
    }

    /// Validate batch size and normalize wire trades.
    pub(crate) fn normalize_trades(
        &self,
        trades: &[WireExecution],
        default_asset: Option<&AssetName>,
    ) -> Result<Vec<Execution>, AppError> {
        if trades.len() > self.config.max_trades_per_request {
            return Err(AppError::BadRequest(format!(
                "too many trades: {} (limit {})",
                trades.len(),
                self.config.max_trades_per_request
            )));
        }
        Ok(normalize_batch(trades, default_asset)?)
    }
}

/// Trim an optional asset name, dropping empty strings.
pub(crate) fn parse_asset(input: Option<&str>) -> Option<AssetName> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| AssetName::new(s.to_string()))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/pnl/estimate", post(pnl::estimate))
        .route("/v1/pnl/closes", post(pnl::closes))
        .route("/v1/positions/replay", post(positions::replay))
        .route("/v1/assets/performance", post(performance::get_performance))
        .layer(cors)
        .with_state(state)
}
