use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::CloseEstimateDto;
use crate::api::{parse_asset, AppState};
use crate::domain::WireExecution;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub asset_name: Option<String>,
    pub trades: Vec<WireExecution>,
    pub close_index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub estimate: CloseEstimateDto,
}

/// Estimate the PNL of `trades[closeIndex]` against the rest of the history.
pub async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, AppError> {
    let default_asset = parse_asset(req.asset_name.as_deref());
    let executions = state.normalize_trades(&req.trades, default_asset.as_ref())?;

    let close = executions.get(req.close_index).ok_or_else(|| {
        AppError::BadRequest(format!(
            "closeIndex {} out of range for {} trades",
            req.close_index,
            executions.len()
        ))
    })?;

    let estimate = state.estimator.estimate_detailed(close, &executions);
    tracing::info!(
        asset = %estimate.asset,
        time_ms = estimate.time_ms.as_i64(),
        trades = executions.len(),
        pnl = %estimate.pnl,
        "Estimated close pnl"
    );

    Ok(Json(EstimateResponse {
        estimate: CloseEstimateDto::from(&estimate),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosesRequest {
    pub asset_name: Option<String>,
    pub trades: Vec<WireExecution>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosesResponse {
    pub closes: Vec<CloseEstimateDto>,
    pub total_pnl: String,
}

/// Estimate every close in the posted history.
pub async fn closes(
    State(state): State<AppState>,
    Json(req): Json<ClosesRequest>,
) -> Result<Json<ClosesResponse>, AppError> {
    let default_asset = parse_asset(req.asset_name.as_deref());
    let executions = state.normalize_trades(&req.trades, default_asset.as_ref())?;

    let estimates = state.estimator.estimate_all_closes(&executions);
    let total_pnl: crate::domain::Decimal = estimates.iter().map(|e| e.pnl).sum();
    tracing::info!(trades = executions.len(), closes = estimates.len(), "Estimated closes");

    Ok(Json(ClosesResponse {
        closes: estimates.iter().map(CloseEstimateDto::from).collect(),
        total_pnl: total_pnl.to_canonical_string(),
    }))
}
