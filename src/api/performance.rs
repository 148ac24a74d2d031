use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::{AssetPerformanceDto, OverallStatsDto};
use crate::api::{parse_asset, AppState};
use crate::domain::{AssetName, TimeMs, WireExecution, WireNumber};
use crate::engine::{summarize_all, SummaryOptions};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRequest {
    pub asset_name: Option<String>,
    pub trades: Vec<WireExecution>,
    #[serde(default)]
    pub mark_prices: BTreeMap<String, WireNumber>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub assets: Vec<AssetPerformanceDto>,
    pub overall: OverallStatsDto,
}

pub async fn get_performance(
    State(state): State<AppState>,
    Json(req): Json<PerformanceRequest>,
) -> Result<Json<PerformanceResponse>, AppError> {
    let from_ms = req.from_ms.map(TimeMs::new);
    let to_ms = req.to_ms.map(TimeMs::new);
    if let (Some(from), Some(to)) = (from_ms, to_ms) {
        if from > to {
            return Err(AppError::BadRequest("fromMs must be <= toMs".to_string()));
        }
    }

    let mut mark_prices = BTreeMap::new();
    for (name, price) in &req.mark_prices {
        let px = price
            .to_decimal()
            .filter(|px| px.is_positive())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid mark price for {}", name)))?;
        mark_prices.insert(AssetName::new(name.trim().to_string()), px);
    }

    let default_asset = parse_asset(req.asset_name.as_deref());
    let executions = state.normalize_trades(&req.trades, default_asset.as_ref())?;

    let opts = SummaryOptions {
        estimator: state.estimator,
        pnl_mode: state.config.pnl_mode,
        from_ms,
        to_ms,
        mark_prices,
    };
    let trade_count = executions.len();
    let report = tokio::task::spawn_blocking(move || summarize_all(&executions, &opts)).await?;

    tracing::info!(
        trades = trade_count,
        assets = report.assets.len(),
        realized_pnl = %report.overall.realized_pnl,
        "Computed asset performance"
    );

    Ok(Json(PerformanceResponse {
        assets: report.assets.iter().map(AssetPerformanceDto::from).collect(),
        overall: OverallStatsDto::from(&report.overall),
    }))
}
