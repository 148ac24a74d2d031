use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::SnapshotDto;
use crate::api::{parse_asset, AppState};
use crate::domain::WireExecution;
use crate::engine::replay_timeline;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRequest {
    pub asset_name: String,
    pub trades: Vec<WireExecution>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResponse {
    pub asset_name: String,
    pub is_flat: bool,
    /// The replayed quantity or value left the decimal range.
    pub overflowed: bool,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_entry_px: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    pub timeline: Vec<SnapshotDto>,
}

/// Replay one asset's history and return the position after every execution.
pub async fn replay(
    State(state): State<AppState>,
    Json(req): Json<ReplayRequest>,
) -> Result<Json<ReplayResponse>, AppError> {
    let asset = parse_asset(Some(req.asset_name.as_str()))
        .ok_or_else(|| AppError::BadRequest("assetName is required".to_string()))?;
    let executions = state.normalize_trades(&req.trades, Some(&asset))?;

    let (replay, timeline) = replay_timeline(&asset, &executions);
    if timeline.is_empty() {
        return Err(AppError::NotFound(format!("no trades for asset {}", asset)));
    }

    let open = replay.open_position();
    Ok(Json(ReplayResponse {
        asset_name: asset.to_string(),
        is_flat: replay.is_flat(),
        overflowed: replay.is_overflowed(),
        quantity: replay.open_quantity().to_canonical_string(),
        avg_entry_px: replay.avg_entry_px().map(|px| px.to_canonical_string()),
        side: open.and_then(|pos| pos.side).map(|s| s.to_string()),
        timeline: timeline.iter().map(SnapshotDto::from).collect(),
    }))
}
