use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::config::PnlMode;
use crate::engine::TieBreak;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Readiness plus the replay policy this instance applies.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tie_break = match state.config.tie_break {
        TieBreak::StrictTimestamp => "strict",
        TieBreak::Sequence => "sequence",
    };
    let pnl_mode = match state.config.pnl_mode {
        PnlMode::Gross => "gross",
        PnlMode::Net => "net",
    };
    Json(serde_json::json!({
        "status": "ready",
        "tieBreak": tie_break,
        "pnlMode": pnl_mode,
    }))
}
