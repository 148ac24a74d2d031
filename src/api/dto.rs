//! Response shapes. Numbers are canonical decimal strings.

use serde::Serialize;

use crate::engine::{
    AssetPerformance, CloseEstimate, OpenPositionView, OverallStats, PositionSnapshot,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseEstimateDto {
    pub asset_name: String,
    pub time_ms: i64,
    pub seq: i64,
    pub quantity: String,
    pub price: String,
    pub pnl: String,
    pub pnl_pct: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_entry_px: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    pub open_quantity: String,
    pub leverage: u32,
}

impl From<&CloseEstimate> for CloseEstimateDto {
    fn from(e: &CloseEstimate) -> Self {
        CloseEstimateDto {
            asset_name: e.asset.to_string(),
            time_ms: e.time_ms.as_i64(),
            seq: e.seq,
            quantity: e.quantity.to_canonical_string(),
            price: e.price.to_canonical_string(),
            pnl: e.pnl.to_canonical_string(),
            pnl_pct: e.pnl_pct.to_canonical_string(),
            avg_entry_px: e.avg_entry_px.map(|px| px.to_canonical_string()),
            side: e.side.map(|s| s.to_string()),
            open_quantity: e.open_quantity.to_canonical_string(),
            leverage: e.leverage,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPositionDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    pub quantity: String,
    pub avg_entry_px: String,
    pub leverage: u32,
    pub opened_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<String>,
}

impl From<&OpenPositionView> for OpenPositionDto {
    fn from(p: &OpenPositionView) -> Self {
        OpenPositionDto {
            side: p.side.map(|s| s.to_string()),
            quantity: p.quantity.to_canonical_string(),
            avg_entry_px: p.avg_entry_px.to_canonical_string(),
            leverage: p.leverage,
            opened_at_ms: p.opened_at.as_i64(),
            mark_price: p.mark_price.map(|m| m.to_canonical_string()),
            unrealized_pnl: p.unrealized_pnl.map(|u| u.to_canonical_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub time_ms: i64,
    pub seq: i64,
    pub trade_type: String,
    pub transition: crate::engine::Transition,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_entry_px: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

impl From<&PositionSnapshot> for SnapshotDto {
    fn from(s: &PositionSnapshot) -> Self {
        SnapshotDto {
            time_ms: s.time_ms.as_i64(),
            seq: s.seq,
            trade_type: s.kind.to_string(),
            transition: s.transition,
            quantity: s.quantity.to_canonical_string(),
            avg_entry_px: s.avg_entry_px.map(|px| px.to_canonical_string()),
            side: s.side.map(|side| side.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPerformanceDto {
    pub asset_name: String,
    pub total_trades: u64,
    pub closing_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: String,
    pub loss_rate: String,
    pub realized_pnl: String,
    pub unrealized_pnl: String,
    pub total_fees: String,
    pub total_volume: String,
    pub net_pnl: String,
    pub avg_win: String,
    pub avg_loss: String,
    pub largest_win: String,
    pub largest_loss: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_position: Option<OpenPositionDto>,
    pub closes: Vec<CloseEstimateDto>,
}

impl From<&AssetPerformance> for AssetPerformanceDto {
    fn from(a: &AssetPerformance) -> Self {
        AssetPerformanceDto {
            asset_name: a.asset.to_string(),
            total_trades: a.total_trades,
            closing_trades: a.closing_trades,
            winning_trades: a.winning_trades,
            losing_trades: a.losing_trades,
            win_rate: a.win_rate.to_canonical_string(),
            loss_rate: a.loss_rate.to_canonical_string(),
            realized_pnl: a.realized_pnl.to_canonical_string(),
            unrealized_pnl: a.unrealized_pnl.to_canonical_string(),
            total_fees: a.total_fees.to_canonical_string(),
            total_volume: a.total_volume.to_canonical_string(),
            net_pnl: a.net_pnl.to_canonical_string(),
            avg_win: a.avg_win.to_canonical_string(),
            avg_loss: a.avg_loss.to_canonical_string(),
            largest_win: a.largest_win.to_canonical_string(),
            largest_loss: a.largest_loss.to_canonical_string(),
            open_position: a.open_position.as_ref().map(OpenPositionDto::from),
            closes: a.closes.iter().map(CloseEstimateDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStatsDto {
    pub total_trades: u64,
    pub closing_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: String,
    pub loss_rate: String,
    pub realized_pnl: String,
    pub unrealized_pnl: String,
    pub net_pnl: String,
    pub total_fees: String,
    pub total_volume: String,
    pub profit_factor: String,
}

impl From<&OverallStats> for OverallStatsDto {
    fn from(o: &OverallStats) -> Self {
        OverallStatsDto {
            total_trades: o.total_trades,
            closing_trades: o.closing_trades,
            winning_trades: o.winning_trades,
            losing_trades: o.losing_trades,
            win_rate: o.win_rate.to_canonical_string(),
            loss_rate: o.loss_rate.to_canonical_string(),
            realized_pnl: o.realized_pnl.to_canonical_string(),
            unrealized_pnl: o.unrealized_pnl.to_canonical_string(),
            net_pnl: o.net_pnl.to_canonical_string(),
            total_fees: o.total_fees.to_canonical_string(),
            total_volume: o.total_volume.to_canonical_string(),
            profit_factor: o.profit_factor.to_canonical_string(),
        }
    }
}
