//! Close-execution PNL estimation from a replayed execution log.
//!
//! The estimate is advisory. Whenever no open position can be reconstructed
//! for a close, the result is zero rather than an error.

use crate::domain::ordering::asset_history;
use crate::domain::{AssetName, Decimal, Execution, PositionSide, TimeMs, TradeKind};

use super::{PositionReplay, TieBreak};

/// Estimate for one closing execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEstimate {
    pub asset: AssetName,
    pub time_ms: TimeMs,
    pub seq: i64,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Leveraged PNL; zero when nothing could be attributed.
    pub pnl: Decimal,
    /// `pnl / usd_value * 100`, zero without a usable `usd_value`.
    pub pnl_pct: Decimal,
    /// Average entry price of the position the close was matched against.
    pub avg_entry_px: Option<Decimal>,
    pub side: Option<PositionSide>,
    /// Open quantity immediately before the close.
    pub open_quantity: Decimal,
    pub leverage: u32,
}

impl CloseEstimate {
    fn unattributed(close: &Execution) -> Self {
        CloseEstimate {
            asset: close.asset.clone(),
            time_ms: close.time_ms,
            seq: close.seq,
            quantity: close.quantity,
            price: close.price,
            pnl: Decimal::zero(),
            pnl_pct: Decimal::zero(),
            avg_entry_px: None,
            side: None,
            open_quantity: Decimal::zero(),
            leverage: close.effective_leverage(),
        }
    }
}

/// Estimate the leveraged PNL of `close` against `all` using the default
/// tie-break policy.
pub fn estimate_close_pnl(close: &Execution, all: &[Execution]) -> Decimal {
    PnlEstimator::default().estimate(close, all)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PnlEstimator {
    tie_break: TieBreak,
}

impl PnlEstimator {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Position immediately before `close`, replayed from the same asset's history.
    pub fn replay_before(&self, close: &Execution, all: &[Execution]) -> PositionReplay {
        let mut replay = PositionReplay::new();
        for exec in asset_history(&close.asset, all)
            .into_iter()
            .take_while(|exec| self.tie_break.precedes(exec, close))
        {
            replay.apply(exec);
        }
        replay
    }

    pub fn estimate(&self, close: &Execution, all: &[Execution]) -> Decimal {
        self.estimate_detailed(close, all).pnl
    }

    pub fn estimate_detailed(&self, close: &Execution, all: &[Execution]) -> CloseEstimate {
        if close.kind != TradeKind::Close {
            return CloseEstimate::unattributed(close);
        }
        attribute(close, &self.replay_before(close, all))
    }

    /// Estimates for every close in `all`, ordered by asset then `(time_ms, seq)`.
    pub fn estimate_all_closes(&self, all: &[Execution]) -> Vec<CloseEstimate> {
        let mut assets: Vec<&AssetName> = all.iter().map(|e| &e.asset).collect();
        assets.sort();
        assets.dedup();

        assets
            .into_iter()
            .flat_map(|asset| self.estimate_asset_closes(asset, all))
            .collect()
    }

    /// Estimates for every close of one asset in `(time_ms, seq)` order.
    ///
    /// The history is replayed once. Results match calling
    /// [`PnlEstimator::estimate_detailed`] for each close individually.
    pub fn estimate_asset_closes(&self, asset: &AssetName, all: &[Execution]) -> Vec<CloseEstimate> {
        let history = asset_history(asset, all);
        let mut replay = PositionReplay::new();
        let mut applied = 0;
        let mut estimates = Vec::new();

        for close in history.iter().filter(|e| e.kind == TradeKind::Close) {
            while applied < history.len() && self.tie_break.precedes(history[applied], close) {
                replay.apply(history[applied]);
                applied += 1;
            }
            estimates.push(attribute(close, &replay));
        }
        estimates
    }
}

fn attribute(close: &Execution, replay: &PositionReplay) -> CloseEstimate {
    let mut estimate = CloseEstimate::unattributed(close);

    let pos = match replay.open_position() {
        Some(pos) if pos.lots > 0 && pos.quantity.is_positive() => pos,
        _ => {
            tracing::debug!(asset = %close.asset, time_ms = close.time_ms.as_i64(), "no open position before close");
            return estimate;
        }
    };
    estimate.open_quantity = pos.quantity;

    let Some(avg_entry_px) = pos.avg_entry_px() else {
        return estimate;
    };
    estimate.avg_entry_px = Some(avg_entry_px);

    let Some(side) = pos.side else {
        tracing::debug!(asset = %close.asset, time_ms = close.time_ms.as_i64(), "open position has no side");
        return estimate;
    };
    estimate.side = Some(side);

    let per_unit = match side {
        PositionSide::Long => close.price.checked_sub(avg_entry_px),
        PositionSide::Short => avg_entry_px.checked_sub(close.price),
    };
    let Some(pnl) = per_unit
        .and_then(|p| p.checked_mul(close.quantity))
        .and_then(|p| p.checked_mul(Decimal::from_u32(estimate.leverage)))
    else {
        tracing::debug!(asset = %close.asset, time_ms = close.time_ms.as_i64(), "close pnl left decimal range");
        return estimate;
    };

    estimate.pnl = pnl;
    estimate.pnl_pct = close
        .usd_value
        .map(|usd| pnl.percent_of(usd))
        .unwrap_or_default();
    estimate
}
