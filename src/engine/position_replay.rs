use crate::domain::ordering::asset_history;
use crate::domain::{AssetName, Decimal, Execution, PositionSide, TimeMs, TradeKind};

/// A currently open position for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPosition {
    /// Running open quantity. Never negative.
    pub quantity: Decimal,
    /// Running `sum(quantity * price)` for the open quantity.
    pub value: Decimal,
    /// Side of the first lot that opened this position.
    pub side: Option<PositionSide>,
    /// Effective leverage of the first lot.
    pub leverage: u32,
    /// Number of Open/Add executions folded into this position.
    pub lots: usize,
    pub opened_at: TimeMs,
}

impl OpenPosition {
    /// `value / quantity`, None while quantity is zero.
    pub fn avg_entry_px(&self) -> Option<Decimal> {
        if self.quantity.is_positive() {
            self.value.checked_div(self.quantity)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    Flat,
    Open(OpenPosition),
    /// Running quantity or value left the decimal range. Terminal: every
    /// later execution is ignored and closes attribute nothing.
    Overflowed,
}

/// What a single execution did to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Transition {
    /// Flat to open.
    Opened,
    /// Open position grew.
    Increased,
    /// Partial close; average entry price unchanged.
    Reduced,
    /// Full or over-close back to flat.
    Closed,
    /// Close while already flat, or any execution after an overflow.
    Ignored,
    /// This execution pushed the position out of the decimal range.
    Overflowed,
}

/// Replays executions for a single asset.
///
/// Callers feed executions in `(time_ms, seq)` order; [`asset_history`]
/// produces that order.
#[derive(Debug, Clone, Default)]
pub struct PositionReplay {
    state: ReplayState,
}

impl PositionReplay {
    pub fn new() -> Self {
        Self {
            state: ReplayState::Flat,
        }
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.state, ReplayState::Flat)
    }

    pub fn is_overflowed(&self) -> bool {
        matches!(self.state, ReplayState::Overflowed)
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        match &self.state {
            ReplayState::Open(pos) => Some(pos),
            ReplayState::Flat | ReplayState::Overflowed => None,
        }
    }

    pub fn open_quantity(&self) -> Decimal {
        self.open_position()
            .map(|pos| pos.quantity)
            .unwrap_or_default()
    }

    pub fn avg_entry_px(&self) -> Option<Decimal> {
        self.open_position().and_then(OpenPosition::avg_entry_px)
    }

    /// Fold one execution into the running position.
    pub fn apply(&mut self, exec: &Execution) -> Transition {
        let transition = if self.is_overflowed() {
            Transition::Ignored
        } else if exec.kind.is_increase() {
            self.handle_increase(exec)
        } else {
            self.handle_close(exec)
        };

        if transition == Transition::Overflowed {
            tracing::debug!(asset = %exec.asset, time_ms = exec.time_ms.as_i64(), seq = exec.seq, "position left decimal range");
            self.state = ReplayState::Overflowed;
        }
        transition
    }

    fn handle_increase(&mut self, exec: &Execution) -> Transition {
        let Some(notional) = exec.notional() else {
            return Transition::Overflowed;
        };

        match &mut self.state {
            ReplayState::Open(pos) => {
                let (Some(quantity), Some(value)) = (
                    pos.quantity.checked_add(exec.quantity),
                    pos.value.checked_add(notional),
                ) else {
                    return Transition::Overflowed;
                };
                pos.quantity = quantity;
                pos.value = value;
                pos.lots += 1;
                Transition::Increased
            }
            ReplayState::Flat => {
                self.state = ReplayState::Open(OpenPosition {
                    quantity: exec.quantity,
                    value: notional,
                    side: exec.side,
                    leverage: exec.effective_leverage(),
                    lots: 1,
                    opened_at: exec.time_ms,
                });
                Transition::Opened
            }
            ReplayState::Overflowed => Transition::Ignored,
        }
    }

    fn handle_close(&mut self, exec: &Execution) -> Transition {
        let pos = match &mut self.state {
            ReplayState::Open(pos) => pos,
            ReplayState::Flat | ReplayState::Overflowed => return Transition::Ignored,
        };

        let removed = exec.quantity.max(Decimal::zero()).min(pos.quantity);
        let remaining = pos.quantity - removed;

        if !remaining.is_positive() {
            self.state = ReplayState::Flat;
            return Transition::Closed;
        }

        // Average price before this close; pos.quantity > 0 here.
        let Some(value) = pos
            .value
            .checked_div(pos.quantity)
            .and_then(|avg_px| remaining.checked_mul(avg_px))
        else {
            return Transition::Overflowed;
        };
        pos.quantity = remaining;
        pos.value = value;
        Transition::Reduced
    }
}

/// Position after one execution in a replayed timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub time_ms: TimeMs,
    pub seq: i64,
    pub kind: TradeKind,
    pub transition: Transition,
    pub quantity: Decimal,
    pub avg_entry_px: Option<Decimal>,
    pub side: Option<PositionSide>,
}

/// Replay an asset's full history, recording the position after each execution.
pub fn replay_timeline(asset: &AssetName, all: &[Execution]) -> (PositionReplay, Vec<PositionSnapshot>) {
    let mut replay = PositionReplay::new();
    let snapshots: Vec<PositionSnapshot> = asset_history(asset, all)
        .into_iter()
        .map(|exec| {
            let transition = replay.apply(exec);
            PositionSnapshot {
                time_ms: exec.time_ms,
                seq: exec.seq,
                kind: exec.kind,
                transition,
                quantity: replay.open_quantity(),
                avg_entry_px: replay.avg_entry_px(),
                side: replay.open_position().and_then(|pos| pos.side),
            }
        })
        .collect();
    (replay, snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn exec(kind: TradeKind, qty: &str, px: &str, time_ms: i64) -> Execution {
        Execution::new(
            AssetName::new("BTC".to_string()),
            TimeMs::new(time_ms),
            kind,
            Some(PositionSide::Long),
            d(qty),
            d(px),
        )
        .with_seq(time_ms)
    }

    #[test]
    fn test_open_then_add_averages_price() {
        let mut replay = PositionReplay::new();
        assert_eq!(replay.apply(&exec(TradeKind::Open, "10", "100", 0)), Transition::Opened);
        assert_eq!(replay.apply(&exec(TradeKind::Add, "10", "200", 1)), Transition::Increased);

        let pos = replay.open_position().unwrap();
        assert_eq!(pos.quantity, d("20"));
        assert_eq!(pos.value, d("3000"));
        assert_eq!(pos.lots, 2);
        assert_eq!(replay.avg_entry_px(), Some(d("150")));
    }

    #[test]
    fn test_partial_close_preserves_average() {
        let mut replay = PositionReplay::new();
        replay.apply(&exec(TradeKind::Open, "10", "100", 0));
        replay.apply(&exec(TradeKind::Add, "10", "200", 1));
        assert_eq!(replay.apply(&exec(TradeKind::Close, "5", "999", 2)), Transition::Reduced);

        assert_eq!(replay.open_quantity(), d("15"));
        assert_eq!(replay.avg_entry_px(), Some(d("150")));
        assert_eq!(replay.open_position().unwrap().value, d("2250"));
    }

    #[test]
    fn test_over_close_clamps_to_flat() {
        let mut replay = PositionReplay::new();
        replay.apply(&exec(TradeKind::Open, "3", "100", 0));
        assert_eq!(replay.apply(&exec(TradeKind::Close, "7", "110", 1)), Transition::Closed);

        assert!(replay.is_flat());
        assert_eq!(replay.open_quantity(), Decimal::zero());
        assert_eq!(replay.avg_entry_px(), None);
    }

    #[test]
    fn test_close_while_flat_is_ignored() {
        let mut replay = PositionReplay::new();
        assert_eq!(replay.apply(&exec(TradeKind::Close, "1", "100", 0)), Transition::Ignored);
        assert!(replay.is_flat());
    }

    #[test]
    fn test_reopen_after_flat_takes_new_side() {
        let mut replay = PositionReplay::new();
        replay.apply(&exec(TradeKind::Open, "1", "100", 0));
        replay.apply(&exec(TradeKind::Close, "1", "110", 1));

        let mut short = exec(TradeKind::Open, "2", "120", 2);
        short.side = Some(PositionSide::Short);
        short.leverage = Some(3);
        replay.apply(&short);

        let pos = replay.open_position().unwrap();
        assert_eq!(pos.side, Some(PositionSide::Short));
        assert_eq!(pos.leverage, 3);
        assert_eq!(pos.opened_at, TimeMs::new(2));
        assert_eq!(pos.avg_entry_px(), Some(d("120")));
    }

    #[test]
    fn test_add_keeps_first_lot_side() {
        let mut replay = PositionReplay::new();
        replay.apply(&exec(TradeKind::Open, "1", "100", 0));
        let mut add = exec(TradeKind::Add, "1", "100", 1);
        add.side = Some(PositionSide::Short);
        replay.apply(&add);

        assert_eq!(replay.open_position().unwrap().side, Some(PositionSide::Long));
    }

    #[test]
    fn test_notional_overflow_latches() {
        let mut replay = PositionReplay::new();
        let huge = exec(TradeKind::Open, "1000000000000000", "1000000000000000", 0);
        assert_eq!(replay.apply(&huge), Transition::Overflowed);
        assert!(replay.is_overflowed());
        assert_eq!(replay.open_quantity(), Decimal::zero());

        assert_eq!(replay.apply(&exec(TradeKind::Open, "1", "100", 1)), Transition::Ignored);
        assert_eq!(replay.apply(&exec(TradeKind::Close, "1", "100", 2)), Transition::Ignored);
        assert!(replay.is_overflowed());
    }

    #[test]
    fn test_running_value_overflow_on_add() {
        let mut replay = PositionReplay::new();
        let lot = exec(TradeKind::Open, "100000000000000", "500000000000000", 0);
        assert_eq!(replay.apply(&lot), Transition::Opened);

        let mut add = lot.clone();
        add.kind = TradeKind::Add;
        add.seq = 1;
        assert_eq!(replay.apply(&add), Transition::Overflowed);
        assert!(replay.open_position().is_none());
    }

    #[test]
    fn test_timeline_records_each_step() {
        let asset = AssetName::new("BTC".to_string());
        let mut other = exec(TradeKind::Open, "50", "1", 1);
        other.asset = AssetName::new("ETH".to_string());
        let all = vec![
            exec(TradeKind::Close, "4", "130", 3),
            exec(TradeKind::Open, "4", "100", 0),
            other,
            exec(TradeKind::Add, "4", "120", 2),
        ];

        let (replay, timeline) = replay_timeline(&asset, &all);
        let transitions: Vec<Transition> = timeline.iter().map(|s| s.transition).collect();
        assert_eq!(
            transitions,
            vec![Transition::Opened, Transition::Increased, Transition::Reduced]
        );
        assert_eq!(timeline[1].avg_entry_px, Some(d("110")));
        assert_eq!(timeline[2].quantity, d("4"));
        assert_eq!(timeline[2].avg_entry_px, Some(d("110")));
        assert_eq!(replay.open_quantity(), d("4"));
    }
}
