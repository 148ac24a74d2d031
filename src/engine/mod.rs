//! Pure computation engine(s) for execution replay and PNL attribution.

use crate::domain::{Execution, ExecutionOrderingKey};

pub mod performance;
pub mod pnl_estimator;
pub mod position_replay;

pub use performance::{
    summarize_all, summarize_asset, AssetPerformance, OpenPositionView, OverallStats,
    PerformanceReport, SummaryOptions,
};
pub use pnl_estimator::{estimate_close_pnl, CloseEstimate, PnlEstimator};
pub use position_replay::{
    replay_timeline, OpenPosition, PositionReplay, PositionSnapshot, ReplayState, Transition,
};

/// Which prior executions a close is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Only executions with a strictly earlier timestamp are replayed.
    /// Executions sharing the close's timestamp are left out.
    #[default]
    StrictTimestamp,
    /// Executions ordered before the close by `(time_ms, seq)` are replayed,
    /// so same-timestamp executions with a lower seq count.
    Sequence,
}

impl TieBreak {
    /// True if `exec` belongs to the history replayed before `close`.
    pub fn precedes(&self, exec: &Execution, close: &Execution) -> bool {
        match self {
            TieBreak::StrictTimestamp => exec.time_ms < close.time_ms,
            TieBreak::Sequence => {
                ExecutionOrderingKey::from_execution(exec)
                    < ExecutionOrderingKey::from_execution(close)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetName, Decimal, PositionSide, TimeMs, TradeKind};

    fn exec(time_ms: i64, seq: i64) -> Execution {
        Execution::new(
            AssetName::new("BTC".to_string()),
            TimeMs::new(time_ms),
            TradeKind::Open,
            Some(PositionSide::Long),
            Decimal::one(),
            Decimal::one(),
        )
        .with_seq(seq)
    }

    #[test]
    fn test_strict_timestamp_excludes_ties() {
        let close = exec(1000, 5);
        assert!(TieBreak::StrictTimestamp.precedes(&exec(999, 9), &close));
        assert!(!TieBreak::StrictTimestamp.precedes(&exec(1000, 1), &close));
        assert!(!TieBreak::StrictTimestamp.precedes(&exec(1001, 0), &close));
    }

    #[test]
    fn test_sequence_includes_lower_seq_ties() {
        let close = exec(1000, 5);
        assert!(TieBreak::Sequence.precedes(&exec(1000, 1), &close));
        assert!(!TieBreak::Sequence.precedes(&exec(1000, 5), &close));
        assert!(!TieBreak::Sequence.precedes(&exec(1000, 6), &close));
    }
}
