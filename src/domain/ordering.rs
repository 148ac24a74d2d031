//! Stable execution ordering for deterministic replay.

use crate::domain::{AssetName, Execution};

/// Ordering key for executions: `time_ms` first, then `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExecutionOrderingKey {
    pub time_ms: i64,
    pub seq: i64,
}

impl ExecutionOrderingKey {
    pub fn from_execution(exec: &Execution) -> Self {
        ExecutionOrderingKey {
            time_ms: exec.time_ms.as_i64(),
            seq: exec.seq,
        }
    }
}

/// Borrow the executions for one asset in replay order.
pub fn asset_history<'a>(asset: &AssetName, all: &'a [Execution]) -> Vec<&'a Execution> {
    let mut history: Vec<&Execution> = all.iter().filter(|e| &e.asset == asset).collect();
    history.sort_by_key(|e| ExecutionOrderingKey::from_execution(e));
    history
}
