//! Domain types for execution replay.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, AssetName, PositionSide, TradeKind
//! - Execution records and their wire normalization
//! - Stable execution ordering for deterministic replay

pub mod decimal;
pub mod execution;
pub mod ordering;
pub mod primitives;

pub use decimal::Decimal;
pub use execution::{normalize_batch, Execution, NormalizeError, WireExecution, WireNumber};
pub use ordering::ExecutionOrderingKey;
pub use primitives::{AssetName, PositionSide, TimeMs, TradeKind, UnknownVariant};
