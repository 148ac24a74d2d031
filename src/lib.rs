pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::Config;
pub use domain::{AssetName, Decimal, Execution, PositionSide, TimeMs, TradeKind};
pub use engine::{estimate_close_pnl, PnlEstimator, PositionReplay, TieBreak};
pub use error::AppError;
