//! Domain primitives: TimeMs, AssetName, PositionSide, TradeKind.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Parse an RFC 3339 / ISO-8601 timestamp.
    ///
    /// Strings without an offset (`2025-08-01T17:37:14.123`) are read as UTC,
    /// which is how the webhook backend stores them.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(TimeMs(dt.timestamp_millis()));
        }
        const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
        NAIVE_FORMATS.iter().find_map(|fmt| {
            chrono::NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|naive| TimeMs(naive.and_utc().timestamp_millis()))
        })
    }
}

/// Traded instrument identifier (e.g., "BTC", "ETHUSDT.P").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetName(pub String);

impl AssetName {
    /// Create an AssetName from a string.
    pub fn new(name: String) -> Self {
        AssetName(name)
    }

    /// Get the asset name as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Normalized execution type.
///
/// Wire strings collapse into three variants:
/// `OPEN`/`BUY`/`SELL` open a lot, `ADD`/`DCA` add to it,
/// `CLOSE`/`REDUCE` take quantity off the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Open,
    Add,
    Close,
}

impl TradeKind {
    /// True for executions that grow the position.
    pub fn is_increase(&self) -> bool {
        matches!(self, TradeKind::Open | TradeKind::Add)
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Open => write!(f, "OPEN"),
            TradeKind::Add => write!(f, "ADD"),
            TradeKind::Close => write!(f, "CLOSE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {field}: {value:?}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl FromStr for TradeKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" | "BUY" | "SELL" => Ok(TradeKind::Open),
            "ADD" | "DCA" => Ok(TradeKind::Add),
            "CLOSE" | "REDUCE" => Ok(TradeKind::Close),
            _ => Err(UnknownVariant {
                field: "trade_type",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for PositionSide {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" => Ok(PositionSide::Long),
            "SHORT" => Ok(PositionSide::Short),
            _ => Err(UnknownVariant {
                field: "side",
                value: s.to_string(),
            }),
        }
    }
}
