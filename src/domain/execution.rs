//! Execution records: the normalized type the engine replays, and the wire
//! shape the webhook backend returns in its per-asset `trades` array.

use std::collections::BTreeSet;

use crate::domain::{AssetName, Decimal, PositionSide, TimeMs, TradeKind, UnknownVariant};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single normalized execution for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Tie-break key for executions sharing a timestamp.
    pub seq: i64,
    pub asset: AssetName,
    pub time_ms: TimeMs,
    pub kind: TradeKind,
    /// Side of the position this execution belongs to, if the backend recorded it.
    pub side: Option<PositionSide>,
    pub quantity: Decimal,
    pub price: Decimal,
    /// PNL multiplier. None means 1.
    pub leverage: Option<u32>,
    /// Notional value, used only for percentage display.
    pub usd_value: Option<Decimal>,
    pub fee: Decimal,
}

impl Execution {
    pub fn new(
        asset: AssetName,
        time_ms: TimeMs,
        kind: TradeKind,
        side: Option<PositionSide>,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Execution {
            seq: 0,
            asset,
            time_ms,
            kind,
            side,
            quantity,
            price,
            leverage: None,
            usd_value: None,
            fee: Decimal::zero(),
        }
    }

    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = Some(leverage);
        self
    }

    pub fn with_usd_value(mut self, usd_value: Decimal) -> Self {
        self.usd_value = Some(usd_value);
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    /// Leverage to apply, treating a missing or zero value as 1x.
    pub fn effective_leverage(&self) -> u32 {
        match self.leverage {
            Some(l) if l > 0 => l,
            _ => 1,
        }
    }

    /// Notional of this execution: `quantity * price`, None on overflow.
    pub fn notional(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }
}

/// Number as the backend sends it: a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Float(f64),
    Text(String),
}

impl WireNumber {
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            WireNumber::Float(f) => Decimal::from_f64(*f),
            WireNumber::Text(s) => Decimal::from_str_canonical(s).ok(),
        }
    }
}

/// Timestamp as the backend sends it: epoch milliseconds or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Text(String),
}

impl WireTimestamp {
    fn to_time_ms(&self) -> Option<TimeMs> {
        match self {
            WireTimestamp::Millis(ms) => Some(TimeMs::new(*ms)),
            WireTimestamp::Text(s) => TimeMs::parse_iso(s),
        }
    }
}

/// Trade record in the backend's snake_case shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireExecution {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub asset_name: Option<String>,
    pub timestamp: WireTimestamp,
    pub trade_type: String,
    #[serde(default)]
    pub side: Option<String>,
    pub quantity: WireNumber,
    pub price: WireNumber,
    #[serde(default)]
    pub leverage: Option<WireNumber>,
    #[serde(default)]
    pub usd_value: Option<WireNumber>,
    #[serde(default)]
    pub fees: Option<WireNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("trade {index}: {source}")]
    UnknownVariant {
        index: usize,
        #[source]
        source: UnknownVariant,
    },
    #[error("trade {index}: missing asset_name")]
    MissingAsset { index: usize },
    #[error("trade {index}: invalid {field}: {reason}")]
    InvalidNumber {
        index: usize,
        field: &'static str,
        reason: &'static str,
    },
    #[error("trade {index}: invalid timestamp {value:?}")]
    InvalidTimestamp { index: usize, value: String },
}

impl WireExecution {
    /// Convert into a typed [`Execution`].
    ///
    /// `index` is the record's position in its batch and is used for error
    /// messages. `default_asset` fills in records that omit `asset_name`.
    pub fn normalize(
        &self,
        index: usize,
        seq: i64,
        default_asset: Option<&AssetName>,
    ) -> Result<Execution, NormalizeError> {
        let kind = self
            .trade_type
            .parse::<TradeKind>()
            .map_err(|source| NormalizeError::UnknownVariant { index, source })?;

        let side = self
            .side
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<PositionSide>)
            .transpose()
            .map_err(|source| NormalizeError::UnknownVariant { index, source })?;

        let asset = match self.asset_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => AssetName::new(name.to_string()),
            _ => default_asset
                .cloned()
                .ok_or(NormalizeError::MissingAsset { index })?,
        };

        let time_ms = self
            .timestamp
            .to_time_ms()
            .ok_or_else(|| NormalizeError::InvalidTimestamp {
                index,
                value: match &self.timestamp {
                    WireTimestamp::Millis(ms) => ms.to_string(),
                    WireTimestamp::Text(s) => s.clone(),
                },
            })?;

        let quantity = positive(&self.quantity, index, "quantity")?;
        let price = positive(&self.price, index, "price")?;
        let leverage = self
            .leverage
            .as_ref()
            .map(|l| parse_leverage(l, index))
            .transpose()?
            .flatten();
        let usd_value = self
            .usd_value
            .as_ref()
            .map(|v| decimal(v, index, "usd_value"))
            .transpose()?;
        let fee = self
            .fees
            .as_ref()
            .map(|v| decimal(v, index, "fees"))
            .transpose()?
            .unwrap_or_default();

        Ok(Execution {
            seq,
            asset,
            time_ms,
            kind,
            side,
            quantity,
            price,
            leverage,
            usd_value,
            fee,
        })
    }
}

fn decimal(value: &WireNumber, index: usize, field: &'static str) -> Result<Decimal, NormalizeError> {
    value.to_decimal().ok_or(NormalizeError::InvalidNumber {
        index,
        field,
        reason: "not a finite number",
    })
}

fn positive(value: &WireNumber, index: usize, field: &'static str) -> Result<Decimal, NormalizeError> {
    let d = decimal(value, index, field)?;
    if !d.is_positive() {
        return Err(NormalizeError::InvalidNumber {
            index,
            field,
            reason: "must be greater than zero",
        });
    }
    Ok(d)
}

/// Zero leverage is kept as "unset" so it defaults to 1x downstream.
fn parse_leverage(value: &WireNumber, index: usize) -> Result<Option<u32>, NormalizeError> {
    let d = decimal(value, index, "leverage")?;
    let invalid = NormalizeError::InvalidNumber {
        index,
        field: "leverage",
        reason: "must be a non-negative integer",
    };
    if d.is_negative() || d.inner().fract() != rust_decimal::Decimal::ZERO {
        return Err(invalid);
    }
    let l = d.inner().to_u32().ok_or(invalid)?;
    Ok((l > 0).then_some(l))
}

/// Normalize a batch of wire records.
///
/// Sequence numbers come from the records' `id` when every record has a
/// distinct one, otherwise from their position in the batch. Either way each execution gets
/// a distinct `seq`, which fixes the order of same-timestamp executions.
pub fn normalize_batch(
    records: &[WireExecution],
    default_asset: Option<&AssetName>,
) -> Result<Vec<Execution>, NormalizeError> {
    let ids: Option<BTreeSet<i64>> = records.iter().map(|r| r.id).collect();
    let use_ids = !records.is_empty() && ids.is_some_and(|ids| ids.len() == records.len());
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let seq = match record.id {
                Some(id) if use_ids => id,
                _ => index as i64,
            };
            record.normalize(index, seq, default_asset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn wire(json: serde_json::Value) -> WireExecution {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_normalize_backend_record() {
        let record = wire(serde_json::json!({
            "id": 7,
            "asset_name": "BTC",
            "timestamp": "2025-08-01T17:37:14.500000",
            "trade_type": "DCA",
            "side": "LONG",
            "quantity": 0.5,
            "price": "64000.5",
            "leverage": 10,
            "usd_value": 32000.25,
            "fees": 1.2
        }));

        let exec = record.normalize(0, 7, None).unwrap();
        assert_eq!(exec.seq, 7);
        assert_eq!(exec.asset.as_str(), "BTC");
        assert_eq!(exec.kind, TradeKind::Add);
        assert_eq!(exec.side, Some(PositionSide::Long));
        assert_eq!(exec.quantity, d("0.5"));
        assert_eq!(exec.price, d("64000.5"));
        assert_eq!(exec.leverage, Some(10));
        assert_eq!(exec.usd_value, Some(d("32000.25")));
        assert_eq!(exec.fee, d("1.2"));
        assert_eq!(exec.time_ms, TimeMs::parse_iso("2025-08-01T17:37:14.5Z").unwrap());
    }

    #[test]
    fn test_normalize_minimal_record_uses_defaults() {
        let record = wire(serde_json::json!({
            "timestamp": 1000,
            "trade_type": "close",
            "quantity": 1,
            "price": 2
        }));
        let asset = AssetName::new("ETH".to_string());

        let exec = record.normalize(3, 3, Some(&asset)).unwrap();
        assert_eq!(exec.asset, asset);
        assert_eq!(exec.kind, TradeKind::Close);
        assert_eq!(exec.side, None);
        assert_eq!(exec.leverage, None);
        assert_eq!(exec.effective_leverage(), 1);
        assert_eq!(exec.fee, Decimal::zero());
    }

    #[test]
    fn test_zero_leverage_defaults_to_one() {
        let record = wire(serde_json::json!({
            "asset_name": "BTC", "timestamp": 1, "trade_type": "BUY",
            "side": "LONG", "quantity": 1, "price": 1, "leverage": 0
        }));
        let exec = record.normalize(0, 0, None).unwrap();
        assert_eq!(exec.leverage, None);
        assert_eq!(exec.effective_leverage(), 1);
    }

    #[test]
    fn test_fractional_leverage_rejected() {
        let record = wire(serde_json::json!({
            "asset_name": "BTC", "timestamp": 1, "trade_type": "BUY",
            "quantity": 1, "price": 1, "leverage": 2.5
        }));
        match record.normalize(4, 4, None) {
            Err(NormalizeError::InvalidNumber { index, field, .. }) => {
                assert_eq!(index, 4);
                assert_eq!(field, "leverage");
            }
            other => panic!("expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_trade_type_rejected() {
        let record = wire(serde_json::json!({
            "asset_name": "BTC", "timestamp": 1, "trade_type": "HEDGE",
            "quantity": 1, "price": 1
        }));
        let err = record.normalize(2, 2, None).unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownVariant { index: 2, .. }));
        assert_eq!(err.to_string(), "trade 2: unrecognized trade_type: \"HEDGE\"");
    }

    #[test]
    fn test_missing_asset_rejected() {
        let record = wire(serde_json::json!({
            "timestamp": 1, "trade_type": "BUY", "quantity": 1, "price": 1
        }));
        assert_eq!(
            record.normalize(0, 0, None).unwrap_err(),
            NormalizeError::MissingAsset { index: 0 }
        );
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let record = wire(serde_json::json!({
            "asset_name": "BTC", "timestamp": 1, "trade_type": "BUY",
            "quantity": 0, "price": 1
        }));
        assert!(matches!(
            record.normalize(0, 0, None),
            Err(NormalizeError::InvalidNumber { field: "quantity", .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let record = wire(serde_json::json!({
            "asset_name": "BTC", "timestamp": "last week", "trade_type": "BUY",
            "quantity": 1, "price": 1
        }));
        assert!(matches!(
            record.normalize(0, 0, None),
            Err(NormalizeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_batch_uses_ids_only_when_all_present() {
        let with_ids = vec![
            wire(serde_json::json!({"id": 40, "asset_name": "BTC", "timestamp": 1, "trade_type": "BUY", "quantity": 1, "price": 1})),
            wire(serde_json::json!({"id": 41, "asset_name": "BTC", "timestamp": 1, "trade_type": "CLOSE", "quantity": 1, "price": 1})),
        ];
        let execs = normalize_batch(&with_ids, None).unwrap();
        assert_eq!(execs[0].seq, 40);
        assert_eq!(execs[1].seq, 41);

        let mixed = vec![
            wire(serde_json::json!({"id": 40, "asset_name": "BTC", "timestamp": 1, "trade_type": "BUY", "quantity": 1, "price": 1})),
            wire(serde_json::json!({"asset_name": "BTC", "timestamp": 1, "trade_type": "CLOSE", "quantity": 1, "price": 1})),
        ];
        let execs = normalize_batch(&mixed, None).unwrap();
        assert_eq!(execs[0].seq, 0);
        assert_eq!(execs[1].seq, 1);
    }

    #[test]
    fn test_batch_falls_back_to_index_on_duplicate_ids() {
        let dup = vec![
            wire(serde_json::json!({"id": 7, "asset_name": "BTC", "timestamp": 1, "trade_type": "BUY", "quantity": 1, "price": 1})),
            wire(serde_json::json!({"id": 7, "asset_name": "BTC", "timestamp": 1, "trade_type": "CLOSE", "quantity": 1, "price": 1})),
            wire(serde_json::json!({"id": 3, "asset_name": "BTC", "timestamp": 1, "trade_type": "ADD", "quantity": 1, "price": 1})),
        ];
        let execs = normalize_batch(&dup, None).unwrap();
        let seqs: Vec<i64> = execs.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }
}
