//! Per-asset and overall trading statistics built on close estimates.

use std::collections::BTreeMap;

use crate::config::PnlMode;
use crate::domain::ordering::asset_history;
use crate::domain::{AssetName, Decimal, Execution, PositionSide, TimeMs, TradeKind};

use super::{CloseEstimate, PnlEstimator, PositionReplay};

#[derive(Debug, Clone, Default)]
pub struct SummaryOptions {
    pub estimator: PnlEstimator,
    pub pnl_mode: PnlMode,
    /// Inclusive window applied to counted executions. Close estimates still
    /// replay the full history before each close.
    pub from_ms: Option<TimeMs>,
    pub to_ms: Option<TimeMs>,
    /// Mark price per asset for unrealized PNL.
    pub mark_prices: BTreeMap<AssetName, Decimal>,
}

impl SummaryOptions {
    fn in_window(&self, time_ms: TimeMs) -> bool {
        self.from_ms.map_or(true, |from| time_ms >= from) && self.to_ms.map_or(true, |to| time_ms <= to)
    }
}

/// Position left open at the end of the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPositionView {
    pub side: Option<PositionSide>,
    pub quantity: Decimal,
    pub avg_entry_px: Decimal,
    pub leverage: u32,
    pub opened_at: TimeMs,
    pub mark_price: Option<Decimal>,
    /// Leveraged unrealized PNL at `mark_price`.
    pub unrealized_pnl: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPerformance {
    pub asset: AssetName,
    pub total_trades: u64,
    pub closing_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: Decimal,
    pub loss_rate: Decimal,
    pub realized_pnl: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_fees: Decimal,
    pub total_volume: Decimal,
    pub net_pnl: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub open_position: Option<OpenPositionView>,
    pub closes: Vec<CloseEstimate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverallStats {
    pub total_trades: u64,
    pub closing_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: Decimal,
    pub loss_rate: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub net_pnl: Decimal,
    pub total_fees: Decimal,
    pub total_volume: Decimal,
    /// Gross profit over absolute gross loss; zero when there are no losses.
    pub profit_factor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceReport {
    pub assets: Vec<AssetPerformance>,
    pub overall: OverallStats,
}

/// Percentages of wins and losses over decided closes (neutral closes excluded).
fn rates(wins: u64, losses: u64) -> (Decimal, Decimal) {
    let decided = Decimal::from_u64(wins + losses);
    let win = Decimal::from_u64(wins).percent_of(decided);
    let loss = Decimal::from_u64(losses).percent_of(decided);
    (win, loss)
}

fn open_position_view(replay: &PositionReplay, mark_price: Option<Decimal>) -> Option<OpenPositionView> {
    let pos = replay.open_position()?;
    let avg_entry_px = pos.avg_entry_px()?;
    let unrealized_pnl = match (mark_price, pos.side) {
        (Some(mark), Some(side)) => {
            let per_unit = match side {
                PositionSide::Long => mark.checked_sub(avg_entry_px),
                PositionSide::Short => avg_entry_px.checked_sub(mark),
            };
            per_unit
                .and_then(|p| p.checked_mul(pos.quantity))
                .and_then(|p| p.checked_mul(Decimal::from_u32(pos.leverage)))
        }
        _ => None,
    };
    Some(OpenPositionView {
        side: pos.side,
        quantity: pos.quantity,
        avg_entry_px,
        leverage: pos.leverage,
        opened_at: pos.opened_at,
        mark_price,
        unrealized_pnl,
    })
}

pub fn summarize_asset(asset: &AssetName, all: &[Execution], opts: &SummaryOptions) -> AssetPerformance {
    let history = asset_history(asset, all);

    let mut replay = PositionReplay::new();
    for exec in &history {
        replay.apply(exec);
    }
    let open_position = open_position_view(&replay, opts.mark_prices.get(asset).copied());

    let counted: Vec<&Execution> = history
        .iter()
        .copied()
        .filter(|e| opts.in_window(e.time_ms))
        .collect();
    let closes: Vec<CloseEstimate> = opts
        .estimator
        .estimate_asset_closes(asset, all)
        .into_iter()
        .filter(|c| opts.in_window(c.time_ms))
        .collect();

    let wins: Vec<Decimal> = closes.iter().map(|c| c.pnl).filter(Decimal::is_positive).collect();
    let losses: Vec<Decimal> = closes.iter().map(|c| c.pnl).filter(Decimal::is_negative).collect();
    let winning_trades = wins.len() as u64;
    let losing_trades = losses.len() as u64;
    let (win_rate, loss_rate) = rates(winning_trades, losing_trades);

    let gross_profit: Decimal = wins.iter().copied().sum();
    let gross_loss: Decimal = losses.iter().copied().sum();
    let realized_pnl = gross_profit.saturating_add(gross_loss);
    let avg_win = gross_profit
        .checked_div(Decimal::from_u64(winning_trades))
        .unwrap_or_default();
    let avg_loss = gross_loss
        .checked_div(Decimal::from_u64(losing_trades))
        .unwrap_or_default();
    let largest_win = wins.iter().copied().max().unwrap_or_default();
    let largest_loss = losses.iter().copied().min().unwrap_or_default();

    let total_fees: Decimal = counted.iter().map(|e| e.fee).sum();
    let total_volume: Decimal = counted.iter().filter_map(|e| e.usd_value).sum();
    let unrealized_pnl = open_position
        .as_ref()
        .and_then(|p| p.unrealized_pnl)
        .unwrap_or_default();

    let mut net_pnl = realized_pnl.saturating_add(unrealized_pnl);
    if opts.pnl_mode == PnlMode::Net {
        net_pnl = net_pnl.saturating_sub(total_fees);
    }

    AssetPerformance {
        asset: asset.clone(),
        total_trades: counted.len() as u64,
        closing_trades: counted.iter().filter(|e| e.kind == TradeKind::Close).count() as u64,
        winning_trades,
        losing_trades,
        win_rate,
        loss_rate,
        realized_pnl,
        gross_profit,
        gross_loss,
        unrealized_pnl,
        total_fees,
        total_volume,
        net_pnl,
        avg_win,
        avg_loss,
        largest_win,
        largest_loss,
        open_position,
        closes,
    }
}

/// Summaries for every asset in `all` (sorted by name) plus totals.
pub fn summarize_all(all: &[Execution], opts: &SummaryOptions) -> PerformanceReport {
    let mut names: Vec<&AssetName> = all.iter().map(|e| &e.asset).collect();
    names.sort();
    names.dedup();

    let assets: Vec<AssetPerformance> = names
        .into_iter()
        .map(|asset| summarize_asset(asset, all, opts))
        .collect();

    let mut overall = OverallStats::default();
    let mut gross_profit = Decimal::zero();
    let mut gross_loss = Decimal::zero();
    for a in &assets {
        overall.total_trades += a.total_trades;
        overall.closing_trades += a.closing_trades;
        overall.winning_trades += a.winning_trades;
        overall.losing_trades += a.losing_trades;
        overall.realized_pnl = overall.realized_pnl.saturating_add(a.realized_pnl);
        overall.unrealized_pnl = overall.unrealized_pnl.saturating_add(a.unrealized_pnl);
        overall.net_pnl = overall.net_pnl.saturating_add(a.net_pnl);
        overall.total_fees = overall.total_fees.saturating_add(a.total_fees);
        overall.total_volume = overall.total_volume.saturating_add(a.total_volume);
        gross_profit = gross_profit.saturating_add(a.gross_profit);
        gross_loss = gross_loss.saturating_add(a.gross_loss);
    }
    let (win_rate, loss_rate) = rates(overall.winning_trades, overall.losing_trades);
    overall.win_rate = win_rate;
    overall.loss_rate = loss_rate;
    overall.profit_factor = gross_profit
        .checked_div(gross_loss.abs())
        .unwrap_or_default();

    PerformanceReport { assets, overall }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn exec(asset: &str, kind: TradeKind, side: PositionSide, qty: &str, px: &str, t: i64) -> Execution {
        Execution::new(
            AssetName::new(asset.to_string()),
            TimeMs::new(t),
            kind,
            Some(side),
            d(qty),
            d(px),
        )
        .with_seq(t)
    }

    fn btc_history() -> Vec<Execution> {
        vec![
            exec("BTC", TradeKind::Open, PositionSide::Long, "1", "100", 0)
                .with_fee(d("1"))
                .with_usd_value(d("100")),
            exec("BTC", TradeKind::Close, PositionSide::Long, "1", "120", 1)
                .with_fee(d("1"))
                .with_usd_value(d("120")),
            exec("BTC", TradeKind::Open, PositionSide::Long, "1", "100", 2).with_fee(d("1")),
            exec("BTC", TradeKind::Close, PositionSide::Long, "1", "90", 3).with_fee(d("1")),
            exec("BTC", TradeKind::Open, PositionSide::Long, "2", "100", 4),
        ]
    }

    #[test]
    fn test_asset_summary_counts_wins_and_losses() {
        let all = btc_history();
        let btc = AssetName::new("BTC".to_string());
        let summary = summarize_asset(&btc, &all, &SummaryOptions::default());

        assert_eq!(summary.total_trades, 5);
        assert_eq!(summary.closing_trades, 2);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.losing_trades, 1);
        assert_eq!(summary.win_rate, d("50"));
        assert_eq!(summary.loss_rate, d("50"));
        assert_eq!(summary.realized_pnl, d("10"));
        assert_eq!(summary.largest_win, d("20"));
        assert_eq!(summary.largest_loss, d("-10"));
        assert_eq!(summary.avg_win, d("20"));
        assert_eq!(summary.avg_loss, d("-10"));
        assert_eq!(summary.total_fees, d("4"));
        assert_eq!(summary.total_volume, d("220"));
        assert_eq!(summary.net_pnl, d("10"));
    }

    #[test]
    fn test_net_mode_subtracts_fees() {
        let all = btc_history();
        let btc = AssetName::new("BTC".to_string());
        let opts = SummaryOptions {
            pnl_mode: PnlMode::Net,
            ..SummaryOptions::default()
        };
        assert_eq!(summarize_asset(&btc, &all, &opts).net_pnl, d("6"));
    }

    #[test]
    fn test_open_position_unrealized_at_mark() {
        let all = btc_history();
        let btc = AssetName::new("BTC".to_string());
        let mut opts = SummaryOptions::default();
        opts.mark_prices.insert(btc.clone(), d("105"));

        let summary = summarize_asset(&btc, &all, &opts);
        let open = summary.open_position.unwrap();
        assert_eq!(open.quantity, d("2"));
        assert_eq!(open.avg_entry_px, d("100"));
        assert_eq!(open.unrealized_pnl, Some(d("10")));
        assert_eq!(summary.unrealized_pnl, d("10"));
        assert_eq!(summary.net_pnl, d("20"));
    }

    #[test]
    fn test_window_limits_counted_closes() {
        let all = btc_history();
        let btc = AssetName::new("BTC".to_string());
        let opts = SummaryOptions {
            from_ms: Some(TimeMs::new(2)),
            ..SummaryOptions::default()
        };
        let summary = summarize_asset(&btc, &all, &opts);
        assert_eq!(summary.total_trades, 3);
        assert_eq!(summary.winning_trades, 0);
        assert_eq!(summary.losing_trades, 1);
        assert_eq!(summary.realized_pnl, d("-10"));
    }

    #[test]
    fn test_no_closes_gives_zero_rates() {
        let all = vec![exec("ETH", TradeKind::Open, PositionSide::Short, "1", "10", 0)];
        let eth = AssetName::new("ETH".to_string());
        let summary = summarize_asset(&eth, &all, &SummaryOptions::default());
        assert_eq!(summary.win_rate, Decimal::zero());
        assert_eq!(summary.loss_rate, Decimal::zero());
        assert_eq!(summary.open_position.unwrap().unrealized_pnl, None);
    }

    #[test]
    fn test_summarize_all_aggregates_assets() {
        let mut all = btc_history();
        all.push(exec("ETH", TradeKind::Open, PositionSide::Short, "2", "50", 0));
        all.push(exec("ETH", TradeKind::Close, PositionSide::Short, "2", "40", 1));

        let report = summarize_all(&all, &SummaryOptions::default());
        let names: Vec<&str> = report.assets.iter().map(|a| a.asset.as_str()).collect();
        assert_eq!(names, vec!["BTC", "ETH"]);

        let overall = &report.overall;
        assert_eq!(overall.total_trades, 7);
        assert_eq!(overall.winning_trades, 2);
        assert_eq!(overall.losing_trades, 1);
        assert_eq!(overall.realized_pnl, d("30"));
        assert_eq!(overall.profit_factor, d("4"));
    }

    #[test]
    fn test_out_of_range_history_does_not_panic() {
        let max = Decimal::new(rust_decimal::Decimal::MAX);
        let mut all = vec![
            exec("BTC", TradeKind::Open, PositionSide::Long, "1000000000000000", "1000000000000000", 0),
            exec("BTC", TradeKind::Close, PositionSide::Long, "1", "1", 1).with_usd_value(max),
        ];
        all.push(exec("ETH", TradeKind::Open, PositionSide::Long, "1", "1", 0).with_usd_value(max));

        let mut opts = SummaryOptions::default();
        opts.mark_prices.insert(AssetName::new("BTC".to_string()), d("1"));
        let report = summarize_all(&all, &opts);

        assert_eq!(report.assets[0].realized_pnl, Decimal::zero());
        assert!(report.assets[0].open_position.is_none());
        assert_eq!(report.overall.total_volume, max);
    }
}
