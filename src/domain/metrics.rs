//! Summary figures derived from a backtest result.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::domain::candle::SeriesId;
use crate::domain::transaction::{BacktestResult, Transaction, TransactionType};

/// A Buy matched with the Sell that closed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub series: SeriesId,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub profit_ratio: f64,
}

impl RoundTrip {
    fn from_pair(buy: &Transaction, sell: &Transaction) -> Self {
        let pnl = sell.cash_flow - buy.cash_flow;
        RoundTrip {
            series: buy.series,
            entry_time: buy.timestamp,
            exit_time: sell.timestamp,
            entry_price: buy.price,
            exit_price: sell.price,
            pnl,
            profit_ratio: if buy.cash_flow == 0.0 {
                0.0
            } else {
                pnl / buy.cash_flow
            },
        }
    }
}

/// Pairs each Buy with the next Sell of the same series. A trailing Buy stays
/// open and is not returned.
pub fn round_trips(result: &BacktestResult) -> Vec<RoundTrip> {
    let mut open: BTreeMap<SeriesId, &Transaction> = BTreeMap::new();
    let mut trips = Vec::new();
    for tx in &result.transactions {
        match tx.kind {
            TransactionType::Buy => {
                open.insert(tx.series, tx);
            }
            TransactionType::Sell => {
                if let Some(buy) = open.remove(&tx.series) {
                    trips.push(RoundTrip::from_pair(buy, tx));
                }
            }
        }
    }
    trips
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub series: SeriesId,
    pub initial: f64,
    pub final_cash: f64,
    pub trades: usize,
    pub holding: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Days between entry and exit, averaged over closed round trips.
    pub avg_trade_duration: f64,
    pub per_series: Vec<SeriesSummary>,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let principal = result.total_principal();
        let total_return = if principal > 0.0 {
            (result.corrected_balance() - principal) / principal
        } else {
            0.0
        };

        let trips = round_trips(result);
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_days = 0i64;

        for trip in &trips {
            let pnl = trip.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_duration_days += (trip.exit_time - trip.entry_time).num_days();
        }

        let total_trades = trips.len();
        let ratio = |num: f64, den: usize| if den > 0 { num / den as f64 } else { 0.0 };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let open = result.open_positions();
        let per_series = result
            .initial
            .iter()
            .map(|(&series, &initial)| SeriesSummary {
                series,
                initial,
                final_cash: result.final_cash.get(&series).copied().unwrap_or(initial),
                trades: result.transactions_for(series).count(),
                holding: open.iter().any(|t| t.series == series),
            })
            .collect();

        Metrics {
            total_return,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate: ratio(trades_won as f64, total_trades),
            profit_factor,
            avg_win: ratio(total_wins, trades_won),
            avg_loss: ratio(total_losses, trades_lost),
            largest_win,
            largest_loss,
            avg_trade_duration: ratio(total_duration_days as f64, total_trades),
            per_series,
        }
    }
}
