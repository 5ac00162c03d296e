//! Bought/Sold notifications published while a backtest runs.
//!
//! Observers are invoked synchronously, in registration order, as each
//! transaction is recorded.

use chrono::NaiveDateTime;

use crate::domain::candle::SeriesId;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub series: SeriesId,
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub quantity: f64,
    /// Absolute cash spent or received.
    pub cash_flow: f64,
    /// Asset cash after the trade.
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BacktestEvent {
    Bought(TradeEvent),
    Sold { trade: TradeEvent, profit_ratio: f64 },
}

impl BacktestEvent {
    pub fn trade(&self) -> &TradeEvent {
        match self {
            BacktestEvent::Bought(trade) => trade,
            BacktestEvent::Sold { trade, .. } => trade,
        }
    }
}

pub trait BacktestObserver: Send + Sync {
    fn notify(&self, event: &BacktestEvent);
}

impl<F> BacktestObserver for F
where
    F: Fn(&BacktestEvent) + Send + Sync,
{
    fn notify(&self, event: &BacktestEvent) {
        self(event)
    }
}
