//! Executed transactions and the aggregate backtest result.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::candle::SeriesId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Buy,
    Sell,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "BUY"),
            TransactionType::Sell => write!(f, "SELL"),
        }
    }
}

/// One fill at a candle's open. `cash_flow` is the absolute amount spent
/// (Buy) or received (Sell).
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub series: SeriesId,
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub kind: TransactionType,
    pub price: f64,
    pub quantity: f64,
    pub cash_flow: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    pub initial: BTreeMap<SeriesId, f64>,
    pub final_cash: BTreeMap<SeriesId, f64>,
    pub transactions: Vec<Transaction>,
}

impl BacktestResult {
    pub fn transactions_for(&self, series: SeriesId) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(move |t| t.series == series)
    }

    pub fn total_principal(&self) -> f64 {
        self.initial.values().sum()
    }

    pub fn total_final_cash(&self) -> f64 {
        self.final_cash.values().sum()
    }

    /// Buys not yet matched by a sell, one per series at most.
    pub fn open_positions(&self) -> Vec<&Transaction> {
        self.final_cash
            .keys()
            .filter_map(|&id| self.transactions_for(id).last())
            .filter(|t| t.kind == TransactionType::Buy)
            .collect()
    }

    /// Final cash plus open positions valued at what they cost.
    pub fn corrected_balance(&self) -> f64 {
        self.total_final_cash()
            + self
                .open_positions()
                .iter()
                .map(|t| t.cash_flow)
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{day, series_from_closes};

    fn tx(series: SeriesId, index: usize, kind: TransactionType, cash_flow: f64) -> Transaction {
        Transaction {
            series,
            index,
            timestamp: day(index),
            kind,
            price: 100.0,
            quantity: 1.0,
            cash_flow,
        }
    }

    #[test]
    fn transaction_type_display() {
        assert_eq!(TransactionType::Buy.to_string(), "BUY");
        assert_eq!(TransactionType::Sell.to_string(), "SELL");
    }

    #[test]
    fn open_positions_and_corrected_balance() {
        let a = series_from_closes(&[1.0]).id();
        let b = series_from_closes(&[1.0]).id();
        let mut result = BacktestResult::default();
        result.initial.insert(a, 500.0);
        result.initial.insert(b, 500.0);
        result.final_cash.insert(a, 0.0);
        result.final_cash.insert(b, 550.0);
        result.transactions = vec![
            tx(a, 1, TransactionType::Buy, 500.0),
            tx(b, 1, TransactionType::Buy, 500.0),
            tx(b, 3, TransactionType::Sell, 550.0),
        ];

        assert_eq!(result.total_principal(), 1000.0);
        assert_eq!(result.total_final_cash(), 550.0);
        let open = result.open_positions();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].series, a);
        assert_eq!(result.corrected_balance(), 1050.0);
        assert_eq!(result.transactions_for(b).count(), 2);
    }
}
