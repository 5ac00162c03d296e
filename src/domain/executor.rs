//! Buy/sell rule executor.
//!
//! Walks one asset's index range once, in order. At each index both
//! eligibilities are evaluated before either action runs:
//! 1. Buy-eligible: the last transaction is not a Buy and the buy rule holds.
//! 2. Sell-eligible: the last transaction is not a Sell and the sell rule
//!    holds.
//!
//! A buy-eligible index buys at the next candle; at the last index nothing
//! happens. Otherwise a sell-eligible index sells at the next candle, and only
//! when there is an open entry and that candle opens at least
//! `MIN_PROFIT_RATIO` times the entry price.
//!
//! The executor owns these eligibility rules; what a fill does to the ledger
//! is delegated to a `TradeAction`.

use std::sync::Arc;

use tracing::debug;

use crate::domain::candle::SeriesId;
use crate::domain::context::AnalyzeContext;
use crate::domain::indexed::IndexedCandle;
use crate::domain::transaction::{Transaction, TransactionType};

/// Sell only at or above 3% over the entry price.
pub const MIN_PROFIT_RATIO: f64 = 1.03;

pub type Predicate = Arc<dyn Fn(&IndexedCandle<'_>) -> bool + Send + Sync>;

/// Exclusive per-asset state for the duration of one asset's pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetLedger {
    pub series: SeriesId,
    pub cash: f64,
    pub transactions: Vec<Transaction>,
}

impl AssetLedger {
    pub fn new(series: SeriesId, cash: f64) -> Self {
        AssetLedger {
            series,
            cash,
            transactions: Vec::new(),
        }
    }

    pub fn last_kind(&self) -> Option<TransactionType> {
        self.transactions.last().map(|t| t.kind)
    }

    /// The last transaction when it is a Buy not yet sold.
    pub fn open_entry(&self) -> Option<&Transaction> {
        self.transactions
            .last()
            .filter(|t| t.kind == TransactionType::Buy)
    }

    pub fn record(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }
}

pub trait TradeAction {
    fn buy(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>);

    fn sell(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>);
}

pub struct RuleExecutor<'r> {
    buy_rule: &'r Predicate,
    sell_rule: &'r Predicate,
    action: &'r dyn TradeAction,
}

impl<'r> RuleExecutor<'r> {
    pub fn new(buy_rule: &'r Predicate, sell_rule: &'r Predicate, action: &'r dyn TradeAction) -> Self {
        RuleExecutor {
            buy_rule,
            sell_rule,
            action,
        }
    }

    /// Run over `[start, end]` (clamped to the series) and hand the ledger back.
    pub fn execute(
        &self,
        context: &AnalyzeContext,
        mut ledger: AssetLedger,
        start: usize,
        end: usize,
    ) -> AssetLedger {
        let Some(last_index) = context.len().checked_sub(1) else {
            return ledger;
        };
        let end = end.min(last_index);

        for i in start..=end {
            let Ok(ic) = context.at(i) else {
                break;
            };
            let last = ledger.last_kind();
            let buy_eligible = last != Some(TransactionType::Buy) && (self.buy_rule)(&ic);
            let sell_eligible = last != Some(TransactionType::Sell) && (self.sell_rule)(&ic);

            if buy_eligible {
                if let Some(next) = ic.next() {
                    self.action.buy(&mut ledger, &next);
                }
                continue;
            }

            if !sell_eligible {
                continue;
            }
            let Some(next) = ic.next() else {
                continue;
            };
            let Some(entry_price) = ledger.open_entry().map(|t| t.price) else {
                continue;
            };
            if next.open() >= entry_price * MIN_PROFIT_RATIO {
                self.action.sell(&mut ledger, &next);
            } else {
                debug!(
                    series = %ledger.series,
                    index = next.index(),
                    entry_price,
                    open = next.open(),
                    "sell suppressed below minimum profit"
                );
            }
        }

        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{series_from_closes, series_from_rows};
    use std::cell::RefCell;

    /// Records fills at the next open with quantity 1.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(TransactionType, usize)>>,
    }

    impl Recorder {
        fn fill(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>, kind: TransactionType) {
            self.calls.borrow_mut().push((kind, next.index()));
            ledger.record(Transaction {
                series: ledger.series,
                index: next.index(),
                timestamp: next.timestamp(),
                kind,
                price: next.open(),
                quantity: 1.0,
                cash_flow: next.open(),
            });
        }
    }

    impl TradeAction for Recorder {
        fn buy(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>) {
            self.fill(ledger, next, TransactionType::Buy);
        }

        fn sell(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>) {
            self.fill(ledger, next, TransactionType::Sell);
        }
    }

    fn at(indices: &'static [usize]) -> Predicate {
        Arc::new(move |ic: &IndexedCandle<'_>| indices.contains(&ic.index()))
    }

    fn always() -> Predicate {
        Arc::new(|_: &IndexedCandle<'_>| true)
    }

    fn run(closes: &[f64], buy: Predicate, sell: Predicate) -> Vec<(TransactionType, usize)> {
        let context = AnalyzeContext::new(series_from_closes(closes));
        let recorder = Recorder::default();
        let executor = RuleExecutor::new(&buy, &sell, &recorder);
        let ledger = AssetLedger::new(context.series().id(), 100.0);
        executor.execute(&context, ledger, 0, closes.len());
        recorder.calls.into_inner()
    }

    #[test]
    fn buy_fills_on_next_candle() {
        let calls = run(&[100.0; 5], at(&[1]), at(&[]));
        assert_eq!(calls, vec![(TransactionType::Buy, 2)]);
    }

    #[test]
    fn buy_on_last_index_is_a_no_op() {
        let calls = run(&[100.0; 3], at(&[2]), at(&[]));
        assert!(calls.is_empty());
    }

    #[test]
    fn no_second_buy_while_holding() {
        let calls = run(&[100.0; 5], always(), at(&[]));
        assert_eq!(calls, vec![(TransactionType::Buy, 1)]);
    }

    #[test]
    fn sell_without_prior_buy_is_ignored() {
        let calls = run(&[100.0, 200.0, 300.0], at(&[]), always());
        assert!(calls.is_empty());
    }

    #[test]
    fn sell_requires_minimum_profit() {
        // buy fills at 100, next opens at 102 then 104
        let calls = run(&[100.0, 100.0, 102.0, 104.0], at(&[0]), always());
        assert_eq!(
            calls,
            vec![(TransactionType::Buy, 1), (TransactionType::Sell, 3)]
        );
    }

    #[test]
    fn alternates_buy_and_sell() {
        let closes = [100.0, 100.0, 110.0, 110.0, 121.0, 121.0, 140.0];
        let calls = run(&closes, always(), always());
        let kinds: Vec<TransactionType> = calls.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionType::Buy,
                TransactionType::Sell,
                TransactionType::Buy,
                TransactionType::Sell,
                TransactionType::Buy,
            ]
        );
        let indices: Vec<usize> = calls.iter().map(|(_, i)| *i).collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn both_rules_evaluated_before_branching() {
        let context = AnalyzeContext::new(series_from_closes(&[100.0; 4]));
        let sell_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&sell_calls);
        let sell: Predicate = Arc::new(move |_: &IndexedCandle<'_>| {
            counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            false
        });
        let buy = at(&[0]);
        let recorder = Recorder::default();
        let ledger = AssetLedger::new(context.series().id(), 100.0);
        let ledger = RuleExecutor::new(&buy, &sell, &recorder).execute(&context, ledger, 0, 3);
        // no sell ever lands, so every index consults the sell rule,
        // including index 0 where the buy fires
        assert_eq!(sell_calls.load(std::sync::atomic::Ordering::Relaxed), 4);
        assert_eq!(ledger.last_kind(), Some(TransactionType::Buy));
        assert_eq!(ledger.transactions.len(), 1);
    }

    #[test]
    fn respects_bounds() {
        let context = AnalyzeContext::new(series_from_rows(&[(1.0, 1.0, 1.0, 1.0, 1.0); 6]));
        let recorder = Recorder::default();
        let (buy, sell) = (always(), at(&[]));
        let ledger = AssetLedger::new(context.series().id(), 100.0);
        let ledger = RuleExecutor::new(&buy, &sell, &recorder).execute(&context, ledger, 3, 4);
        assert_eq!(ledger.transactions.len(), 1);
        assert_eq!(ledger.transactions[0].index, 4);
    }

    #[test]
    fn empty_series_returns_ledger_untouched() {
        let context = AnalyzeContext::new(series_from_closes(&[]));
        let recorder = Recorder::default();
        let (buy, sell) = (always(), always());
        let ledger = AssetLedger::new(context.series().id(), 42.0);
        let ledger = RuleExecutor::new(&buy, &sell, &recorder).execute(&context, ledger, 0, 10);
        assert_eq!(ledger.cash, 42.0);
        assert!(ledger.transactions.is_empty());
    }
}
