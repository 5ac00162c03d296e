//! Backtest runner.
//!
//! Splits the principal across weighted series, runs the rule executor once
//! per series with a fresh context and ledger, and merges every ledger into a
//! single `BacktestResult`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::domain::candle::Series;
use crate::domain::context::AnalyzeContext;
use crate::domain::error::AnalysisError;
use crate::domain::events::{BacktestEvent, BacktestObserver, TradeEvent};
use crate::domain::executor::{AssetLedger, Predicate, RuleExecutor, TradeAction};
use crate::domain::indexed::{IndexedCandle, find_index_or_default, find_last_index_or_default};
use crate::domain::rule::Rule;
use crate::domain::transaction::{BacktestResult, Transaction, TransactionType};

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub principal: f64,
    /// Percentage in `[0, 100)` applied to every fill price.
    pub premium: f64,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl RunConfig {
    pub fn new(principal: f64) -> Self {
        RunConfig {
            principal,
            premium: 0.0,
            start_time: None,
            end_time: None,
        }
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if !self.principal.is_finite() || self.principal < 0.0 {
            return Err(AnalysisError::invalid_configuration(format!(
                "principal must be a non-negative number, got {}",
                self.principal
            )));
        }
        if !self.premium.is_finite() || !(0.0..100.0).contains(&self.premium) {
            return Err(AnalysisError::invalid_configuration(format!(
                "premium must be in [0, 100), got {}",
                self.premium
            )));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(AnalysisError::invalid_configuration(format!(
                    "start time {start} is after end time {end}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RunnerBuilder {
    assets: Vec<(Series, u32)>,
    buy: Option<Predicate>,
    sell: Option<Predicate>,
    observers: Vec<Arc<dyn BacktestObserver>>,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, series: Series, weight: u32) -> Self {
        self.assets.push((series, weight));
        self
    }

    pub fn buy<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&IndexedCandle<'_>) -> bool + Send + Sync + 'static,
    {
        self.buy = Some(Arc::new(predicate));
        self
    }

    pub fn sell<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&IndexedCandle<'_>) -> bool + Send + Sync + 'static,
    {
        self.sell = Some(Arc::new(predicate));
        self
    }

    pub fn buy_rule(self, rule: Rule) -> Self {
        self.buy(move |ic: &IndexedCandle<'_>| rule.evaluate(ic))
    }

    pub fn sell_rule(self, rule: Rule) -> Self {
        self.sell(move |ic: &IndexedCandle<'_>| rule.evaluate(ic))
    }

    /// Observers are notified in the order they were registered.
    pub fn observe<O: BacktestObserver + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn build(self) -> Runner {
        let never: Predicate = Arc::new(|_: &IndexedCandle<'_>| false);
        Runner {
            assets: self.assets,
            buy: self.buy.unwrap_or_else(|| Arc::clone(&never)),
            sell: self.sell.unwrap_or(never),
            observers: self.observers,
        }
    }
}

pub struct Runner {
    assets: Vec<(Series, u32)>,
    buy: Predicate,
    sell: Predicate,
    observers: Vec<Arc<dyn BacktestObserver>>,
}

impl Runner {
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    pub fn assets(&self) -> &[(Series, u32)] {
        &self.assets
    }

    pub fn run(&self, config: &RunConfig) -> Result<BacktestResult, AnalysisError> {
        config.validate()?;
        let total_weight = self.validate_assets()?;

        let actions = RunActions {
            premium: config.premium,
            observers: &self.observers,
        };
        let executor = RuleExecutor::new(&self.buy, &self.sell, &actions);
        let mut result = BacktestResult::default();

        for (series, weight) in &self.assets {
            let allocation = config.principal * f64::from(*weight) / total_weight as f64;
            result.initial.insert(series.id(), allocation);

            if series.is_empty() {
                warn!(series = %series.id(), name = series.name(), "skipping empty series");
                result.final_cash.insert(series.id(), allocation);
                continue;
            }

            let candles = series.candles();
            let start = config
                .start_time
                .map_or(0, |t| find_index_or_default(candles, |c| c.timestamp >= t, 0));
            let end = config.end_time.map_or(candles.len() - 1, |t| {
                find_last_index_or_default(candles, |c| c.timestamp <= t, candles.len() - 1)
            });
            debug!(
                series = %series.id(),
                name = series.name(),
                allocation,
                start,
                end,
                "running asset"
            );

            let context = AnalyzeContext::new(series.clone());
            let ledger = executor.execute(
                &context,
                AssetLedger::new(series.id(), allocation),
                start,
                end,
            );
            result.final_cash.insert(ledger.series, ledger.cash);
            result.transactions.extend(ledger.transactions);
        }

        Ok(result)
    }

    /// Runs on tokio's blocking pool; the run itself stays sequential.
    #[cfg(feature = "async")]
    pub async fn run_async(self: Arc<Self>, config: RunConfig) -> Result<BacktestResult, AnalysisError> {
        tokio::task::spawn_blocking(move || self.run(&config))
            .await
            .map_err(|e| AnalysisError::TaskJoin {
                reason: e.to_string(),
            })?
    }

    fn validate_assets(&self) -> Result<u64, AnalysisError> {
        if self.assets.is_empty() {
            return Err(AnalysisError::invalid_configuration("no assets to run"));
        }
        let mut seen = BTreeSet::new();
        for (series, _) in &self.assets {
            if !seen.insert(series.id()) {
                return Err(AnalysisError::invalid_configuration(format!(
                    "series {} ({}) added more than once",
                    series.id(),
                    series.name()
                )));
            }
        }
        let total: u64 = self.assets.iter().map(|(_, w)| u64::from(*w)).sum();
        if total == 0 {
            return Err(AnalysisError::invalid_configuration("total weight is zero"));
        }
        Ok(total)
    }
}

struct RunActions<'a> {
    premium: f64,
    observers: &'a [Arc<dyn BacktestObserver>],
}

impl RunActions<'_> {
    fn net_price(&self, open: f64) -> f64 {
        open * (100.0 - self.premium) / 100.0
    }

    fn publish(&self, event: BacktestEvent) {
        for observer in self.observers {
            observer.notify(&event);
        }
    }
}

impl TradeAction for RunActions<'_> {
    fn buy(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>) {
        let unit = self.net_price(next.open());
        if ledger.cash <= 0.0 || unit <= 0.0 {
            debug!(series = %ledger.series, index = next.index(), cash = ledger.cash, "buy skipped");
            return;
        }
        let cash_out = ledger.cash;
        let quantity = cash_out / unit;
        ledger.cash = 0.0;
        ledger.record(Transaction {
            series: ledger.series,
            index: next.index(),
            timestamp: next.timestamp(),
            kind: TransactionType::Buy,
            price: next.open(),
            quantity,
            cash_flow: cash_out,
        });
        debug!(series = %ledger.series, index = next.index(), price = next.open(), quantity, "bought");
        self.publish(BacktestEvent::Bought(TradeEvent {
            series: ledger.series,
            index: next.index(),
            timestamp: next.timestamp(),
            price: next.open(),
            quantity,
            cash_flow: cash_out,
            balance: ledger.cash,
        }));
    }

    fn sell(&self, ledger: &mut AssetLedger, next: &IndexedCandle<'_>) {
        let Some((quantity, cash_out)) = ledger.open_entry().map(|t| (t.quantity, t.cash_flow)) else {
            return;
        };
        let cash_in = self.net_price(next.open()) * quantity;
        let profit_ratio = if cash_out == 0.0 {
            0.0
        } else {
            (cash_in - cash_out) / cash_out
        };
        ledger.cash += cash_in;
        ledger.record(Transaction {
            series: ledger.series,
            index: next.index(),
            timestamp: next.timestamp(),
            kind: TransactionType::Sell,
            price: next.open(),
            quantity,
            cash_flow: cash_in,
        });
        debug!(
            series = %ledger.series,
            index = next.index(),
            price = next.open(),
            quantity,
            profit_ratio,
            "sold"
        );
        self.publish(BacktestEvent::Sold {
            trade: TradeEvent {
                series: ledger.series,
                index: next.index(),
                timestamp: next.timestamp(),
                price: next.open(),
                quantity,
                cash_flow: cash_in,
                balance: ledger.cash,
            },
            profit_ratio,
        });
    }
}
