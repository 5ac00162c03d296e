//! Per-asset analysis context: the series being analyzed plus a cache of
//! indicator instances keyed by (series identity, indicator type).
//!
//! One context is created for each asset of a backtest run and dropped when
//! that asset's pass ends. It is single-threaded (`Rc`, `RefCell`).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::domain::analyzable::Analyzable;
use crate::domain::candle::{Series, SeriesId};
use crate::domain::error::AnalysisError;
use crate::domain::indexed::IndexedCandle;
use crate::domain::indicator::{Formula, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    series: SeriesId,
    indicator: IndicatorType,
}

pub struct AnalyzeContext {
    series: Series,
    cache: RefCell<HashMap<CacheKey, Rc<dyn Any>>>,
}

impl AnalyzeContext {
    pub fn new(series: Series) -> Self {
        AnalyzeContext {
            series,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Cursor at `index`; `IndexOutOfRange` past the end.
    pub fn at(&self, index: usize) -> Result<IndexedCandle<'_>, AnalysisError> {
        IndexedCandle::new(self, index)
    }

    /// The shared instance for `formula`, built on first request.
    pub fn get<F: Formula>(&self, formula: F) -> Rc<Analyzable<F::Input, F::Output>> {
        let key = CacheKey {
            series: self.series.id(),
            indicator: formula.indicator_type(),
        };

        // The borrow ends here so building may re-enter the context.
        let cached = self.cache.borrow().get(&key).cloned();
        if let Some(entry) = cached {
            if let Ok(instance) = entry.downcast::<Analyzable<F::Input, F::Output>>() {
                return instance;
            }
        }

        let instance = Rc::new(formula.build(&self.series));
        trace!(series = %key.series, indicator = %key.indicator, "built indicator");
        let erased: Rc<dyn Any> = instance.clone();
        self.cache.borrow_mut().insert(key, erased);
        instance
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl fmt::Debug for AnalyzeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeContext")
            .field("series", &self.series.name())
            .field("len", &self.series.len())
            .field("cached", &self.cached_len())
            .finish()
    }
}

impl Drop for AnalyzeContext {
    fn drop(&mut self) {
        let cache = self.cache.get_mut();
        let released = cache.len();
        cache.clear();
        trace!(series = %self.series.id(), released, "analyze context disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{ExponentialMovingAverage, SimpleMovingAverage};
    use crate::domain::test_support::series_from_closes;

    #[test]
    fn same_formula_returns_shared_instance() {
        let ctx = AnalyzeContext::new(series_from_closes(&[1.0, 2.0, 3.0]));
        let a = ctx.get(SimpleMovingAverage(2));
        let b = ctx.get(SimpleMovingAverage(2));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(ctx.cached_len(), 1);
    }

    #[test]
    fn parameters_are_part_of_the_key() {
        let ctx = AnalyzeContext::new(series_from_closes(&[1.0, 2.0, 3.0]));
        ctx.get(SimpleMovingAverage(2));
        ctx.get(SimpleMovingAverage(3));
        ctx.get(ExponentialMovingAverage(2));
        assert_eq!(ctx.cached_len(), 3);
    }

    #[test]
    fn memo_survives_across_lookups() {
        let ctx = AnalyzeContext::new(series_from_closes(&[1.0, 2.0, 3.0, 4.0]));
        ctx.get(SimpleMovingAverage(2)).value_at(3).unwrap();
        let again = ctx.get(SimpleMovingAverage(2));
        again.value_at(3).unwrap();
        assert_eq!(again.computations(), 1);
    }

    #[test]
    fn contexts_do_not_share_caches() {
        let series = series_from_closes(&[1.0, 2.0]);
        let first = AnalyzeContext::new(series.clone());
        let second = AnalyzeContext::new(series);
        let a = first.get(SimpleMovingAverage(1));
        let b = second.get(SimpleMovingAverage(1));
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn at_rejects_out_of_range() {
        let ctx = AnalyzeContext::new(series_from_closes(&[1.0]));
        assert!(ctx.at(0).is_ok());
        assert!(matches!(
            ctx.at(1).unwrap_err(),
            AnalysisError::IndexOutOfRange { index: 1, len: 1 }
        ));
    }
}
