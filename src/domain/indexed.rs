//! Indexed cursor over the series held by an `AnalyzeContext`.

use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::domain::analyzable::Analyzable;
use crate::domain::candle::Candle;
use crate::domain::context::AnalyzeContext;
use crate::domain::error::AnalysisError;
use crate::domain::indicator::Formula;

/// A position in the context's series. Only constructed for valid indices.
#[derive(Debug, Clone, Copy)]
pub struct IndexedCandle<'a> {
    context: &'a AnalyzeContext,
    index: usize,
}

impl<'a> IndexedCandle<'a> {
    pub fn new(context: &'a AnalyzeContext, index: usize) -> Result<Self, AnalysisError> {
        if index >= context.len() {
            return Err(AnalysisError::IndexOutOfRange {
                index,
                len: context.len(),
            });
        }
        Ok(IndexedCandle { context, index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn context(&self) -> &'a AnalyzeContext {
        self.context
    }

    pub fn candle(&self) -> &'a Candle {
        &self.context.series().candles()[self.index]
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.candle().timestamp
    }

    pub fn open(&self) -> f64 {
        self.candle().open
    }

    pub fn high(&self) -> f64 {
        self.candle().high
    }

    pub fn low(&self) -> f64 {
        self.candle().low
    }

    pub fn close(&self) -> f64 {
        self.candle().close
    }

    pub fn volume(&self) -> f64 {
        self.candle().volume
    }

    pub fn previous(&self) -> Option<IndexedCandle<'a>> {
        let index = self.index.checked_sub(1)?;
        Some(IndexedCandle {
            context: self.context,
            index,
        })
    }

    pub fn next(&self) -> Option<IndexedCandle<'a>> {
        IndexedCandle::new(self.context, self.index + 1).ok()
    }

    pub fn at(&self, index: usize) -> Result<IndexedCandle<'a>, AnalysisError> {
        IndexedCandle::new(self.context, index)
    }

    /// The context's shared instance of `formula`.
    pub fn instance<F: Formula>(&self, formula: F) -> Rc<Analyzable<F::Input, F::Output>> {
        self.context.get(formula)
    }

    /// Value of `formula` at this index; None while undefined.
    pub fn get<F: Formula>(&self, formula: F) -> Option<F::Output> {
        self.instance(formula).get(self.index)
    }
}

/// Index of the first item matching `predicate`, or `fallback`.
pub fn find_index_or_default<T>(
    items: &[T],
    predicate: impl Fn(&T) -> bool,
    fallback: usize,
) -> usize {
    items.iter().position(predicate).unwrap_or(fallback)
}

/// Index of the last item matching `predicate`, or `fallback`.
pub fn find_last_index_or_default<T>(
    items: &[T],
    predicate: impl Fn(&T) -> bool,
    fallback: usize,
) -> usize {
    items.iter().rposition(predicate).unwrap_or(fallback)
}
