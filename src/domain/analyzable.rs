//! Lazily evaluated, memoized per-index computation engine.
//!
//! An `Analyzable<I, O>` owns the projected inputs of one series and a
//! `Recurrence` describing how the output at index `i` is derived:
//! - `Windowed`: a pure function of the trailing `period` inputs
//! - `Cumulative`: a seed value followed by a step from the previous output
//! - `ByIndex`: an arbitrary function of the inputs and the index, used by
//!   composites that read other instances
//!
//! Each index is computed at most once per instance. Cumulative recurrences are
//! realized left to right so a random access at index `n` costs O(n) once and
//! never recurses.

use std::cell::{Cell, OnceCell};

use chrono::NaiveDateTime;

use crate::domain::candle::{Candle, Series};
use crate::domain::error::AnalysisError;

/// One indexed output: timestamp plus an optional value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick<T> {
    pub timestamp: NaiveDateTime,
    pub value: Option<T>,
}

impl<T> Tick<T> {
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

pub type WindowFn<I, O> = Box<dyn Fn(&[I]) -> Option<O>>;
pub type IndexFn<I, O> = Box<dyn Fn(&[I], usize) -> Option<O>>;
pub type StepFn<I, O> = Box<dyn Fn(&[I], usize, Option<&O>) -> Option<O>>;

pub enum Recurrence<I, O> {
    Windowed {
        period: usize,
        compute: WindowFn<I, O>,
    },
    Cumulative {
        seed_index: usize,
        initial: IndexFn<I, O>,
        step: StepFn<I, O>,
    },
    ByIndex(IndexFn<I, O>),
}

impl<I, O> Recurrence<I, O> {
    pub fn windowed(period: usize, compute: impl Fn(&[I]) -> Option<O> + 'static) -> Self {
        Recurrence::Windowed {
            period,
            compute: Box::new(compute),
        }
    }

    pub fn cumulative(
        seed_index: usize,
        initial: impl Fn(&[I], usize) -> Option<O> + 'static,
        step: impl Fn(&[I], usize, Option<&O>) -> Option<O> + 'static,
    ) -> Self {
        Recurrence::Cumulative {
            seed_index,
            initial: Box::new(initial),
            step: Box::new(step),
        }
    }

    pub fn by_index(compute: impl Fn(&[I], usize) -> Option<O> + 'static) -> Self {
        Recurrence::ByIndex(Box::new(compute))
    }
}

/// The trailing window of `period` values ending at `index`, if it fits.
pub fn trailing_window<T>(values: &[T], index: usize, period: usize) -> Option<&[T]> {
    if period == 0 || index + 1 < period || index >= values.len() {
        return None;
    }
    Some(&values[index + 1 - period..=index])
}

/// Numeric outputs that support `diff`.
pub trait Difference {
    type Delta;

    fn difference(&self, previous: &Self) -> Self::Delta;
}

impl Difference for f64 {
    type Delta = f64;

    fn difference(&self, previous: &Self) -> f64 {
        self - previous
    }
}

/// Direction of a value relative to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    NonTrended,
}

impl Trend {
    /// None when the values are not comparable (NaN).
    pub fn between<T: PartialOrd>(current: &T, previous: &T) -> Option<Trend> {
        current.partial_cmp(previous).map(|ordering| match ordering {
            std::cmp::Ordering::Greater => Trend::Bullish,
            std::cmp::Ordering::Less => Trend::Bearish,
            std::cmp::Ordering::Equal => Trend::NonTrended,
        })
    }
}

/// Ticks either side of an index. `previous` is None at 0, `next` at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbour<T> {
    pub previous: Option<Tick<T>>,
    pub current: Tick<T>,
    pub next: Option<Tick<T>>,
}

pub struct Analyzable<I, O> {
    series: Series,
    inputs: Vec<I>,
    recurrence: Recurrence<I, O>,
    memo: Vec<OnceCell<Option<O>>>,
    realized: Cell<usize>,
    computations: Cell<usize>,
}

impl<I, O: Clone> Analyzable<I, O> {
    pub fn new(
        series: &Series,
        project: impl Fn(&Candle) -> I,
        recurrence: Recurrence<I, O>,
    ) -> Self {
        let inputs: Vec<I> = series.candles().iter().map(project).collect();
        let memo = (0..inputs.len()).map(|_| OnceCell::new()).collect();
        Analyzable {
            series: series.clone(),
            inputs,
            recurrence,
            memo,
            realized: Cell::new(0),
            computations: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Number of indices evaluated so far. Never exceeds `len()`.
    pub fn computations(&self) -> usize {
        self.computations.get()
    }

    pub fn value_at(&self, index: usize) -> Result<Option<O>, AnalysisError> {
        self.check(index)?;
        if matches!(self.recurrence, Recurrence::Cumulative { .. }) {
            self.realize_through(index);
        }
        Ok(self.slot(index).clone())
    }

    /// Lookup for composites reading a sibling instance over the same series.
    pub(crate) fn get(&self, index: usize) -> Option<O> {
        self.value_at(index).ok().flatten()
    }

    pub fn tick_at(&self, index: usize) -> Result<Tick<O>, AnalysisError> {
        let value = self.value_at(index)?;
        Ok(Tick {
            timestamp: self.series.candles()[index].timestamp,
            value,
        })
    }

    pub fn ticks(&self) -> Vec<Tick<O>> {
        self.series
            .candles()
            .iter()
            .enumerate()
            .map(|(i, candle)| Tick {
                timestamp: candle.timestamp,
                value: self.get(i),
            })
            .collect()
    }

    pub fn compute_neighbour(&self, index: usize) -> Result<Neighbour<O>, AnalysisError> {
        let current = self.tick_at(index)?;
        let previous = match index.checked_sub(1) {
            Some(prev) => Some(self.tick_at(prev)?),
            None => None,
        };
        let next = if index + 1 < self.len() {
            Some(self.tick_at(index + 1)?)
        } else {
            None
        };
        Ok(Neighbour {
            previous,
            current,
            next,
        })
    }

    fn check(&self, index: usize) -> Result<(), AnalysisError> {
        if index >= self.len() {
            return Err(AnalysisError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn realize_through(&self, index: usize) {
        let mut next = self.realized.get();
        while next <= index {
            self.slot(next);
            next += 1;
        }
        if next > self.realized.get() {
            self.realized.set(next);
        }
    }

    fn slot(&self, index: usize) -> &Option<O> {
        self.memo[index].get_or_init(|| {
            self.computations.set(self.computations.get() + 1);
            self.compute(index)
        })
    }

    fn compute(&self, index: usize) -> Option<O> {
        match &self.recurrence {
            Recurrence::Windowed { period, compute } => {
                trailing_window(&self.inputs, index, *period).and_then(compute)
            }
            Recurrence::Cumulative {
                seed_index,
                initial,
                step,
            } => {
                if index < *seed_index {
                    None
                } else if index == *seed_index {
                    initial(&self.inputs, index)
                } else {
                    // realize_through has already filled index - 1
                    let previous = self.slot(index - 1).as_ref();
                    step(&self.inputs, index, previous)
                }
            }
            Recurrence::ByIndex(compute) => compute(&self.inputs, index),
        }
    }
}

impl<I, O: Clone + Difference> Analyzable<I, O> {
    /// `value(i) - value(i - 1)`; None at 0 or when either side is undefined.
    pub fn diff(&self, index: usize) -> Result<Option<O::Delta>, AnalysisError> {
        let current = self.value_at(index)?;
        if index == 0 {
            return Ok(None);
        }
        let previous = self.value_at(index - 1)?;
        Ok(match (current, previous) {
            (Some(c), Some(p)) => Some(c.difference(&p)),
            _ => None,
        })
    }
}

impl<I, O: Clone + PartialOrd> Analyzable<I, O> {
    pub fn trend(&self, index: usize) -> Result<Option<Trend>, AnalysisError> {
        let current = self.value_at(index)?;
        if index == 0 {
            return Ok(None);
        }
        let previous = self.value_at(index - 1)?;
        Ok(match (current, previous) {
            (Some(c), Some(p)) => Trend::between(&c, &p),
            _ => None,
        })
    }
}
