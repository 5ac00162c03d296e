//! Close-price change over `n` candles, and the one-candle percentage change.

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::Series;
use crate::domain::indicator::{Formula, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosePriceChange(pub usize);

impl Formula for ClosePriceChange {
    type Input = f64;
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::ClosePriceChange(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<f64, f64> {
        let n = self.0;
        Analyzable::new(
            series,
            |c| c.close,
            Recurrence::by_index(move |closes: &[f64], i| {
                let base = i.checked_sub(n)?;
                Some(closes[i] - closes[base])
            }),
        )
    }
}

/// `100 * (close[i] - close[i-1]) / close[i-1]`; undefined at 0 or when the
/// previous close is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosePricePercentageChange;

impl Formula for ClosePricePercentageChange {
    type Input = f64;
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::ClosePricePercentageChange
    }

    fn build(&self, series: &Series) -> Analyzable<f64, f64> {
        Analyzable::new(
            series,
            |c| c.close,
            Recurrence::by_index(|closes: &[f64], i| {
                let prev = closes[i.checked_sub(1)?];
                if prev == 0.0 {
                    return None;
                }
                Some(100.0 * (closes[i] - prev) / prev)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::series_from_closes;
    use approx::assert_relative_eq;

    #[test]
    fn change_over_n() {
        let series = series_from_closes(&[10.0, 12.0, 9.0, 15.0]);
        let change = ClosePriceChange(2).build(&series);
        assert_eq!(change.value_at(1).unwrap(), None);
        assert_relative_eq!(change.value_at(2).unwrap().unwrap(), -1.0);
        assert_relative_eq!(change.value_at(3).unwrap().unwrap(), 3.0);
    }

    #[test]
    fn percentage_change() {
        let series = series_from_closes(&[0.0, 50.0, 100.0, 75.0]);
        let pct = ClosePricePercentageChange.build(&series);
        assert_eq!(pct.value_at(0).unwrap(), None);
        assert_eq!(pct.value_at(1).unwrap(), None);
        assert_relative_eq!(pct.value_at(2).unwrap().unwrap(), 100.0);
        assert_relative_eq!(pct.value_at(3).unwrap().unwrap(), -25.0);
    }
}
