//! Rule AST.
//!
//! A `Rule` is a boolean tree over `Signal` leaves. Each signal names one
//! predicate on `IndexedCandle` together with its parameters; evaluation reads
//! indicator values through the candle's `AnalyzeContext`.
//!
//! Stochastics signals render as `FAST_STO_*` when %K is unsmoothed,
//! `SLOW_STO_*` when it is smoothed over three candles and `FULL_STO_*`
//! otherwise.

use std::fmt;

use crate::domain::indexed::IndexedCandle;
use crate::domain::indicator::stochastics::{FAST_K_SMA, SLOW_K_SMA};
use crate::domain::indicator::{
    BearishAbandonedBaby, BullishShortDay, DownsideTasukiGap, Stochastics,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Bullish(usize),
    Bearish(usize),
    ObvBullish,
    ObvBearish,
    AccumDistBullish,
    AccumDistBearish,
    AboveSma(usize),
    BelowSma(usize),
    AboveEma(usize),
    BelowEma(usize),
    SmaBullish(usize),
    SmaBearish(usize),
    EmaBullish(usize),
    EmaBearish(usize),
    SmaOscBullish { fast: usize, slow: usize },
    SmaOscBearish { fast: usize, slow: usize },
    EmaOscBullish { fast: usize, slow: usize },
    EmaOscBearish { fast: usize, slow: usize },
    MacdOscBullish { fast: usize, slow: usize, signal: usize },
    MacdOscBearish { fast: usize, slow: usize, signal: usize },
    SmaBullishCross { fast: usize, slow: usize },
    SmaBearishCross { fast: usize, slow: usize },
    EmaBullishCross { fast: usize, slow: usize },
    EmaBearishCross { fast: usize, slow: usize },
    MacdBullishCross { fast: usize, slow: usize, signal: usize },
    MacdBearishCross { fast: usize, slow: usize, signal: usize },
    RsiOverbought { period: usize, threshold: f64 },
    RsiOversold { period: usize, threshold: f64 },
    InBbRange { period: usize, sd: f64 },
    AboveBbUp { period: usize, sd: f64 },
    BelowBbLow { period: usize, sd: f64 },
    BreakingHighestHigh(usize),
    BreakingHighestClose(usize),
    BreakingLowestLow(usize),
    BreakingLowestClose(usize),
    BreakingHistoricalHighestHigh,
    BreakingHistoricalHighestClose,
    BreakingHistoricalLowestLow,
    BreakingHistoricalLowestClose,
    StoOverbought { sto: Stochastics, threshold: f64 },
    StoOversold { sto: Stochastics, threshold: f64 },
    StoOscBullish(Stochastics),
    StoOscBearish(Stochastics),
    StoBullishCross(Stochastics),
    StoBearishCross(Stochastics),
    BearishAbandonedBaby(BearishAbandonedBaby),
    BullishShortDay(BullishShortDay),
    DownsideTasukiGap(DownsideTasukiGap),
}

impl Signal {
    pub fn holds(&self, ic: &IndexedCandle<'_>) -> bool {
        match *self {
            Signal::Bullish(n) => ic.is_bullish(n),
            Signal::Bearish(n) => ic.is_bearish(n),
            Signal::ObvBullish => ic.is_obv_bullish(),
            Signal::ObvBearish => ic.is_obv_bearish(),
            Signal::AccumDistBullish => ic.is_accum_dist_bullish(),
            Signal::AccumDistBearish => ic.is_accum_dist_bearish(),
            Signal::AboveSma(p) => ic.is_above_sma(p),
            Signal::BelowSma(p) => ic.is_below_sma(p),
            Signal::AboveEma(p) => ic.is_above_ema(p),
            Signal::BelowEma(p) => ic.is_below_ema(p),
            Signal::SmaBullish(p) => ic.is_sma_bullish(p),
            Signal::SmaBearish(p) => ic.is_sma_bearish(p),
            Signal::EmaBullish(p) => ic.is_ema_bullish(p),
            Signal::EmaBearish(p) => ic.is_ema_bearish(p),
            Signal::SmaOscBullish { fast, slow } => ic.is_sma_osc_bullish(fast, slow),
            Signal::SmaOscBearish { fast, slow } => ic.is_sma_osc_bearish(fast, slow),
            Signal::EmaOscBullish { fast, slow } => ic.is_ema_osc_bullish(fast, slow),
            Signal::EmaOscBearish { fast, slow } => ic.is_ema_osc_bearish(fast, slow),
            Signal::MacdOscBullish { fast, slow, signal } => {
                ic.is_macd_osc_bullish(fast, slow, signal)
            }
            Signal::MacdOscBearish { fast, slow, signal } => {
                ic.is_macd_osc_bearish(fast, slow, signal)
            }
            Signal::SmaBullishCross { fast, slow } => ic.is_sma_bullish_cross(fast, slow),
            Signal::SmaBearishCross { fast, slow } => ic.is_sma_bearish_cross(fast, slow),
            Signal::EmaBullishCross { fast, slow } => ic.is_ema_bullish_cross(fast, slow),
            Signal::EmaBearishCross { fast, slow } => ic.is_ema_bearish_cross(fast, slow),
            Signal::MacdBullishCross { fast, slow, signal } => {
                ic.is_macd_bullish_cross(fast, slow, signal)
            }
            Signal::MacdBearishCross { fast, slow, signal } => {
                ic.is_macd_bearish_cross(fast, slow, signal)
            }
            Signal::RsiOverbought { period, threshold } => ic.is_rsi_overbought(period, threshold),
            Signal::RsiOversold { period, threshold } => ic.is_rsi_oversold(period, threshold),
            Signal::InBbRange { period, sd } => ic.is_in_bb_range(period, sd),
            Signal::AboveBbUp { period, sd } => ic.is_above_bb_up(period, sd),
            Signal::BelowBbLow { period, sd } => ic.is_below_bb_low(period, sd),
            Signal::BreakingHighestHigh(p) => ic.is_breaking_highest_high(p),
            Signal::BreakingHighestClose(p) => ic.is_breaking_highest_close(p),
            Signal::BreakingLowestLow(p) => ic.is_breaking_lowest_low(p),
            Signal::BreakingLowestClose(p) => ic.is_breaking_lowest_close(p),
            Signal::BreakingHistoricalHighestHigh => ic.is_breaking_historical_highest_high(),
            Signal::BreakingHistoricalHighestClose => ic.is_breaking_historical_highest_close(),
            Signal::BreakingHistoricalLowestLow => ic.is_breaking_historical_lowest_low(),
            Signal::BreakingHistoricalLowestClose => ic.is_breaking_historical_lowest_close(),
            Signal::StoOverbought { sto, threshold } => ic.is_sto_overbought(sto, threshold),
            Signal::StoOversold { sto, threshold } => ic.is_sto_oversold(sto, threshold),
            Signal::StoOscBullish(sto) => ic.is_sto_osc_bullish(sto),
            Signal::StoOscBearish(sto) => ic.is_sto_osc_bearish(sto),
            Signal::StoBullishCross(sto) => ic.is_sto_bullish_cross(sto),
            Signal::StoBearishCross(sto) => ic.is_sto_bearish_cross(sto),
            Signal::BearishAbandonedBaby(p) => ic.is_bearish_abandoned_baby(p),
            Signal::BullishShortDay(p) => ic.is_bullish_short_day(p),
            Signal::DownsideTasukiGap(p) => ic.is_downside_tasuki_gap(p),
        }
    }
}

fn write_sto(
    f: &mut fmt::Formatter<'_>,
    suffix: &str,
    sto: &Stochastics,
    threshold: Option<f64>,
) -> fmt::Result {
    match sto.k_sma {
        FAST_K_SMA => write!(f, "FAST_STO_{}({}, {}", suffix, sto.period, sto.d_sma)?,
        SLOW_K_SMA => write!(f, "SLOW_STO_{}({}, {}", suffix, sto.period, sto.d_sma)?,
        k_sma => write!(f, "FULL_STO_{}({}, {}, {}", suffix, sto.period, k_sma, sto.d_sma)?,
    }
    if let Some(threshold) = threshold {
        write!(f, ", {}", threshold)?;
    }
    write!(f, ")")
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bullish(n) => write!(f, "BULLISH({})", n),
            Signal::Bearish(n) => write!(f, "BEARISH({})", n),
            Signal::ObvBullish => write!(f, "OBV_BULLISH"),
            Signal::ObvBearish => write!(f, "OBV_BEARISH"),
            Signal::AccumDistBullish => write!(f, "ADL_BULLISH"),
            Signal::AccumDistBearish => write!(f, "ADL_BEARISH"),
            Signal::AboveSma(p) => write!(f, "ABOVE_SMA({})", p),
            Signal::BelowSma(p) => write!(f, "BELOW_SMA({})", p),
            Signal::AboveEma(p) => write!(f, "ABOVE_EMA({})", p),
            Signal::BelowEma(p) => write!(f, "BELOW_EMA({})", p),
            Signal::SmaBullish(p) => write!(f, "SMA_BULLISH({})", p),
            Signal::SmaBearish(p) => write!(f, "SMA_BEARISH({})", p),
            Signal::EmaBullish(p) => write!(f, "EMA_BULLISH({})", p),
            Signal::EmaBearish(p) => write!(f, "EMA_BEARISH({})", p),
            Signal::SmaOscBullish { fast, slow } => write!(f, "SMA_OSC_BULLISH({}, {})", fast, slow),
            Signal::SmaOscBearish { fast, slow } => write!(f, "SMA_OSC_BEARISH({}, {})", fast, slow),
            Signal::EmaOscBullish { fast, slow } => write!(f, "EMA_OSC_BULLISH({}, {})", fast, slow),
            Signal::EmaOscBearish { fast, slow } => write!(f, "EMA_OSC_BEARISH({}, {})", fast, slow),
            Signal::MacdOscBullish { fast, slow, signal } => {
                write!(f, "MACD_OSC_BULLISH({}, {}, {})", fast, slow, signal)
            }
            Signal::MacdOscBearish { fast, slow, signal } => {
                write!(f, "MACD_OSC_BEARISH({}, {}, {})", fast, slow, signal)
            }
            Signal::SmaBullishCross { fast, slow } => {
                write!(f, "SMA_BULLISH_CROSS({}, {})", fast, slow)
            }
            Signal::SmaBearishCross { fast, slow } => {
                write!(f, "SMA_BEARISH_CROSS({}, {})", fast, slow)
            }
            Signal::EmaBullishCross { fast, slow } => {
                write!(f, "EMA_BULLISH_CROSS({}, {})", fast, slow)
            }
            Signal::EmaBearishCross { fast, slow } => {
                write!(f, "EMA_BEARISH_CROSS({}, {})", fast, slow)
            }
            Signal::MacdBullishCross { fast, slow, signal } => {
                write!(f, "MACD_BULLISH_CROSS({}, {}, {})", fast, slow, signal)
            }
            Signal::MacdBearishCross { fast, slow, signal } => {
                write!(f, "MACD_BEARISH_CROSS({}, {}, {})", fast, slow, signal)
            }
            Signal::RsiOverbought { period, threshold } => {
                write!(f, "RSI_OVERBOUGHT({}, {})", period, threshold)
            }
            Signal::RsiOversold { period, threshold } => {
                write!(f, "RSI_OVERSOLD({}, {})", period, threshold)
            }
            Signal::InBbRange { period, sd } => write!(f, "IN_BB_RANGE({}, {})", period, sd),
            Signal::AboveBbUp { period, sd } => write!(f, "ABOVE_BB_UP({}, {})", period, sd),
            Signal::BelowBbLow { period, sd } => write!(f, "BELOW_BB_LOW({}, {})", period, sd),
            Signal::BreakingHighestHigh(p) => write!(f, "BREAKING_HIGHEST_HIGH({})", p),
            Signal::BreakingHighestClose(p) => write!(f, "BREAKING_HIGHEST_CLOSE({})", p),
            Signal::BreakingLowestLow(p) => write!(f, "BREAKING_LOWEST_LOW({})", p),
            Signal::BreakingLowestClose(p) => write!(f, "BREAKING_LOWEST_CLOSE({})", p),
            Signal::BreakingHistoricalHighestHigh => write!(f, "BREAKING_HISTORICAL_HIGHEST_HIGH"),
            Signal::BreakingHistoricalHighestClose => {
                write!(f, "BREAKING_HISTORICAL_HIGHEST_CLOSE")
            }
            Signal::BreakingHistoricalLowestLow => write!(f, "BREAKING_HISTORICAL_LOWEST_LOW"),
            Signal::BreakingHistoricalLowestClose => write!(f, "BREAKING_HISTORICAL_LOWEST_CLOSE"),
            Signal::StoOverbought { sto, threshold } => {
                write_sto(f, "OVERBOUGHT", sto, Some(*threshold))
            }
            Signal::StoOversold { sto, threshold } => write_sto(f, "OVERSOLD", sto, Some(*threshold)),
            Signal::StoOscBullish(sto) => write_sto(f, "OSC_BULLISH", sto, None),
            Signal::StoOscBearish(sto) => write_sto(f, "OSC_BEARISH", sto, None),
            Signal::StoBullishCross(sto) => write_sto(f, "BULLISH_CROSS", sto, None),
            Signal::StoBearishCross(sto) => write_sto(f, "BEARISH_CROSS", sto, None),
            Signal::BearishAbandonedBaby(p) => write!(
                f,
                "BEARISH_ABANDONED_BABY({}, {})",
                p.up_trend, p.long_period
            ),
            Signal::BullishShortDay(p) => write!(f, "BULLISH_SHORT_DAY({})", p.period),
            Signal::DownsideTasukiGap(p) => write!(f, "DOWNSIDE_TASUKI_GAP({})", p.down_trend),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Signal(Signal),
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
}

impl Rule {
    /// `NOT` of an undefined signal is true: undefined signals are false.
    pub fn evaluate(&self, ic: &IndexedCandle<'_>) -> bool {
        match self {
            Rule::Signal(signal) => signal.holds(ic),
            Rule::And(rules) => rules.iter().all(|r| r.evaluate(ic)),
            Rule::Or(rules) => rules.iter().any(|r| r.evaluate(ic)),
            Rule::Not(rule) => !rule.evaluate(ic),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, keyword: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{}(", keyword)?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", rule)?;
    }
    write!(f, ")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Signal(signal) => write!(f, "{}", signal),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({})", rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::AnalyzeContext;
    use crate::domain::test_support::series_from_closes;

    #[test]
    fn display_signals() {
        assert_eq!(Signal::EmaBullish(12).to_string(), "EMA_BULLISH(12)");
        assert_eq!(Signal::ObvBearish.to_string(), "OBV_BEARISH");
        assert_eq!(
            Signal::RsiOverbought {
                period: 14,
                threshold: 70.0
            }
            .to_string(),
            "RSI_OVERBOUGHT(14, 70)"
        );
        assert_eq!(
            Signal::AboveBbUp {
                period: 20,
                sd: 2.5
            }
            .to_string(),
            "ABOVE_BB_UP(20, 2.5)"
        );
    }

    #[test]
    fn display_stochastics_by_smoothing() {
        let overbought = Signal::StoOverbought {
            sto: Stochastics::fast(14, 3),
            threshold: 80.0,
        };
        assert_eq!(overbought.to_string(), "FAST_STO_OVERBOUGHT(14, 3, 80)");
        assert_eq!(
            Signal::StoOscBullish(Stochastics::slow(14, 3)).to_string(),
            "SLOW_STO_OSC_BULLISH(14, 3)"
        );
        assert_eq!(
            Signal::StoBearishCross(Stochastics::full(14, 5, 3)).to_string(),
            "FULL_STO_BEARISH_CROSS(14, 5, 3)"
        );
        assert_eq!(
            Signal::BearishAbandonedBaby(BearishAbandonedBaby::default()).to_string(),
            "BEARISH_ABANDONED_BABY(3, 20)"
        );
    }

    #[test]
    fn display_nested_rule() {
        let rule = Rule::And(vec![
            Rule::Signal(Signal::EmaBullish(12)),
            Rule::Not(Box::new(Rule::Or(vec![
                Rule::Signal(Signal::ObvBearish),
                Rule::Signal(Signal::Bearish(1)),
            ]))),
        ]);
        assert_eq!(
            rule.to_string(),
            "AND(EMA_BULLISH(12), NOT(OR(OBV_BEARISH, BEARISH(1))))"
        );
    }

    #[test]
    fn evaluate_combinators() {
        let ctx = AnalyzeContext::new(series_from_closes(&[1.0, 2.0, 3.0]));
        let ic = ctx.at(2).unwrap();
        let up = Rule::Signal(Signal::Bullish(1));
        let down = Rule::Signal(Signal::Bearish(1));

        assert!(up.evaluate(&ic));
        assert!(!down.evaluate(&ic));
        assert!(Rule::Or(vec![up.clone(), down.clone()]).evaluate(&ic));
        assert!(!Rule::And(vec![up.clone(), down.clone()]).evaluate(&ic));
        assert!(Rule::Not(Box::new(down)).evaluate(&ic));
    }

    #[test]
    fn undefined_signal_is_false_and_negation_is_true() {
        let ctx = AnalyzeContext::new(series_from_closes(&[1.0, 2.0]));
        let ic = ctx.at(0).unwrap();
        let rule = Rule::Signal(Signal::SmaBullish(5));
        assert!(!rule.evaluate(&ic));
        assert!(Rule::Not(Box::new(rule)).evaluate(&ic));
    }
}
