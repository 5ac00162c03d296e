//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.
//!
//! ```text
//! rule    := AND(rule, rule, ...) | OR(rule, rule, ...) | NOT(rule) | signal
//! signal  := NAME | NAME(number, ...)
//! ```
//!
//! The same call syntax names indicators for `parse_indicator`, e.g.
//! `EMA(12)`, `MACD(12,26,9)`, `BOLLINGER(20,2)`.
//!
//! Integer arguments are capped at `u32::MAX`.

use crate::domain::error::ParseError;
use crate::domain::indicator::{
    BearishAbandonedBaby, BullishShortDay, DownsideTasukiGap, IndicatorType, Stochastics,
};
use crate::domain::rule::{Rule, Signal};

const STO_OVERBOUGHT: f64 = 80.0;
const STO_OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
enum StochasticsKind {
    Fast,
    Slow,
    Full,
}

impl StochasticsKind {
    fn from_prefix(name: &str) -> Option<(StochasticsKind, &str)> {
        [
            ("FAST_STO_", StochasticsKind::Fast),
            ("SLOW_STO_", StochasticsKind::Slow),
            ("FULL_STO_", StochasticsKind::Full),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| name.strip_prefix(prefix).map(|rest| (kind, rest)))
    }

    fn arity(self) -> usize {
        match self {
            StochasticsKind::Fast | StochasticsKind::Slow => 2,
            StochasticsKind::Full => 3,
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

/// Numeric arguments of a call, each with its offset.
struct Args {
    name: String,
    position: usize,
    values: Vec<(f64, usize)>,
}

impl Args {
    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.position,
        }
    }

    fn expect_len(&self, allowed: &[usize]) -> Result<(), ParseError> {
        if allowed.contains(&self.values.len()) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(self.error(format!(
            "{} takes {} argument(s), found {}",
            self.name,
            expected,
            self.values.len()
        )))
    }

    fn integer(&self, i: usize) -> Result<usize, ParseError> {
        let (value, position) = self.values[i];
        if !(value.is_finite() && value >= 0.0 && value.fract() == 0.0) {
            return Err(ParseError {
                message: format!("{} expects a non-negative integer, found {}", self.name, value),
                position,
            });
        }
        if value > u32::MAX as f64 {
            return Err(ParseError {
                message: format!("{} argument {} exceeds {}", self.name, value, u32::MAX),
                position,
            });
        }
        Ok(value as usize)
    }

    /// A non-negative finite standard-deviation multiplier.
    fn multiplier(&self, i: usize, default: f64) -> Result<f64, ParseError> {
        let Some(&(value, position)) = self.values.get(i) else {
            return Ok(default);
        };
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(ParseError {
                message: format!("{} multiplier must be non-negative, found {}", self.name, value),
                position,
            })
        }
    }

    /// Integer arguments `0..n` when present, `defaults` when there are none.
    fn integers_or<const N: usize>(&self, defaults: [usize; N]) -> Result<[usize; N], ParseError> {
        self.expect_len(&[0, N])?;
        if self.values.is_empty() {
            return Ok(defaults);
        }
        let mut out = defaults;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.integer(i)?;
        }
        Ok(out)
    }

    fn stochastics(&self, kind: StochasticsKind) -> Result<Stochastics, ParseError> {
        Ok(match kind {
            StochasticsKind::Fast => Stochastics::fast(self.integer(0)?, self.integer(1)?),
            StochasticsKind::Slow => Stochastics::slow(self.integer(0)?, self.integer(1)?),
            StochasticsKind::Full => {
                Stochastics::full(self.integer(0)?, self.integer(1)?, self.integer(2)?)
            }
        })
    }

    /// `FAST_STO_*`, `SLOW_STO_*` and `FULL_STO_*` signals; None for any
    /// other name.
    fn stochastics_signal(&self) -> Result<Option<Signal>, ParseError> {
        let Some((kind, suffix)) = StochasticsKind::from_prefix(&self.name) else {
            return Ok(None);
        };
        let n = kind.arity();
        let threshold = |default: f64| -> Result<(Stochastics, f64), ParseError> {
            self.expect_len(&[n, n + 1])?;
            let sto = self.stochastics(kind)?;
            Ok((sto, self.values.get(n).map_or(default, |(v, _)| *v)))
        };
        let plain = || -> Result<Stochastics, ParseError> {
            self.expect_len(&[n])?;
            self.stochastics(kind)
        };
        let signal = match suffix {
            "OVERBOUGHT" => {
                let (sto, threshold) = threshold(STO_OVERBOUGHT)?;
                Signal::StoOverbought { sto, threshold }
            }
            "OVERSOLD" => {
                let (sto, threshold) = threshold(STO_OVERSOLD)?;
                Signal::StoOversold { sto, threshold }
            }
            "OSC_BULLISH" => Signal::StoOscBullish(plain()?),
            "OSC_BEARISH" => Signal::StoOscBearish(plain()?),
            "BULLISH_CROSS" => Signal::StoBullishCross(plain()?),
            "BEARISH_CROSS" => Signal::StoBearishCross(plain()?),
            _ => return Ok(None),
        };
        Ok(Some(signal))
    }

    fn bearish_abandoned_baby(&self) -> Result<BearishAbandonedBaby, ParseError> {
        let defaults = BearishAbandonedBaby::default();
        let [up_trend, long_period] = self.integers_or([defaults.up_trend, defaults.long_period])?;
        Ok(BearishAbandonedBaby {
            up_trend,
            long_period,
        })
    }

    fn bullish_short_day(&self) -> Result<BullishShortDay, ParseError> {
        let [period] = self.integers_or([BullishShortDay::default().period])?;
        Ok(BullishShortDay { period })
    }

    fn downside_tasuki_gap(&self) -> Result<DownsideTasukiGap, ParseError> {
        let [down_trend] = self.integers_or([DownsideTasukiGap::default().down_trend])?;
        Ok(DownsideTasukiGap { down_trend })
    }

    fn none(&self) -> Result<(), ParseError> {
        self.expect_len(&[0])
    }

    fn one(&self) -> Result<usize, ParseError> {
        self.expect_len(&[1])?;
        self.integer(0)
    }

    fn one_or(&self, default: usize) -> Result<usize, ParseError> {
        self.expect_len(&[0, 1])?;
        if self.values.is_empty() {
            Ok(default)
        } else {
            self.integer(0)
        }
    }

    fn two(&self) -> Result<(usize, usize), ParseError> {
        self.expect_len(&[2])?;
        Ok((self.integer(0)?, self.integer(1)?))
    }

    fn three(&self) -> Result<(usize, usize, usize), ParseError> {
        self.expect_len(&[3])?;
        Ok((self.integer(0)?, self.integer(1)?, self.integer(2)?))
    }

    /// An integer period followed by an optional number.
    fn period_and_number(&self, default: f64) -> Result<(usize, f64), ParseError> {
        self.expect_len(&[1, 2])?;
        let number = self.values.get(1).map_or(default, |(v, _)| *v);
        Ok((self.integer(0)?, number))
    }

    /// Period and multiplier of a Bollinger band signal.
    fn band(&self) -> Result<(usize, f64), ParseError> {
        self.expect_len(&[2])?;
        Ok((self.integer(0)?, self.multiplier(1, 0.0)?))
    }

    fn bollinger(&self) -> Result<IndicatorType, ParseError> {
        self.expect_len(&[1, 2])?;
        let period = self.integer(0)?;
        let mult = self.multiplier(1, 2.0)?;
        Ok(IndicatorType::Bollinger {
            period,
            stddev_mult_x100: (mult * 100.0).round() as u32,
        })
    }

    fn stochastics_indicator(&self) -> Result<Stochastics, ParseError> {
        self.expect_len(&[3])?;
        self.stochastics(StochasticsKind::Full)
    }
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_word(&self) -> String {
        self.remaining()
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect()
    }

    fn describe_next(&self) -> String {
        let word = self.peek_word();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    /// `NAME` or `NAME(n, ...)`.
    fn parse_call(&mut self, expected: &str) -> Result<Args, ParseError> {
        self.skip_whitespace();
        let position = self.pos;
        let name = self.peek_word();
        if name.is_empty() {
            return Err(ParseError {
                message: format!("expected {}, found '{}'", expected, self.describe_next()),
                position,
            });
        }
        self.pos += name.len();

        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.advance();
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
            } else {
                loop {
                    self.skip_whitespace();
                    let at = self.pos;
                    values.push((self.parse_number()?, at));
                    self.skip_whitespace();
                    if self.peek() == Some(')') {
                        self.advance();
                        break;
                    }
                    self.expect_char(',')?;
                }
            }
        }

        Ok(Args {
            name,
            position,
            values,
        })
    }

    fn parse_signal(&mut self) -> Result<Signal, ParseError> {
        let args = self.parse_call("rule")?;
        if let Some(signal) = args.stochastics_signal()? {
            return Ok(signal);
        }
        let signal = match args.name.as_str() {
            "BULLISH" => Signal::Bullish(args.one_or(1)?),
            "BEARISH" => Signal::Bearish(args.one_or(1)?),
            "OBV_BULLISH" => args.none().map(|_| Signal::ObvBullish)?,
            "OBV_BEARISH" => args.none().map(|_| Signal::ObvBearish)?,
            "ADL_BULLISH" => args.none().map(|_| Signal::AccumDistBullish)?,
            "ADL_BEARISH" => args.none().map(|_| Signal::AccumDistBearish)?,
            "ABOVE_SMA" => Signal::AboveSma(args.one()?),
            "BELOW_SMA" => Signal::BelowSma(args.one()?),
            "ABOVE_EMA" => Signal::AboveEma(args.one()?),
            "BELOW_EMA" => Signal::BelowEma(args.one()?),
            "SMA_BULLISH" => Signal::SmaBullish(args.one()?),
            "SMA_BEARISH" => Signal::SmaBearish(args.one()?),
            "EMA_BULLISH" => Signal::EmaBullish(args.one()?),
            "EMA_BEARISH" => Signal::EmaBearish(args.one()?),
            "SMA_OSC_BULLISH" => {
                let (fast, slow) = args.two()?;
                Signal::SmaOscBullish { fast, slow }
            }
            "SMA_OSC_BEARISH" => {
                let (fast, slow) = args.two()?;
                Signal::SmaOscBearish { fast, slow }
            }
            "EMA_OSC_BULLISH" => {
                let (fast, slow) = args.two()?;
                Signal::EmaOscBullish { fast, slow }
            }
            "EMA_OSC_BEARISH" => {
                let (fast, slow) = args.two()?;
                Signal::EmaOscBearish { fast, slow }
            }
            "MACD_OSC_BULLISH" => {
                let (fast, slow, signal) = args.three()?;
                Signal::MacdOscBullish { fast, slow, signal }
            }
            "MACD_OSC_BEARISH" => {
                let (fast, slow, signal) = args.three()?;
                Signal::MacdOscBearish { fast, slow, signal }
            }
            "SMA_BULLISH_CROSS" => {
                let (fast, slow) = args.two()?;
                Signal::SmaBullishCross { fast, slow }
            }
            "SMA_BEARISH_CROSS" => {
                let (fast, slow) = args.two()?;
                Signal::SmaBearishCross { fast, slow }
            }
            "EMA_BULLISH_CROSS" => {
                let (fast, slow) = args.two()?;
                Signal::EmaBullishCross { fast, slow }
            }
            "EMA_BEARISH_CROSS" => {
                let (fast, slow) = args.two()?;
                Signal::EmaBearishCross { fast, slow }
            }
            "MACD_BULLISH_CROSS" => {
                let (fast, slow, signal) = args.three()?;
                Signal::MacdBullishCross { fast, slow, signal }
            }
            "MACD_BEARISH_CROSS" => {
                let (fast, slow, signal) = args.three()?;
                Signal::MacdBearishCross { fast, slow, signal }
            }
            "RSI_OVERBOUGHT" => {
                let (period, threshold) = args.period_and_number(70.0)?;
                Signal::RsiOverbought { period, threshold }
            }
            "RSI_OVERSOLD" => {
                let (period, threshold) = args.period_and_number(30.0)?;
                Signal::RsiOversold { period, threshold }
            }
            "IN_BB_RANGE" => {
                let (period, sd) = args.band()?;
                Signal::InBbRange { period, sd }
            }
            "ABOVE_BB_UP" => {
                let (period, sd) = args.band()?;
                Signal::AboveBbUp { period, sd }
            }
            "BELOW_BB_LOW" => {
                let (period, sd) = args.band()?;
                Signal::BelowBbLow { period, sd }
            }
            "BREAKING_HIGHEST_HIGH" => Signal::BreakingHighestHigh(args.one()?),
            "BREAKING_HIGHEST_CLOSE" => Signal::BreakingHighestClose(args.one()?),
            "BREAKING_LOWEST_LOW" => Signal::BreakingLowestLow(args.one()?),
            "BREAKING_LOWEST_CLOSE" => Signal::BreakingLowestClose(args.one()?),
            "BREAKING_HISTORICAL_HIGHEST_HIGH" => {
                args.none().map(|_| Signal::BreakingHistoricalHighestHigh)?
            }
            "BREAKING_HISTORICAL_HIGHEST_CLOSE" => {
                args.none().map(|_| Signal::BreakingHistoricalHighestClose)?
            }
            "BREAKING_HISTORICAL_LOWEST_LOW" => {
                args.none().map(|_| Signal::BreakingHistoricalLowestLow)?
            }
            "BREAKING_HISTORICAL_LOWEST_CLOSE" => {
                args.none().map(|_| Signal::BreakingHistoricalLowestClose)?
            }
            "BEARISH_ABANDONED_BABY" => Signal::BearishAbandonedBaby(args.bearish_abandoned_baby()?),
            "BULLISH_SHORT_DAY" => Signal::BullishShortDay(args.bullish_short_day()?),
            "DOWNSIDE_TASUKI_GAP" => Signal::DownsideTasukiGap(args.downside_tasuki_gap()?),
            other => return Err(args.error(format!("expected rule, found '{}'", other))),
        };
        Ok(signal)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek_word() == keyword
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("expected '{}', found '{}'", keyword, self.describe_next()),
                position: self.pos,
            })
        }
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        if self.peek_keyword("AND") {
            return self.parse_list("AND").map(Rule::And);
        }
        if self.peek_keyword("OR") {
            return self.parse_list("OR").map(Rule::Or);
        }
        if self.peek_keyword("NOT") {
            return self.parse_not();
        }

        self.parse_signal().map(Rule::Signal)
    }

    fn parse_list(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let mut rules = Vec::new();
        rules.push(self.parse_rule()?);

        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }

        if rules.len() < 2 {
            return Err(ParseError {
                message: format!("{} requires at least 2 rules", keyword),
                position: self.pos,
            });
        }

        Ok(rules)
    }

    fn parse_not(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("NOT")?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(')')?;
        Ok(Rule::Not(Box::new(rule)))
    }

    fn parse_indicator(&mut self) -> Result<IndicatorType, ParseError> {
        let args = self.parse_call("indicator")?;
        let indicator = match args.name.as_str() {
            "SMA" => IndicatorType::Sma(args.one()?),
            "EMA" => IndicatorType::Ema(args.one()?),
            "SMA_OSC" => {
                let (fast, slow) = args.two()?;
                IndicatorType::SmaOscillator { fast, slow }
            }
            "EMA_OSC" => {
                let (fast, slow) = args.two()?;
                IndicatorType::EmaOscillator { fast, slow }
            }
            "HIGHEST_HIGH" => IndicatorType::HighestHigh(args.one()?),
            "LOWEST_LOW" => IndicatorType::LowestLow(args.one()?),
            "HIGHEST_CLOSE" => IndicatorType::HighestClose(args.one()?),
            "LOWEST_CLOSE" => IndicatorType::LowestClose(args.one()?),
            "HISTORICAL_HIGHEST_HIGH" => {
                args.none().map(|_| IndicatorType::HistoricalHighestHigh)?
            }
            "HISTORICAL_LOWEST_LOW" => args.none().map(|_| IndicatorType::HistoricalLowestLow)?,
            "HISTORICAL_HIGHEST_CLOSE" => {
                args.none().map(|_| IndicatorType::HistoricalHighestClose)?
            }
            "HISTORICAL_LOWEST_CLOSE" => {
                args.none().map(|_| IndicatorType::HistoricalLowestClose)?
            }
            "OBV" => args.none().map(|_| IndicatorType::Obv)?,
            "ADL" => args.none().map(|_| IndicatorType::AccumDist)?,
            "CLOSE_CHANGE" => IndicatorType::ClosePriceChange(args.one_or(1)?),
            "CLOSE_CHANGE_PCT" => args.none().map(|_| IndicatorType::ClosePricePercentageChange)?,
            "RSI" => IndicatorType::Rsi(args.one()?),
            "MACD" => {
                let (fast, slow, signal) = args.three()?;
                IndicatorType::Macd { fast, slow, signal }
            }
            "MACD_HIST" => {
                let (fast, slow, signal) = args.three()?;
                IndicatorType::MacdHistogram { fast, slow, signal }
            }
            "ATR" => IndicatorType::Atr(args.one()?),
            "PDI" => IndicatorType::PlusDi(args.one()?),
            "MDI" => IndicatorType::MinusDi(args.one()?),
            "ADX" => IndicatorType::Adx(args.one()?),
            "BOLLINGER" => args.bollinger()?,
            "STO" => IndicatorType::Stochastics(args.stochastics_indicator()?),
            "STO_OSC" => IndicatorType::StochasticsOscillator(args.stochastics_indicator()?),
            "STO_TREND" => IndicatorType::StochasticsTrend(args.stochastics_indicator()?),
            "ADL_TREND" => args.none().map(|_| IndicatorType::AccumDistTrend)?,
            "BEARISH_ABANDONED_BABY" => {
                let pattern = args.bearish_abandoned_baby()?;
                IndicatorType::BearishAbandonedBaby {
                    up_trend: pattern.up_trend,
                    long_period: pattern.long_period,
                }
            }
            "BULLISH_SHORT_DAY" => IndicatorType::BullishShortDay {
                period: args.bullish_short_day()?.period,
            },
            "DOWNSIDE_TASUKI_GAP" => IndicatorType::DownsideTasukiGap {
                down_trend: args.downside_tasuki_gap()?.down_trend,
            },
            other => return Err(args.error(format!("expected indicator, found '{}'", other))),
        };
        Ok(indicator)
    }

    fn finish<T>(&mut self, value: T) -> Result<T, ParseError> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError {
                message: format!("unexpected input after rule: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(value)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    let rule = parser.parse_rule()?;
    parser.finish(rule)
}

pub fn parse_indicator(input: &str) -> Result<IndicatorType, ParseError> {
    let mut parser = Parser::new(input);
    let indicator = parser.parse_indicator()?;
    parser.finish(indicator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_signal() {
        assert_eq!(parse("OBV_BULLISH").unwrap(), Rule::Signal(Signal::ObvBullish));
    }

    #[test]
    fn parse_signal_with_period() {
        assert_eq!(
            parse("EMA_BULLISH(12)").unwrap(),
            Rule::Signal(Signal::EmaBullish(12))
        );
    }

    #[test]
    fn parse_macd_cross() {
        assert_eq!(
            parse("MACD_BEARISH_CROSS(12, 26, 9)").unwrap(),
            Rule::Signal(Signal::MacdBearishCross {
                fast: 12,
                slow: 26,
                signal: 9
            })
        );
    }

    #[test]
    fn parse_rsi_default_threshold() {
        assert_eq!(
            parse("RSI_OVERSOLD(14)").unwrap(),
            Rule::Signal(Signal::RsiOversold {
                period: 14,
                threshold: 30.0
            })
        );
        assert_eq!(
            parse("RSI_OVERBOUGHT(14, 80.5)").unwrap(),
            Rule::Signal(Signal::RsiOverbought {
                period: 14,
                threshold: 80.5
            })
        );
    }

    #[test]
    fn parse_bullish_defaults_to_one_period() {
        assert_eq!(parse("BULLISH").unwrap(), Rule::Signal(Signal::Bullish(1)));
        assert_eq!(parse("BEARISH(3)").unwrap(), Rule::Signal(Signal::Bearish(3)));
    }

    #[test]
    fn parse_and() {
        let rule = parse("AND(EMA_BULLISH(12), OBV_BULLISH)").unwrap();
        assert!(matches!(rule, Rule::And(ref rules) if rules.len() == 2));
    }

    #[test]
    fn parse_or() {
        let rule = parse("OR(BULLISH, BEARISH)").unwrap();
        assert!(matches!(rule, Rule::Or(_)));
    }

    #[test]
    fn parse_not() {
        let rule = parse("NOT(ABOVE_SMA(20))").unwrap();
        assert_eq!(
            rule,
            Rule::Not(Box::new(Rule::Signal(Signal::AboveSma(20))))
        );
    }

    #[test]
    fn parse_variadic_and() {
        let rule = parse("AND(BULLISH, OBV_BULLISH, ADL_BULLISH)").unwrap();
        assert!(matches!(rule, Rule::And(ref rules) if rules.len() == 3));
    }

    #[test]
    fn parse_whitespace_handling() {
        let rule = parse("  AND (  EMA_BULLISH ( 12 ) ,NOT( RSI_OVERBOUGHT(14,70) ) )  ").unwrap();
        assert!(matches!(rule, Rule::And(_)));
    }

    #[test]
    fn display_round_trips() {
        let inputs = [
            "AND(EMA_BULLISH(12), NOT(RSI_OVERBOUGHT(14, 70)))",
            "OR(SMA_BULLISH_CROSS(5, 20), BREAKING_HISTORICAL_HIGHEST_HIGH)",
            "IN_BB_RANGE(20, 2.5)",
            "MACD_OSC_BEARISH(12, 26, 9)",
            "SLOW_STO_OSC_BEARISH(14, 3)",
            "FULL_STO_OVERBOUGHT(14, 5, 3, 75.5)",
            "AND(FAST_STO_BULLISH_CROSS(14, 3), DOWNSIDE_TASUKI_GAP(3))",
        ];
        for input in inputs {
            let rule = parse(input).unwrap();
            assert_eq!(rule.to_string(), input);
            assert_eq!(parse(&rule.to_string()).unwrap(), rule);
        }
    }

    #[test]
    fn error_unknown_signal() {
        let err = parse("MOON_PHASE(3)").unwrap_err();
        assert!(err.message.contains("MOON_PHASE"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn error_wrong_arity() {
        let err = parse("AND(BULLISH, EMA_BULLISH(12, 26))").unwrap_err();
        assert!(err.message.contains("EMA_BULLISH takes 1"));
        assert_eq!(err.position, 13);
    }

    #[test]
    fn error_fractional_period() {
        let err = parse("SMA_BULLISH(2.5)").unwrap_err();
        assert!(err.message.contains("non-negative integer"));
        assert_eq!(err.position, 12);
    }

    #[test]
    fn error_missing_paren() {
        let err = parse("NOT(BULLISH").unwrap_err();
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn error_trailing_input() {
        let err = parse("BULLISH extra").unwrap_err();
        assert!(err.message.contains("unexpected input"));
        assert_eq!(err.position, 8);
    }

    #[test]
    fn error_single_rule_and() {
        let err = parse("AND(BULLISH)").unwrap_err();
        assert!(err.message.contains("AND requires at least 2 rules"));
    }

    #[test]
    fn error_empty_input() {
        let err = parse("").unwrap_err();
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn error_whitespace_only() {
        assert!(parse("   ").is_err());
    }

    #[test]
    fn case_sensitive_keywords() {
        assert!(parse("ema_bullish(12)").is_err());
    }

    #[test]
    fn parse_indicator_names_match_display() {
        let types = [
            IndicatorType::Sma(20),
            IndicatorType::EmaOscillator { fast: 12, slow: 26 },
            IndicatorType::HistoricalLowestClose,
            IndicatorType::Obv,
            IndicatorType::ClosePricePercentageChange,
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorType::Adx(14),
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 250,
            },
            IndicatorType::Stochastics(Stochastics::full(14, 3, 3)),
            IndicatorType::StochasticsOscillator(Stochastics::fast(14, 3)),
            IndicatorType::StochasticsTrend(Stochastics::slow(14, 3)),
            IndicatorType::AccumDistTrend,
            IndicatorType::BearishAbandonedBaby {
                up_trend: 3,
                long_period: 20,
            },
            IndicatorType::BullishShortDay { period: 20 },
            IndicatorType::DownsideTasukiGap { down_trend: 4 },
        ];
        for ty in types {
            assert_eq!(parse_indicator(&ty.to_string()).unwrap(), ty);
        }
    }

    #[test]
    fn parse_indicator_bollinger_default_multiplier() {
        assert_eq!(
            parse_indicator("BOLLINGER(20)").unwrap(),
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 200
            }
        );
    }

    #[test]
    fn parse_indicator_rejects_unknown() {
        let err = parse_indicator("VWAP").unwrap_err();
        assert!(err.message.contains("expected indicator"));
    }

    #[test]
    fn parse_stochastics_signals() {
        assert_eq!(
            parse("FAST_STO_OVERBOUGHT(14, 3)").unwrap(),
            Rule::Signal(Signal::StoOverbought {
                sto: Stochastics::fast(14, 3),
                threshold: 80.0
            })
        );
        assert_eq!(
            parse("FULL_STO_OVERSOLD(14, 5, 3, 25)").unwrap(),
            Rule::Signal(Signal::StoOversold {
                sto: Stochastics::full(14, 5, 3),
                threshold: 25.0
            })
        );
        assert_eq!(
            parse("SLOW_STO_BULLISH_CROSS(14, 3)").unwrap(),
            Rule::Signal(Signal::StoBullishCross(Stochastics::slow(14, 3)))
        );
        assert_eq!(
            parse("FAST_STO_OSC_BULLISH(5, 3)").unwrap(),
            Rule::Signal(Signal::StoOscBullish(Stochastics::fast(5, 3)))
        );
    }

    #[test]
    fn error_stochastics_arity() {
        let err = parse("FULL_STO_OSC_BULLISH(14, 3)").unwrap_err();
        assert!(err.message.contains("FULL_STO_OSC_BULLISH takes 3"));
        let err = parse("SLOW_STO_OVERBOUGHT(14)").unwrap_err();
        assert!(err.message.contains("takes 2 or 3"));
        assert!(parse("FAST_STO_SIDEWAYS(14, 3)").is_err());
    }

    #[test]
    fn parse_patterns_with_defaults() {
        assert_eq!(
            parse("BEARISH_ABANDONED_BABY").unwrap(),
            Rule::Signal(Signal::BearishAbandonedBaby(BearishAbandonedBaby::default()))
        );
        assert_eq!(
            parse("BULLISH_SHORT_DAY(10)").unwrap(),
            Rule::Signal(Signal::BullishShortDay(BullishShortDay { period: 10 }))
        );
        assert!(parse("BEARISH_ABANDONED_BABY(3)").is_err());
    }

    #[test]
    fn error_integer_above_u32_max() {
        let err = parse_indicator("ADX(10000000000000000000)").unwrap_err();
        assert!(err.message.contains("exceeds"));
        assert_eq!(err.position, 4);
        assert_eq!(
            parse("SMA_BULLISH(4294967295)").unwrap(),
            Rule::Signal(Signal::SmaBullish(4_294_967_295))
        );
    }

    #[test]
    fn error_negative_band_multiplier() {
        let err = parse("IN_BB_RANGE(20, -1)").unwrap_err();
        assert!(err.message.contains("multiplier must be non-negative"));
        assert_eq!(err.position, 16);
        assert!(parse("BELOW_BB_LOW(20, -0.5)").is_err());
        assert!(parse("ABOVE_BB_UP(20, 0)").is_ok());
        assert!(parse_indicator("BOLLINGER(20, -2)").is_err());
    }
}
