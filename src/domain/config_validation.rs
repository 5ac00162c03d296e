//! Configuration validation.
//!
//! Turns `[backtest]` and `[strategy]` sections into checked settings before
//! any data is loaded.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::domain::backtest::RunConfig;
use crate::domain::candle::parse_timestamp;
use crate::domain::error::AnalysisError;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub code: String,
    pub weight: u32,
}

#[derive(Debug, Clone)]
pub struct BacktestSettings {
    pub data_dir: PathBuf,
    pub assets: Vec<AssetSpec>,
    pub run: RunConfig,
    pub buy: Rule,
    pub sell: Rule,
}

/// Values given on the command line win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub assets: Option<String>,
}

pub fn validate_backtest_config(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<BacktestSettings, AnalysisError> {
    let data_dir = match &overrides.data_dir {
        Some(dir) => dir.clone(),
        None => PathBuf::from(config.require("backtest", "data_dir")?),
    };
    let assets = match &overrides.assets {
        Some(raw) => parse_assets(raw)?,
        None => parse_assets(&config.require("backtest", "assets")?)?,
    };
    let principal = validate_principal(config)?;
    let premium = validate_premium(config)?;
    let (start_time, end_time) = validate_times(config)?;
    let (buy, sell) = validate_strategy_config(config)?;

    Ok(BacktestSettings {
        data_dir,
        assets,
        run: RunConfig {
            principal,
            premium,
            start_time,
            end_time,
        },
        buy,
        sell,
    })
}

/// Parses the buy and sell rules.
pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(Rule, Rule), AnalysisError> {
    let buy = rule_parser::parse(&config.require("strategy", "buy")?)?;
    let sell = rule_parser::parse(&config.require("strategy", "sell")?)?;
    Ok((buy, sell))
}

fn invalid(key: &str, reason: impl Into<String>) -> AnalysisError {
    AnalysisError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// `CODE[:WEIGHT], ...`; the weight defaults to 1.
pub fn parse_assets(raw: &str) -> Result<Vec<AssetSpec>, AnalysisError> {
    let mut assets = Vec::new();
    let mut seen = BTreeSet::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (code, weight) = match entry.split_once(':') {
            Some((code, weight)) => {
                let weight = weight
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid("assets", format!("invalid weight in {entry:?}")))?;
                (code.trim(), weight)
            }
            None => (entry, 1),
        };
        if code.is_empty() {
            return Err(invalid("assets", format!("missing code in {entry:?}")));
        }
        if !seen.insert(code.to_string()) {
            return Err(invalid("assets", format!("{code} listed more than once")));
        }
        assets.push(AssetSpec {
            code: code.to_string(),
            weight,
        });
    }

    if assets.is_empty() {
        return Err(invalid("assets", "no assets listed"));
    }
    if assets.iter().all(|a| a.weight == 0) {
        return Err(invalid("assets", "total weight must be positive"));
    }
    Ok(assets)
}

fn parse_number(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, AnalysisError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(key, format!("{raw:?} is not a number"))),
    }
}

fn validate_principal(config: &dyn ConfigPort) -> Result<f64, AnalysisError> {
    let value = parse_number(config, "principal")?.ok_or_else(|| AnalysisError::ConfigMissing {
        section: "backtest".to_string(),
        key: "principal".to_string(),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid("principal", "principal must be non-negative"));
    }
    Ok(value)
}

fn validate_premium(config: &dyn ConfigPort) -> Result<f64, AnalysisError> {
    let value = parse_number(config, "premium")?.unwrap_or(0.0);
    if !value.is_finite() || !(0.0..100.0).contains(&value) {
        return Err(invalid("premium", "premium must be in [0, 100)"));
    }
    Ok(value)
}

fn parse_time(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDateTime>, AnalysisError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            invalid(
                key,
                format!("invalid {key} format, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"),
            )
        }),
    }
}

fn validate_times(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), AnalysisError> {
    let start = parse_time(config, "start_time")?;
    let end = parse_time(config, "end_time")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid("start_time", "start_time must not be after end_time"));
        }
    }
    Ok((start, end))
}
