//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::Runner;
use crate::domain::candle::{Series, SeriesId};
use crate::domain::config_validation::{BacktestSettings, Overrides, validate_backtest_config};
use crate::domain::error::AnalysisError;
use crate::domain::events::BacktestEvent;
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::metrics::Metrics;
use crate::domain::rule_parser;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::CandlePort;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Indicator analysis and rule backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <CODE>.csv files, overrides [backtest] data_dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// CODE[:WEIGHT] list, overrides [backtest] assets
        #[arg(long)]
        assets: Option<String>,
    },
    /// Validate a configuration and its rules
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print one indicator over a CSV file
    Indicator {
        #[arg(long)]
        csv: PathBuf,
        /// e.g. SMA(20), MACD(12,26,9), BOLLINGER(20,2), STO(14,3,3)
        #[arg(short, long)]
        name: String,
    },
    /// List the codes available in a data directory
    Codes {
        #[arg(long)]
        data_dir: PathBuf,
    },
}

/// Logs go to stderr; `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            assets,
        } => run_backtest(&config, Overrides { data_dir, assets }),
        Command::Validate { config } => run_validate(&config),
        Command::Indicator { csv, name } => run_indicator(&csv, &name),
        Command::Codes { data_dir } => run_codes(data_dir),
    }
}

fn fail(err: &AnalysisError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn run_backtest(config_path: &Path, overrides: Overrides) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let settings = match validate_backtest_config(&adapter, &overrides) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    eprintln!("Buy rule:  {}", settings.buy);
    eprintln!("Sell rule: {}", settings.sell);

    let data = CsvAdapter::new(settings.data_dir.clone());
    run_backtest_pipeline(settings, &data)
}

fn load_series(
    data: &dyn CandlePort,
    settings: &BacktestSettings,
) -> Result<(Vec<(Series, u32)>, BTreeMap<SeriesId, String>), AnalysisError> {
    let mut series = Vec::new();
    let mut names = BTreeMap::new();
    for asset in &settings.assets {
        match data.fetch_candles(&asset.code) {
            Ok(candles) => {
                eprintln!("  {}: {} candles (weight {})", asset.code, candles.len(), asset.weight);
                let s = Series::new(asset.code.clone(), candles);
                names.insert(s.id(), asset.code.clone());
                series.push((s, asset.weight));
            }
            Err(e @ (AnalysisError::NoData { .. } | AnalysisError::DataFormat { .. })) => {
                eprintln!("warning: skipping {} ({})", asset.code, e);
            }
            Err(e) => return Err(e),
        }
    }
    if series.is_empty() {
        return Err(AnalysisError::NoData {
            code: settings
                .assets
                .iter()
                .map(|a| a.code.as_str())
                .collect::<Vec<_>>()
                .join(","),
        });
    }
    Ok((series, names))
}

/// Loads every asset from `data`, runs the backtest and prints the summary.
pub fn run_backtest_pipeline(settings: BacktestSettings, data: &dyn CandlePort) -> ExitCode {
    let (series, names) = match load_series(data, &settings) {
        Ok(loaded) => loaded,
        Err(e) => return fail(&e),
    };

    let trade_names = names.clone();
    let mut builder = Runner::builder()
        .buy_rule(settings.buy)
        .sell_rule(settings.sell)
        .observe(move |event: &BacktestEvent| print_trade(&trade_names, event));
    for (s, weight) in series {
        builder = builder.add(s, weight);
    }
    let runner = builder.build();

    eprintln!(
        "Running {} assets with principal {:.2} (premium {}%)",
        runner.assets().len(),
        settings.run.principal,
        settings.run.premium
    );
    let result = match runner.run(&settings.run) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    let metrics = Metrics::compute(&result);

    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Principal:        {:.2}", result.total_principal());
    eprintln!("Final Cash:       {:.2}", result.total_final_cash());
    eprintln!("Corrected:        {:.2}", result.corrected_balance());
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Round Trips:      {} (won {}, lost {}, even {})",
        metrics.trades_won + metrics.trades_lost + metrics.trades_breakeven,
        metrics.trades_won,
        metrics.trades_lost,
        metrics.trades_breakeven
    );
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Avg Duration:     {:.1} days", metrics.avg_trade_duration);

    eprintln!("\n=== Per-Asset Summary ===");
    for summary in &metrics.per_series {
        let name = names.get(&summary.series).map_or("?", String::as_str);
        eprintln!(
            "  {:<8} {:>12.2} -> {:>12.2}  trades {:>3}{}",
            name,
            summary.initial,
            summary.final_cash,
            summary.trades,
            if summary.holding { "  (holding)" } else { "" }
        );
    }

    ExitCode::SUCCESS
}

fn print_trade(names: &BTreeMap<SeriesId, String>, event: &BacktestEvent) {
    let trade = event.trade();
    let name = names.get(&trade.series).map_or("?", String::as_str);
    match event {
        BacktestEvent::Bought(_) => println!(
            "BUY  {name} {} price={:.4} qty={:.4} cash_out={:.2}",
            trade.timestamp, trade.price, trade.quantity, trade.cash_flow
        ),
        BacktestEvent::Sold { profit_ratio, .. } => println!(
            "SELL {name} {} price={:.4} qty={:.4} cash_in={:.2} ratio={:.4}",
            trade.timestamp, trade.price, trade.quantity, trade.cash_flow, profit_ratio
        ),
    }
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    for key in ["buy", "sell"] {
        let raw = match adapter.require("strategy", key) {
            Ok(raw) => raw,
            Err(e) => return fail(&e),
        };
        match rule_parser::parse(&raw) {
            Ok(rule) => {
                eprintln!("\n{key} rule:");
                eprintln!("  Parsed: {rule}");
                eprintln!("  Raw:    {raw}");
            }
            Err(e) => {
                eprintln!("error: failed to parse {key}:\n{}", e.display_with_context(&raw));
                return (&AnalysisError::RuleParse(e)).into();
            }
        }
    }

    match validate_backtest_config(&adapter, &Overrides::default()) {
        Ok(settings) => {
            eprintln!("\nAssets:");
            for asset in &settings.assets {
                eprintln!("  {} (weight {})", asset.code, asset.weight);
            }
            eprintln!("\nConfiguration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn indicator_columns(indicator: &IndicatorType) -> Vec<String> {
    match indicator {
        IndicatorType::Macd { .. } => vec!["line".into(), "signal".into(), "histogram".into()],
        IndicatorType::Bollinger { .. } => vec!["lower".into(), "middle".into(), "upper".into()],
        IndicatorType::Stochastics(_) => vec!["k".into(), "d".into(), "j".into()],
        other => vec![other.to_string()],
    }
}

fn indicator_cells(value: Option<&IndicatorValue>, width: usize) -> Vec<String> {
    let values = match value {
        None => return vec![String::new(); width],
        Some(IndicatorValue::Simple(v)) => vec![*v],
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => vec![*line, *signal, *histogram],
        Some(IndicatorValue::Bollinger {
            lower,
            middle,
            upper,
        }) => vec![*lower, *middle, *upper],
        Some(IndicatorValue::Stochastics { k, d, j }) => vec![*k, *d, *j],
        Some(categorical @ (IndicatorValue::Trend(_) | IndicatorValue::Flag(_))) => {
            return vec![categorical.to_string()];
        }
    };
    values.iter().map(|v| format!("{v:.4}")).collect()
}

pub fn run_indicator(csv_path: &Path, name: &str) -> ExitCode {
    let indicator = match rule_parser::parse_indicator(name) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: invalid indicator:\n{}", e.display_with_context(name));
            return (&AnalysisError::RuleParse(e)).into();
        }
    };

    let dir = csv_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let Some(code) = csv_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return fail(&AnalysisError::NoData {
            code: csv_path.display().to_string(),
        });
    };
    let candles = match CsvAdapter::new(dir).fetch_candles(&code) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    eprintln!("{indicator} over {} candles of {code}", candles.len());

    let series = Series::new(code, candles);
    let columns = indicator_columns(&indicator);
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    let mut header = vec!["timestamp".to_string()];
    header.extend(columns.iter().cloned());
    if let Err(e) = writer.write_record(&header) {
        return fail(&AnalysisError::Io(e.into()));
    }
    for tick in indicator.evaluate(&series) {
        let mut row = vec![tick.timestamp.to_string()];
        row.extend(indicator_cells(tick.value.as_ref(), columns.len()));
        if let Err(e) = writer.write_record(&row) {
            return fail(&AnalysisError::Io(e.into()));
        }
    }
    if let Err(e) = writer.flush() {
        return fail(&AnalysisError::Io(e));
    }
    ExitCode::SUCCESS
}

pub fn run_codes(data_dir: PathBuf) -> ExitCode {
    match CsvAdapter::new(data_dir).list_codes() {
        Ok(codes) if codes.is_empty() => {
            eprintln!("No codes found");
            ExitCode::SUCCESS
        }
        Ok(codes) => {
            for code in &codes {
                println!("{code}");
            }
            eprintln!("{} codes found", codes.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
