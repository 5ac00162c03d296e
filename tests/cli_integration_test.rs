//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config loading and validation with real INI files on disk
//! - The validate command, including rule parse failures
//! - Backtest pipeline against a mock candle port and CSV files
//! - The indicator command over a CSV file
//! - Exit-code mapping per error class

mod common;

use clap::Parser;
use common::*;
use sigtrader::cli::{self, Cli, Command};
use sigtrader::domain::config_validation::{Overrides, validate_backtest_config};
use sigtrader::domain::error::{AnalysisError, ParseError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn ini(data_dir: &Path) -> String {
    format!(
        r#"
[backtest]
data_dir = {}
assets = JUMP:1, FLAT:1
principal = 2000
premium = 0

[strategy]
buy = BULLISH(1)
sell = BULLISH(1)
"#,
        data_dir.display()
    )
}

fn code_of(exit: ExitCode) -> String {
    format!("{exit:?}")
}

fn assert_exit(actual: ExitCode, expected: u8) {
    assert_eq!(code_of(actual), code_of(ExitCode::from(expected)));
}

fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    write_csv(dir.path(), "JUMP", jump_series("JUMP").candles());
    write_csv(dir.path(), "FLAT", flat_series("FLAT", &[100.0; 10]).candles());
    dir
}

mod argument_parsing {
    use super::*;

    #[test]
    fn backtest_with_overrides() {
        let cli = Cli::try_parse_from([
            "sigtrader",
            "backtest",
            "--config",
            "a.ini",
            "--data-dir",
            "/data",
            "--assets",
            "BHP:2",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                config,
                data_dir,
                assets,
            } => {
                assert_eq!(config, PathBuf::from("a.ini"));
                assert_eq!(data_dir, Some(PathBuf::from("/data")));
                assert_eq!(assets.as_deref(), Some("BHP:2"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn indicator_requires_name() {
        assert!(Cli::try_parse_from(["sigtrader", "indicator", "--csv", "x.csv"]).is_err());
        assert!(
            Cli::try_parse_from(["sigtrader", "indicator", "--csv", "x.csv", "--name", "SMA(3)"])
                .is_ok()
        );
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let dir = data_dir();
        let file = write_temp_ini(&ini(dir.path()));
        assert_exit(cli::run_validate(file.path()), 0);
    }

    #[test]
    fn missing_file_is_config_error() {
        assert_exit(cli::run_validate(Path::new("/nonexistent/path/config.ini")), 2);
    }

    #[test]
    fn invalid_rule_is_parse_error() {
        let dir = data_dir();
        let content = ini(dir.path()).replace("buy = BULLISH(1)", "buy = @@invalid syntax@@");
        let file = write_temp_ini(&content);
        assert_exit(cli::run_validate(file.path()), 4);
    }

    #[test]
    fn invalid_premium_is_config_error() {
        let dir = data_dir();
        let content = ini(dir.path()).replace("premium = 0", "premium = 150");
        let file = write_temp_ini(&content);
        assert_exit(cli::run_validate(file.path()), 2);
    }
}

mod backtest_pipeline {
    use super::*;

    fn settings(assets: &str) -> sigtrader::domain::config_validation::BacktestSettings {
        let adapter = sigtrader::adapters::file_config_adapter::FileConfigAdapter::from_string(
            &ini(Path::new("/unused")),
        )
        .unwrap();
        validate_backtest_config(
            &adapter,
            &Overrides {
                data_dir: None,
                assets: Some(assets.to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn runs_against_mock_port() {
        let port = MockCandlePort::new()
            .with_candles("JUMP", jump_series("JUMP").candles().to_vec())
            .with_candles("FLAT", flat_series("FLAT", &[100.0; 10]).candles().to_vec());
        assert_exit(cli::run_backtest_pipeline(settings("JUMP, FLAT"), &port), 0);
    }

    #[test]
    fn partial_universe_skips_bad_codes() {
        let port = MockCandlePort::new()
            .with_candles("JUMP", jump_series("JUMP").candles().to_vec())
            .with_error("BROKEN", "bad row");
        assert_exit(
            cli::run_backtest_pipeline(settings("JUMP, BROKEN, MISSING"), &port),
            0,
        );
    }

    #[test]
    fn no_loadable_codes_is_data_error() {
        let port = MockCandlePort::new().with_error("BROKEN", "bad row");
        assert_exit(cli::run_backtest_pipeline(settings("BROKEN, MISSING"), &port), 5);
    }

    #[test]
    fn end_to_end_with_csv_files() {
        let dir = data_dir();
        let file = write_temp_ini(&ini(dir.path()));
        assert_exit(cli::run_backtest(file.path(), Overrides::default()), 0);
    }

    #[test]
    fn data_dir_override() {
        let dir = data_dir();
        let file = write_temp_ini(&ini(Path::new("/nonexistent")));
        let overrides = Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            assets: None,
        };
        assert_exit(cli::run_backtest(file.path(), overrides), 0);
    }

    #[test]
    fn missing_principal_is_config_error() {
        let dir = data_dir();
        let content = ini(dir.path()).replace("principal = 2000\n", "");
        let file = write_temp_ini(&content);
        assert_exit(cli::run_backtest(file.path(), Overrides::default()), 2);
    }
}

mod indicator_command {
    use super::*;

    #[test]
    fn prints_known_indicator() {
        let dir = data_dir();
        let path = dir.path().join("JUMP.csv");
        assert_exit(cli::run_indicator(&path, "SMA(3)"), 0);
        assert_exit(cli::run_indicator(&path, "BOLLINGER(5, 2)"), 0);
        assert_exit(cli::run_indicator(&path, "MACD(3, 6, 2)"), 0);
        assert_exit(cli::run_indicator(&path, "STO(3, 1, 2)"), 0);
        assert_exit(cli::run_indicator(&path, "ADL_TREND"), 0);
        assert_exit(cli::run_indicator(&path, "BULLISH_SHORT_DAY(3)"), 0);
    }

    #[test]
    fn oversized_period_is_parse_error() {
        let dir = data_dir();
        assert_exit(
            cli::run_indicator(&dir.path().join("JUMP.csv"), "ADX(10000000000000000000)"),
            4,
        );
    }

    #[test]
    fn unknown_indicator_is_parse_error() {
        let dir = data_dir();
        assert_exit(cli::run_indicator(&dir.path().join("JUMP.csv"), "WOBBLE(3)"), 4);
    }

    #[test]
    fn missing_csv_is_data_error() {
        let dir = data_dir();
        assert_exit(cli::run_indicator(&dir.path().join("NONE.csv"), "SMA(3)"), 5);
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn each_error_class_has_its_own_code() {
        let cases: Vec<(AnalysisError, u8)> = vec![
            (AnalysisError::Io(std::io::Error::other("disk")), 1),
            (
                AnalysisError::ConfigMissing {
                    section: "backtest".into(),
                    key: "assets".into(),
                },
                2,
            ),
            (
                AnalysisError::InvalidConfiguration {
                    reason: "no assets".into(),
                },
                2,
            ),
            (AnalysisError::IndexOutOfRange { index: 3, len: 2 }, 3),
            (
                AnalysisError::RuleParse(ParseError {
                    message: "x".into(),
                    position: 0,
                }),
                4,
            ),
            (AnalysisError::NoData { code: "BHP".into() }, 5),
        ];
        for (err, expected) in cases {
            assert_exit(ExitCode::from(&err), expected);
        }
    }
}

#[test]
fn codes_command_lists_csv_files() {
    let dir = data_dir();
    assert_exit(cli::run_codes(dir.path().to_path_buf()), 0);
}
