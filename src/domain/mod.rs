//! Core domain types and logic.

pub mod analyzable;
pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod indexed;
pub mod indicator;
pub mod metrics;
pub mod rule;
pub mod rule_parser;
pub mod signals;
pub mod smoothing;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_support;
