//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("malformed data for {code}: {reason}")]
    DataFormat { code: String, reason: String },

    #[error("background run failed: {reason}")]
    TaskJoin { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

impl From<&AnalysisError> for std::process::ExitCode {
    fn from(err: &AnalysisError) -> Self {
        let code: u8 = match err {
            AnalysisError::Io(_) | AnalysisError::TaskJoin { .. } => 1,
            AnalysisError::ConfigParse { .. }
            | AnalysisError::ConfigMissing { .. }
            | AnalysisError::ConfigInvalid { .. }
            | AnalysisError::InvalidConfiguration { .. } => 2,
            AnalysisError::IndexOutOfRange { .. } => 3,
            AnalysisError::RuleParse(_) => 4,
            AnalysisError::NoData { .. } | AnalysisError::DataFormat { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 4,
        };
        let rendered = err.display_with_context("OBV_BULLISH(");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "OBV_BULLISH(");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("position 4"));
    }

    #[test]
    fn index_out_of_range_message() {
        let err = AnalysisError::IndexOutOfRange { index: 10, len: 5 };
        assert_eq!(
            err.to_string(),
            "index 10 out of range for series of length 5"
        );
    }

    #[test]
    fn rule_parse_converts_from_parse_error() {
        let err: AnalysisError = ParseError {
            message: "bad".into(),
            position: 0,
        }
        .into();
        assert!(matches!(err, AnalysisError::RuleParse(_)));
    }
}
