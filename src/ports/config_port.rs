//! Configuration access port.

use crate::domain::error::AnalysisError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Non-blank value or `ConfigMissing`.
    fn require(&self, section: &str, key: &str) -> Result<String, AnalysisError> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AnalysisError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
