// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use thiserror::Error;
#[derive(Error, Debug)]
pub enum ChartMapError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Dataset lookup error: {0}")]
    Lookup(#[from] LookupError),
    #[error("Form data cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Table chart must have at least one column")]
    EmptyColumns,
    #[error("Table chart must have at least one raw column or aggregated metric")]
    NoColumnsOrMetrics,
    #[error("XY chart must have at least one Y-axis metric")]
    EmptyMetrics,
    #[error("Column name cannot be empty for {field}")]
    BlankColumnName { field: String },
    #[error("Unsupported chart type: '{chart_type}'")]
    UnsupportedChartType { chart_type: String },
    #[error("Invalid chart configuration: {reason}")]
    InvalidConfig { reason: String },
}
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Invalid dataset identifier '{value}'")]
    InvalidIdentifier { value: String },
    #[error("Dataset {dataset} is missing attribute '{attribute}'")]
    MissingAttribute { dataset: String, attribute: String },
    #[error("Dataset backend failure: {0}")]
    Backend(String),
    #[error("Dataset command failed: {0}")]
    Command(String),
}
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to store form data: {0}")]
    StoreFailed(String),
    #[error("Form data key '{key}' not found")]
    KeyNotFound { key: String },
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    FileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML configuration: {source}")]
    YamlParseError {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {field} = {value}")]
    InvalidValue { field: String, value: String },
    #[error("Invalid high-cardinality pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}
/// Internal failure of an advisory check. Never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvisorError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },
    #[error("Advisor '{advisor}' cannot inspect {chart_type} charts")]
    Unsupported {
        advisor: &'static str,
        chart_type: &'static str,
    },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonSerialisationError {
        #[from]
        source: serde_json::Error,
    },
    #[error("Form data is not a JSON object")]
    NotAnObject,
}
pub type Result<T> = std::result::Result<T, ChartMapError>;
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
pub type LookupResult<T> = std::result::Result<T, LookupError>;
pub type CacheResult<T> = std::result::Result<T, CacheError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type AdviceResult<T> = std::result::Result<T, AdvisorError>;
impl From<serde_json::Error> for ChartMapError {
    fn from(err: serde_json::Error) -> Self {
        ChartMapError::Serialisation(SerialisationError::JsonSerialisationError { source: err })
    }
}
impl ChartMapError {
    /// Input problems the caller can fix and resubmit.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChartMapError::Validation(_) | ChartMapError::Lookup(LookupError::InvalidIdentifier { .. })
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            ChartMapError::Validation(_) => "Validation",
            ChartMapError::Lookup(_) => "Lookup",
            ChartMapError::Cache(_) => "Cache",
            ChartMapError::Config(_) => "Configuration",
            ChartMapError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ChartMapError::Validation(ValidationError::EmptyColumns)
            | ChartMapError::Validation(ValidationError::NoColumnsOrMetrics) => vec![
                "Add at least one column to display in the table".to_string(),
                "Use {\"name\": \"column\"} for raw columns".to_string(),
                "Add an aggregate such as SUM or COUNT to turn a column into a metric".to_string(),
            ],
            ChartMapError::Validation(ValidationError::EmptyMetrics) => vec![
                "Add at least one metric to the Y-axis array".to_string(),
                "Use {\"name\": \"metric_column\", \"aggregate\": \"SUM\"}".to_string(),
            ],
            ChartMapError::Validation(ValidationError::BlankColumnName { .. }) => vec![
                "Provide non-empty values for all column names".to_string(),
            ],
            ChartMapError::Validation(ValidationError::UnsupportedChartType { .. }) => vec![
                "Ensure chart_type is set to 'xy' or 'table'".to_string(),
            ],
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            ChartMapError::Validation(ValidationError::EmptyColumns) => {
                "The table has no columns. Please choose at least one column to display.".to_string()
            }
            ChartMapError::Validation(ValidationError::EmptyMetrics) => {
                "The chart has no Y-axis metrics. Please add at least one metric.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
pub fn error_severity(error: &ChartMapError) -> ErrorSeverity {
    match error {
        ChartMapError::Validation(_) => ErrorSeverity::Error,
        ChartMapError::Lookup(_) | ChartMapError::Cache(_) => ErrorSeverity::Warning,
        ChartMapError::Config(_) => ErrorSeverity::Critical,
        ChartMapError::Serialisation(_) => ErrorSeverity::Error,
    }
}
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &ChartMapError) -> String {
        let severity = error_severity(error);
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!("[{}] {}\n", severity.as_str(), error));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_recoverable() {
        let err = ChartMapError::from(ValidationError::EmptyMetrics);
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "Validation");
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn plain_report_has_no_escape_codes() {
        let err = ChartMapError::from(ValidationError::EmptyColumns);
        let report = ErrorReporter::plain().report(&err);
        assert!(report.starts_with("[ERROR] Validation error: Table chart must have at least one column"));
        assert!(!report.contains('\x1b'));
        assert!(report.contains("Suggestions:"));
    }
}
