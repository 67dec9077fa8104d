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

//! Structured error responses for tool and HTTP handlers.
//!
//! Every failure is classified into an [`ErrorKind`], whose wording and error
//! code come from the immutable [`TEMPLATES`] table. Raw input that failed to
//! parse can be diagnosed to point the caller at the missing fields.

use crate::error::{ChartMapError, LookupError, ValidationError};
use crate::mapper::SUPPORTED_CHART_TYPES;
use crate::schema::FILTER_OPERATORS;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::warn;
pub const SCHEMA_VERSION: &str = "2.0";
pub const API_VERSION: &str = "v1";
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    EmptyData,
    InvalidAggregate,
    Configuration,
    Permission,
    QueryExecution,
    QueryTimeout,
    System,
}
impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Validation,
        ErrorKind::EmptyData,
        ErrorKind::InvalidAggregate,
        ErrorKind::Configuration,
        ErrorKind::Permission,
        ErrorKind::QueryExecution,
        ErrorKind::QueryTimeout,
        ErrorKind::System,
    ];
}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTemplate {
    pub error_type: &'static str,
    pub message: &'static str,
    pub error_code: &'static str,
    pub details_prefix: &'static str,
    pub suggestions: &'static [&'static str],
}
const CONFIGURATION_SUGGESTIONS: &[&str] = &[
    "Review chart configuration for invalid values",
    "Ensure all required parameters are provided correctly",
    "Check data types and formats of input fields",
];
const SYSTEM_TEMPLATE: ErrorTemplate = ErrorTemplate {
    error_type: "system_error",
    message: "Unexpected error occurred",
    error_code: "SYSTEM_ERROR",
    details_prefix: "An unexpected error occurred",
    suggestions: &[
        "Try again with a simpler chart configuration",
        "Check that all input parameters are valid",
        "Verify the dataset is accessible and contains data",
        "Contact support if the issue persists",
    ],
};
pub static TEMPLATES: Lazy<HashMap<ErrorKind, ErrorTemplate>> = Lazy::new(|| {
    HashMap::from([
        (
            ErrorKind::Validation,
            ErrorTemplate {
                error_type: "validation_error",
                message: "Input validation failed",
                error_code: "VALIDATION_FAILED",
                details_prefix: "Validation errors",
                suggestions: &[
                    "Check that all required fields are provided",
                    "Ensure field types match the expected format",
                    "Verify aggregation functions are valid (SUM, COUNT, AVG, etc.)",
                    "Make sure arrays are not empty where data is required",
                ],
            },
        ),
        (
            ErrorKind::EmptyData,
            ErrorTemplate {
                error_type: "empty_data_error",
                message: "Chart configuration error",
                error_code: "CONFIGURATION_ERROR",
                details_prefix: "Configuration validation failed",
                suggestions: &[
                    "Ensure at least one column is specified for table charts",
                    "Include at least one Y-axis metric for XY charts",
                    "Check that column names are not empty strings",
                    "Verify arrays contain valid data elements",
                ],
            },
        ),
        (
            ErrorKind::InvalidAggregate,
            ErrorTemplate {
                error_type: "invalid_aggregate_error",
                message: "Chart configuration error",
                error_code: "CONFIGURATION_ERROR",
                details_prefix: "Configuration validation failed",
                suggestions: &[
                    "Use only valid aggregation functions: SUM, COUNT, AVG, MIN, MAX, COUNT_DISTINCT",
                    "Check column data types match aggregation functions",
                    "Use COUNT for text columns, SUM/AVG for numeric columns",
                ],
            },
        ),
        (
            ErrorKind::Configuration,
            ErrorTemplate {
                error_type: "configuration_error",
                message: "Chart configuration error",
                error_code: "CONFIGURATION_ERROR",
                details_prefix: "Configuration validation failed",
                suggestions: CONFIGURATION_SUGGESTIONS,
            },
        ),
        (
            ErrorKind::Permission,
            ErrorTemplate {
                error_type: "permission_error",
                message: "Access denied",
                error_code: "ACCESS_DENIED",
                details_prefix: "Permission error",
                suggestions: &[
                    "Check that you have access to the dataset",
                    "Verify your user permissions",
                    "Contact your administrator for dataset access",
                    "Ensure the dataset ID is correct and accessible",
                ],
            },
        ),
        (
            ErrorKind::QueryExecution,
            ErrorTemplate {
                error_type: "query_execution_error",
                message: "Database query failed",
                error_code: "SQL_EXECUTION_FAILED",
                details_prefix: "SQL execution error",
                suggestions: &[
                    "Check that column names exist in the dataset",
                    "Verify filter values are valid for their column types",
                    "Ensure aggregation functions are compatible with column data types",
                    "Try a simpler query configuration first",
                ],
            },
        ),
        (
            ErrorKind::QueryTimeout,
            ErrorTemplate {
                error_type: "query_timeout_error",
                message: "Query execution timeout",
                error_code: "QUERY_TIMEOUT",
                details_prefix: "Query timed out",
                suggestions: &[
                    "Try reducing the data range or adding filters",
                    "Consider using a smaller sample of data",
                    "Use more selective filters to reduce data volume",
                ],
            },
        ),
        (ErrorKind::System, SYSTEM_TEMPLATE),
    ])
});
pub fn template(kind: ErrorKind) -> &'static ErrorTemplate {
    TEMPLATES.get(&kind).unwrap_or(&SYSTEM_TEMPLATE)
}
/// Routes a free-form failure message by keyword.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("access") {
        ErrorKind::Permission
    } else if lower.contains("sql") || lower.contains("query") {
        ErrorKind::QueryExecution
    } else if lower.contains("timeout") {
        ErrorKind::QueryTimeout
    } else {
        ErrorKind::System
    }
}
/// Routes a rejected-value message by keyword.
pub fn classify_value_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("empty") {
        ErrorKind::EmptyData
    } else if lower.contains("aggregate") || lower.contains("function") {
        ErrorKind::InvalidAggregate
    } else {
        ErrorKind::Configuration
    }
}
pub fn classify_error(error: &ChartMapError) -> ErrorKind {
    match error {
        ChartMapError::Validation(
            ValidationError::InvalidConfig { .. } | ValidationError::UnsupportedChartType { .. },
        ) => ErrorKind::Validation,
        ChartMapError::Validation(
            ValidationError::EmptyColumns
            | ValidationError::NoColumnsOrMetrics
            | ValidationError::EmptyMetrics
            | ValidationError::BlankColumnName { .. },
        ) => ErrorKind::EmptyData,
        ChartMapError::Lookup(LookupError::InvalidIdentifier { .. }) => ErrorKind::Configuration,
        ChartMapError::Lookup(LookupError::Backend(message) | LookupError::Command(message)) => {
            classify_message(message)
        }
        ChartMapError::Config(_) => ErrorKind::Configuration,
        ChartMapError::Lookup(LookupError::MissingAttribute { .. })
        | ChartMapError::Cache(_)
        | ChartMapError::Serialisation(_) => ErrorKind::System,
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartGenerationError {
    pub error_type: String,
    pub message: String,
    pub details: String,
    pub suggestions: Vec<String>,
    pub error_code: String,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceInfo {
    pub query_duration_ms: u64,
    pub cache_status: String,
    pub optimization_suggestions: Vec<String>,
}
/// Failure envelope. `chart` is always null and `success` always false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub chart: Option<Value>,
    pub error: ChartGenerationError,
    pub performance: PerformanceInfo,
    pub success: bool,
    pub schema_version: String,
    pub api_version: String,
}
impl ErrorResponse {
    pub fn new(kind: ErrorKind, detail: &str, suggestions: Vec<String>, started: Instant) -> Self {
        let template = template(kind);
        let suggestions = if suggestions.is_empty() {
            template.suggestions.iter().map(|s| s.to_string()).collect()
        } else {
            suggestions
        };
        Self {
            chart: None,
            error: ChartGenerationError {
                error_type: template.error_type.to_string(),
                message: template.message.to_string(),
                details: format!("{}: {detail}", template.details_prefix),
                suggestions,
                error_code: template.error_code.to_string(),
            },
            performance: PerformanceInfo {
                query_duration_ms: started.elapsed().as_millis() as u64,
                cache_status: "error".to_string(),
                optimization_suggestions: Vec::new(),
            },
            success: false,
            schema_version: SCHEMA_VERSION.to_string(),
            api_version: API_VERSION.to_string(),
        }
    }
    /// For failures reported by collaborators as plain text.
    pub fn from_message(message: &str, started: Instant) -> Self {
        Self::new(classify_message(message), message, Vec::new(), started)
    }
    /// Envelope for a collaborator that rejected a value it was handed.
    pub fn from_value_message(message: &str, started: Instant) -> Self {
        Self::new(classify_value_message(message), message, Vec::new(), started)
    }
    pub fn kind_code(&self) -> &str {
        &self.error.error_code
    }
}
pub fn create_error_response(
    error: &ChartMapError,
    started: Instant,
    raw_input: Option<&Value>,
) -> ErrorResponse {
    let kind = classify_error(error);
    warn!(kind = ?kind, error = %error, "Chart generation failed");
    match (kind, raw_input) {
        (ErrorKind::Validation, Some(raw)) => {
            let diagnosis = diagnose_raw_config(raw);
            ErrorResponse::new(kind, &diagnosis.issues.join("; "), diagnosis.unique_suggestions(), started)
        }
        (_, _) if matches!(error, ChartMapError::Validation(_)) => {
            ErrorResponse::new(kind, &error.to_string(), error.suggestions(), started)
        }
        _ => ErrorResponse::new(kind, &error.to_string(), Vec::new(), started),
    }
}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawConfigDiagnosis {
    pub intended_chart_type: Option<String>,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}
impl RawConfigDiagnosis {
    /// Records an issue with its paired suggestion; an identical pair is kept once.
    fn push(&mut self, issue: impl Into<String>, suggestion: impl Into<String>) {
        let (issue, suggestion) = (issue.into(), suggestion.into());
        let seen = self
            .issues
            .iter()
            .zip(&self.suggestions)
            .any(|(i, s)| *i == issue && *s == suggestion);
        if !seen {
            self.issues.push(issue);
            self.suggestions.push(suggestion);
        }
    }
    /// Suggestions in first-seen order without repeats.
    pub fn unique_suggestions(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.suggestions
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }
}
/// Guesses the chart type a caller meant from an explicit tag or the fields present.
pub fn detect_intended_chart_type(raw: &Value) -> Option<&'static str> {
    let object = raw.as_object()?;
    if let Some(tag) = object.get("chart_type").and_then(Value::as_str) {
        if let Some(known) = SUPPORTED_CHART_TYPES.iter().find(|t| **t == tag) {
            return Some(*known);
        }
    }
    let has = |key: &str| object.contains_key(key);
    match (has("x"), has("y"), has("columns")) {
        (true, true, _) => Some("xy"),
        (_, _, true) => Some("table"),
        (true, false, _) | (false, true, _) => Some("xy"),
        _ => None,
    }
}
fn is_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(Vec::is_empty)
}
fn check_xy_fields(raw: &Value, diagnosis: &mut RawConfigDiagnosis) {
    match raw.get("x") {
        None => diagnosis.push(
            "Missing required field 'x' for XY chart configuration",
            r#"Add X-axis configuration: "x": {"name": "your_column"}"#,
        ),
        Some(Value::Null) => diagnosis.push(
            "Field 'x' cannot be null for XY charts",
            "Provide a valid column reference for X-axis instead of null",
        ),
        Some(_) => {}
    }
    match raw.get("y") {
        None => diagnosis.push(
            "Missing required field 'y' for XY chart configuration",
            r#"Add Y-axis metrics: "y": [{"name": "metric_column", "aggregate": "SUM"}]"#,
        ),
        Some(Value::Null) => diagnosis.push(
            "Field 'y' cannot be null for XY charts",
            "Provide an array of metrics for Y-axis instead of null",
        ),
        Some(y) if is_empty_array(y) => diagnosis.push(
            "Y-axis array is empty",
            "Add at least one metric to the Y-axis array",
        ),
        Some(_) => {}
    }
}
fn check_table_fields(raw: &Value, diagnosis: &mut RawConfigDiagnosis) {
    match raw.get("columns") {
        None => diagnosis.push(
            "Missing required field 'columns' for table chart configuration",
            r#"Add columns array: "columns": [{"name": "column1"}, {"name": "column2"}]"#,
        ),
        Some(Value::Null) => diagnosis.push(
            "Field 'columns' cannot be null for table charts",
            "Provide an array of columns instead of null",
        ),
        Some(columns) if is_empty_array(columns) => diagnosis.push(
            "Columns array is empty",
            "Add at least one column to display in the table",
        ),
        Some(_) => {}
    }
}
fn check_filter_operators(raw: &Value, diagnosis: &mut RawConfigDiagnosis) {
    let Some(filters) = raw.get("filters").and_then(Value::as_array) else {
        return;
    };
    for (idx, filter) in filters.iter().enumerate() {
        let Some(op) = filter.get("op") else {
            continue;
        };
        let known = op.as_str().is_some_and(|op| FILTER_OPERATORS.contains(&op));
        if !known {
            let shown = op.as_str().map(str::to_string).unwrap_or_else(|| op.to_string());
            diagnosis.push(
                format!("Invalid filter operator '{shown}' at position {idx}"),
                "Use valid operators: =, >, <, >=, <=, !=",
            );
        }
    }
}
/// Explains why a raw chart configuration cannot be used.
pub fn diagnose_raw_config(raw: &Value) -> RawConfigDiagnosis {
    let mut diagnosis = RawConfigDiagnosis {
        intended_chart_type: detect_intended_chart_type(raw).map(str::to_string),
        ..Default::default()
    };
    if !raw.is_object() {
        diagnosis.push(
            "Chart configuration must be a JSON object",
            r#"Example: {"chart_type": "xy", "x": {"name": "date"}, "y": [{"name": "sales", "aggregate": "SUM"}]}"#,
        );
        return diagnosis;
    }
    match raw.get("chart_type") {
        None => diagnosis.push(
            "Missing required field 'chart_type'. Specify either 'xy' or 'table' to indicate the chart type.",
            r#"Add "chart_type": "xy" or "chart_type": "table" to your configuration"#,
        ),
        Some(tag) if !tag.as_str().is_some_and(|t| SUPPORTED_CHART_TYPES.contains(&t)) => {
            let shown = tag.as_str().map(str::to_string).unwrap_or_else(|| tag.to_string());
            diagnosis.push(
                format!("Invalid chart_type '{shown}'. Valid types are: 'xy', 'table'"),
                "Set chart_type to 'xy' for line, bar, area, or scatter charts, or 'table' for data tables",
            );
        }
        Some(_) => {}
    }
    match diagnosis.intended_chart_type.as_deref() {
        Some("xy") => check_xy_fields(raw, &mut diagnosis),
        Some("table") => check_table_fields(raw, &mut diagnosis),
        _ => {}
    }
    check_filter_operators(raw, &mut diagnosis);
    if diagnosis.issues.is_empty() {
        diagnosis.issues.push(
            "Chart configuration validation failed. The provided configuration doesn't match expected format."
                .to_string(),
        );
        diagnosis.suggestions.extend(
            [
                "Ensure chart_type is set to 'xy' or 'table'",
                "For XY charts: provide 'x' and 'y' fields",
                "For table charts: provide 'columns' array",
                "Check that all field names and values are correct",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
    }
    diagnosis
}
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_has_a_template() {
        for kind in ErrorKind::ALL {
            assert!(TEMPLATES.contains_key(&kind), "{kind:?}");
        }
        assert_eq!(template(ErrorKind::Permission).error_code, "ACCESS_DENIED");
    }

    #[test]
    fn message_routing_prefers_permission() {
        assert_eq!(classify_message("Permission denied on table"), ErrorKind::Permission);
        assert_eq!(classify_message("SQL syntax error near FROM"), ErrorKind::QueryExecution);
        assert_eq!(classify_message("statement timeout"), ErrorKind::QueryTimeout);
        assert_eq!(classify_message("query access blocked"), ErrorKind::Permission);
        assert_eq!(classify_message("boom"), ErrorKind::System);
    }

    #[test]
    fn value_messages_route_by_keyword() {
        assert_eq!(classify_value_message("Column list is empty"), ErrorKind::EmptyData);
        assert_eq!(classify_value_message("Unknown aggregate FOO"), ErrorKind::InvalidAggregate);
        assert_eq!(classify_value_message("bad"), ErrorKind::Configuration);
    }

    #[test]
    fn response_envelope_shape() {
        let err = ChartMapError::from(ValidationError::EmptyMetrics);
        let response = create_error_response(&err, Instant::now(), None);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["chart"], Value::Null);
        assert_eq!(value["success"], false);
        assert_eq!(value["schema_version"], "2.0");
        assert_eq!(value["api_version"], "v1");
        assert_eq!(value["performance"]["cache_status"], "error");
        assert_eq!(value["error"]["error_type"], "empty_data_error");
        assert_eq!(value["error"]["error_code"], "CONFIGURATION_ERROR");
    }

    #[test]
    fn intended_type_from_fields() {
        assert_eq!(detect_intended_chart_type(&json!({"x": {}, "y": []})), Some("xy"));
        assert_eq!(detect_intended_chart_type(&json!({"columns": []})), Some("table"));
        assert_eq!(detect_intended_chart_type(&json!({"y": []})), Some("xy"));
        assert_eq!(detect_intended_chart_type(&json!({"chart_type": "table", "x": {}})), Some("table"));
        assert_eq!(detect_intended_chart_type(&json!({"kind": "bar"})), None);
    }

    #[test]
    fn diagnoses_null_and_empty_fields() {
        let diagnosis = diagnose_raw_config(&json!({"chart_type": "table", "columns": null}));
        assert_eq!(diagnosis.issues, vec!["Field 'columns' cannot be null for table charts"]);
        let diagnosis = diagnose_raw_config(&json!({"chart_type": "xy", "x": {"name": "d"}, "y": []}));
        assert_eq!(diagnosis.issues, vec!["Y-axis array is empty"]);
    }

    #[test]
    fn reports_unknown_filter_operators() {
        let diagnosis = diagnose_raw_config(&json!({
            "chart_type": "table",
            "columns": [{"name": "a"}],
            "filters": [{"column": "a", "op": "=", "value": 1}, {"column": "a", "op": "LIKE", "value": "x"}]
        }));
        assert_eq!(diagnosis.issues, vec!["Invalid filter operator 'LIKE' at position 1"]);
    }

    #[test]
    fn invalid_identifiers_are_configuration_errors() {
        for value in ["empty_sales", "aggregates", "function_x"] {
            let err = ChartMapError::from(LookupError::InvalidIdentifier {
                value: value.to_string(),
            });
            assert_eq!(classify_error(&err), ErrorKind::Configuration, "{value}");
        }
    }

    #[test]
    fn repeated_suggestions_stay_paired() {
        let raw = json!({
            "chart_type": "table",
            "columns": [{"name": "a"}],
            "filters": [{"column": "a", "op": "~"}, {"column": "a", "op": "LIKE"}, {"column": "b", "op": "="}]
        });
        let diagnosis = diagnose_raw_config(&raw);
        assert_eq!(diagnosis.issues.len(), 2);
        assert_eq!(diagnosis.suggestions.len(), diagnosis.issues.len());
        assert_eq!(diagnosis.unique_suggestions(), vec!["Use valid operators: =, >, <, >=, <=, !="]);
        let mut twice = RawConfigDiagnosis::default();
        twice.push("same", "fix");
        twice.push("same", "fix");
        assert_eq!(twice.issues.len(), 1);
        assert_eq!(twice.suggestions.len(), 1);
    }

    #[test]
    fn invalid_chart_type_is_named() {
        let diagnosis = diagnose_raw_config(&json!({"chart_type": "pie", "columns": [{"name": "a"}]}));
        assert_eq!(diagnosis.intended_chart_type.as_deref(), Some("table"));
        assert!(diagnosis.issues[0].contains("Invalid chart_type 'pie'"));
    }
}
