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

//! Non-blocking static checks over a built chart configuration.
//!
//! Advisors never fail a mapping. A warning is advisory text for the caller,
//! and an internal advisor error is logged and reported as "no issue".

use crate::config::AdvisorConfig;
use crate::error::{AdviceResult, AdvisorError, ErrorSeverity};
use crate::schema::{Aggregate, AxisScale, ChartConfig, ChartKind, ColumnRef, XyChartConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
static DECIMAL_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[1-9]\d*f").unwrap());
static TEMPORAL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(date|time|day|week|month|quarter|year|_at$|_on$|^ds$)").unwrap()
});
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryWarning {
    pub advisor: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(serialize_with = "serialize_severity")]
    pub severity: ErrorSeverity,
}
fn serialize_severity<S: serde::Serializer>(
    severity: &ErrorSeverity,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(severity.as_str())
}
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub is_valid: bool,
    pub warning: Option<AdvisoryWarning>,
}
impl Advice {
    pub fn clear() -> Self {
        Self {
            is_valid: true,
            warning: None,
        }
    }
    pub fn flag(warning: AdvisoryWarning) -> Self {
        Self {
            is_valid: false,
            warning: Some(warning),
        }
    }
}
pub trait Advisor: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, config: &ChartConfig) -> AdviceResult<Advice>;
}
/// Runs one advisor, treating internal failure as "no issue found".
pub fn advise(advisor: &dyn Advisor, config: &ChartConfig) -> Advice {
    match advisor.check(config) {
        Ok(advice) => advice,
        Err(e) => {
            warn!(advisor = advisor.name(), error = %e, "Advisor failed, skipping");
            Advice::clear()
        }
    }
}
/// Runs every advisor and collects their warnings.
///
/// `x_is_temporal` is the classifier's verdict for an XY chart's x-axis when
/// the caller has one. Without it the advisors fall back to a name heuristic.
pub fn analyze_chart(
    config: &ChartConfig,
    settings: &AdvisorConfig,
    x_is_temporal: Option<bool>,
) -> Vec<AdvisoryWarning> {
    let advisors: [Box<dyn Advisor>; 4] = [
        Box::new(FormatAdvisor),
        Box::new(CardinalityAdvisor::new(&settings.high_cardinality_patterns)),
        Box::new(ChartTypeAdvisor::new(x_is_temporal)),
        Box::new(RuntimeAdvisor::new(settings.clone(), x_is_temporal)),
    ];
    let warnings: Vec<AdvisoryWarning> = advisors
        .iter()
        .filter_map(|advisor| advise(advisor.as_ref(), config).warning)
        .collect();
    debug!(chart_type = config.chart_type(), warnings = warnings.len(), "Chart analysis complete");
    warnings
}
/// Name-based guess used when no dataset metadata is available.
pub fn looks_temporal(column_name: &str) -> bool {
    TEMPORAL_NAME.is_match(column_name)
}
fn x_temporal(xy: &XyChartConfig, hint: Option<bool>) -> bool {
    hint.unwrap_or_else(|| looks_temporal(&xy.x.name))
}
/// Flags number formats that contradict the metric's aggregate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatAdvisor;
impl FormatAdvisor {
    fn format_issues(format: &str, metrics: &[ColumnRef]) -> Vec<String> {
        let mut issues = Vec::new();
        for metric in metrics {
            let aggregate = metric.effective_aggregate();
            if format.contains('$') && aggregate.is_count() {
                issues.push(format!(
                    "Currency format '{format}' applied to {aggregate}({}), which is a count",
                    metric.name
                ));
            }
            if format.contains('%') && matches!(aggregate, Aggregate::Sum | Aggregate::Count) {
                issues.push(format!(
                    "Percentage format '{format}' applied to {aggregate}({}), which is not a ratio",
                    metric.name
                ));
            }
            if DECIMAL_FORMAT.is_match(format) && aggregate.is_count() {
                issues.push(format!(
                    "Decimal format '{format}' applied to {aggregate}({}), which is always whole",
                    metric.name
                ));
            }
        }
        issues
    }
}
impl Advisor for FormatAdvisor {
    fn name(&self) -> &'static str {
        "format"
    }
    fn check(&self, config: &ChartConfig) -> AdviceResult<Advice> {
        let ChartConfig::Xy(xy) = config else {
            return Ok(Advice::clear());
        };
        let Some(format) = xy.y_axis.as_ref().and_then(|axis| axis.format.as_deref()) else {
            return Ok(Advice::clear());
        };
        let issues = Self::format_issues(format, &xy.y);
        if issues.is_empty() {
            return Ok(Advice::clear());
        }
        Ok(Advice::flag(AdvisoryWarning {
            advisor: self.name(),
            message: issues[0].clone(),
            details: issues,
            suggestions: vec![
                "Use ',d' for counts".to_string(),
                "Use '$,.2f' only for monetary sums or averages".to_string(),
                "Use '.1%' only for ratio metrics".to_string(),
            ],
            severity: ErrorSeverity::Warning,
        }))
    }
}
/// Flags x-axis and group-by columns whose names suggest near-unique values.
#[derive(Debug, Clone)]
pub struct CardinalityAdvisor {
    patterns: Vec<(String, Regex)>,
}
impl CardinalityAdvisor {
    /// Compiles each pattern once. A pattern that fails to compile is
    /// logged and left out.
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter_map(|pattern| match Self::compile(&pattern) {
                Ok(regex) => Some((pattern, regex)),
                Err(e) => {
                    warn!(error = %e, "Skipping cardinality pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }
    /// Short patterns such as `id` only match whole `_`-separated tokens so
    /// that `paid` or `zip` stay quiet.
    fn compile(pattern: &str) -> AdviceResult<Regex> {
        let escaped = regex::escape(pattern);
        let source = if pattern.chars().count() <= 2 {
            format!("(?i)(^|_){escaped}($|_)")
        } else {
            format!("(?i){escaped}")
        };
        Regex::new(&source).map_err(|e| AdvisorError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
    }
    pub fn matching_pattern(&self, column_name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(column_name))
            .map(|(pattern, _)| pattern.as_str())
    }
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
    fn suggestions_for(kind: ChartKind) -> Vec<String> {
        let specific = match kind {
            ChartKind::Line | ChartKind::Area | ChartKind::Other => {
                "Aggregate by a time grain or a coarser category to reduce the number of points"
            }
            ChartKind::Bar => "Limit the chart to the top categories with a filter or row limit",
            ChartKind::Scatter => "Sample the data or filter it before plotting individual points",
        };
        vec![
            specific.to_string(),
            "Group by a lower-cardinality dimension such as region or category".to_string(),
        ]
    }
}
impl Advisor for CardinalityAdvisor {
    fn name(&self) -> &'static str {
        "cardinality"
    }
    fn check(&self, config: &ChartConfig) -> AdviceResult<Advice> {
        let ChartConfig::Xy(xy) = config else {
            return Ok(Advice::clear());
        };
        let mut details = Vec::new();
        if let Some(pattern) = self.matching_pattern(&xy.x.name) {
            details.push(format!(
                "X-axis column '{}' looks high-cardinality (matches '{pattern}')",
                xy.x.name
            ));
        }
        if let Some(group_by) = xy.group_by.as_ref() {
            if let Some(pattern) = self.matching_pattern(&group_by.name) {
                details.push(format!(
                    "Group-by column '{}' looks high-cardinality (matches '{pattern}')",
                    group_by.name
                ));
            }
        }
        if details.is_empty() {
            return Ok(Advice::clear());
        }
        Ok(Advice::flag(AdvisoryWarning {
            advisor: self.name(),
            message: details[0].clone(),
            details,
            suggestions: Self::suggestions_for(xy.kind),
            severity: ErrorSeverity::Warning,
        }))
    }
}
/// Flags chart kinds whose visual grammar does not fit the axes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChartTypeAdvisor {
    x_is_temporal: Option<bool>,
}
impl ChartTypeAdvisor {
    pub fn new(x_is_temporal: Option<bool>) -> Self {
        Self { x_is_temporal }
    }
}
impl Advisor for ChartTypeAdvisor {
    fn name(&self) -> &'static str {
        "chart_type"
    }
    fn check(&self, config: &ChartConfig) -> AdviceResult<Advice> {
        let ChartConfig::Xy(xy) = config else {
            return Ok(Advice::clear());
        };
        let temporal = x_temporal(xy, self.x_is_temporal);
        let (message, suggestion) = match xy.kind {
            ChartKind::Line | ChartKind::Other if !temporal => (
                format!("Line chart on categorical x-axis '{}' implies a trend between unrelated categories", xy.x.name),
                "Use a bar chart for categorical comparisons",
            ),
            ChartKind::Area if !temporal => (
                format!("Area chart on non-temporal x-axis '{}'", xy.x.name),
                "Use a stacked bar chart for part-to-whole comparisons across categories",
            ),
            ChartKind::Scatter if xy.y.len() > 1 => (
                format!("Scatter chart with {} Y metrics is hard to read", xy.y.len()),
                "Plot one metric against the x-axis, or use a line chart for several series",
            ),
            ChartKind::Bar
                if xy.y_axis.as_ref().and_then(|axis| axis.scale) == Some(AxisScale::Log) =>
            (
                "Bar chart with a logarithmic Y axis distorts bar lengths".to_string(),
                "Use a linear scale, or switch to a line or scatter chart for log scales",
            ),
            _ => return Ok(Advice::clear()),
        };
        Ok(Advice::flag(AdvisoryWarning {
            advisor: self.name(),
            message,
            details: Vec::new(),
            suggestions: vec![suggestion.to_string()],
            severity: ErrorSeverity::Info,
        }))
    }
}
/// Flags configurations likely to produce slow or oversized queries.
#[derive(Debug, Clone)]
pub struct RuntimeAdvisor {
    settings: AdvisorConfig,
    x_is_temporal: Option<bool>,
}
impl RuntimeAdvisor {
    pub fn new(settings: AdvisorConfig, x_is_temporal: Option<bool>) -> Self {
        Self {
            settings,
            x_is_temporal,
        }
    }
    fn expensive<'a>(&self, metrics: &'a [ColumnRef]) -> Vec<&'a ColumnRef> {
        metrics
            .iter()
            .filter(|m| self.settings.expensive_aggregates.contains(&m.effective_aggregate()))
            .collect()
    }
    fn table_issues(&self, config: &ChartConfig) -> Vec<String> {
        let ChartConfig::Table(table) = config else {
            return Vec::new();
        };
        let mut issues = Vec::new();
        let (metrics, raw): (Vec<ColumnRef>, Vec<ColumnRef>) =
            table.columns.iter().cloned().partition(ColumnRef::is_aggregated);
        let has_filters = table.filters.as_ref().is_some_and(|f| f.iter().any(Option::is_some));
        if metrics.is_empty() && !has_filters {
            issues.push("Raw table without filters scans the whole dataset up to the row limit".to_string());
        }
        if table.columns.len() > self.settings.max_table_columns {
            issues.push(format!(
                "Table selects {} columns (limit {})",
                table.columns.len(),
                self.settings.max_table_columns
            ));
        }
        if !raw.is_empty() {
            for metric in self.expensive(&metrics) {
                issues.push(format!(
                    "{}({}) grouped by {} column(s) is expensive to compute",
                    metric.effective_aggregate(),
                    metric.name,
                    raw.len()
                ));
            }
        }
        issues
    }
    fn xy_issues(&self, config: &ChartConfig) -> Vec<String> {
        let ChartConfig::Xy(xy) = config else {
            return Vec::new();
        };
        let mut issues = Vec::new();
        if xy.y.len() > self.settings.max_metrics {
            issues.push(format!(
                "Chart computes {} metrics (limit {})",
                xy.y.len(),
                self.settings.max_metrics
            ));
        }
        if xy.group_by.is_some() {
            for metric in self.expensive(&xy.y) {
                issues.push(format!(
                    "{}({}) with a group-by is expensive to compute",
                    metric.effective_aggregate(),
                    metric.name
                ));
            }
        }
        let series_kind = matches!(xy.kind, ChartKind::Line | ChartKind::Area | ChartKind::Other);
        if series_kind && xy.time_grain.is_none() && x_temporal(xy, self.x_is_temporal) {
            issues.push(format!(
                "Temporal x-axis '{}' has no time grain, every distinct timestamp becomes a point",
                xy.x.name
            ));
        }
        issues
    }
}
impl Advisor for RuntimeAdvisor {
    fn name(&self) -> &'static str {
        "runtime"
    }
    fn check(&self, config: &ChartConfig) -> AdviceResult<Advice> {
        let mut issues = self.table_issues(config);
        issues.extend(self.xy_issues(config));
        if issues.is_empty() {
            return Ok(Advice::clear());
        }
        let message = if issues.len() == 1 {
            issues[0].clone()
        } else {
            format!("{} potential performance issues", issues.len())
        };
        Ok(Advice::flag(AdvisoryWarning {
            advisor: self.name(),
            message,
            details: issues,
            suggestions: vec![
                "Add filters to narrow the data scanned".to_string(),
                "Set a time grain such as P1D or P1W on temporal axes".to_string(),
                "Reduce the number of metrics and columns".to_string(),
            ],
            severity: ErrorSeverity::Warning,
        }))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AxisConfig, FilterConfig, TableChartConfig};

    fn xy(x: &str, y: Vec<ColumnRef>, kind: ChartKind) -> ChartConfig {
        XyChartConfig::new(ColumnRef::new(x), y, kind).into()
    }

    struct Exploding;
    impl Advisor for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }
        fn check(&self, _config: &ChartConfig) -> AdviceResult<Advice> {
            Err(AdvisorError::Unsupported {
                advisor: "exploding",
                chart_type: "xy",
            })
        }
    }

    #[test]
    fn advisor_failure_is_no_warning() {
        let advice = advise(&Exploding, &xy("date", vec![ColumnRef::new("v")], ChartKind::Line));
        assert_eq!(advice, Advice::clear());
    }

    #[test]
    fn currency_on_count_is_flagged() {
        let mut config = XyChartConfig::new(
            ColumnRef::new("region"),
            vec![ColumnRef::new("orders").with_aggregate("COUNT")],
            ChartKind::Bar,
        );
        config.y_axis = Some(AxisConfig {
            format: Some("$,.2f".to_string()),
            ..AxisConfig::default()
        });
        let advice = FormatAdvisor.check(&config.into()).unwrap();
        assert!(!advice.is_valid);
        let warning = advice.warning.unwrap();
        assert_eq!(warning.details.len(), 2);
        assert!(warning.message.starts_with("Currency format"));
    }

    #[test]
    fn percent_on_average_is_fine() {
        let mut config = XyChartConfig::new(
            ColumnRef::new("region"),
            vec![ColumnRef::new("conversion").with_aggregate("AVG")],
            ChartKind::Bar,
        );
        config.y_axis = Some(AxisConfig {
            format: Some(".1%".to_string()),
            ..AxisConfig::default()
        });
        assert!(FormatAdvisor.check(&config.into()).unwrap().is_valid);
    }

    #[test]
    fn short_patterns_match_whole_tokens() {
        let advisor = CardinalityAdvisor::new(&["id".to_string(), "email".to_string()]);
        assert_eq!(advisor.pattern_count(), 2);
        assert_eq!(advisor.matching_pattern("user_id"), Some("id"));
        assert_eq!(advisor.matching_pattern("ID"), Some("id"));
        assert_eq!(advisor.matching_pattern("paid_amount"), None);
        assert_eq!(advisor.matching_pattern("contact_email_addr"), Some("email"));
    }

    #[test]
    fn patterns_are_normalised_at_construction() {
        let advisor = CardinalityAdvisor::new(&[" UUID ".to_string(), "a.b".to_string()]);
        assert_eq!(advisor.pattern_count(), 2);
        assert_eq!(advisor.matching_pattern("order_uuid"), Some("uuid"));
        assert_eq!(advisor.matching_pattern("axb"), None);
        assert_eq!(advisor.matching_pattern("a.b_key"), Some("a.b"));
    }

    #[test]
    fn high_cardinality_group_by_is_flagged() {
        let mut config = XyChartConfig::new(
            ColumnRef::new("date"),
            vec![ColumnRef::new("revenue")],
            ChartKind::Scatter,
        );
        config.group_by = Some(ColumnRef::new("customer_email"));
        let advisor = CardinalityAdvisor::new(&AdvisorConfig::default().high_cardinality_patterns);
        let warning = advisor.check(&config.into()).unwrap().warning.unwrap();
        assert!(warning.message.contains("customer_email"));
        assert!(warning.suggestions[0].contains("Sample"));
    }

    #[test]
    fn chart_type_rules() {
        let line = xy("region", vec![ColumnRef::new("v")], ChartKind::Line);
        assert!(!ChartTypeAdvisor::new(Some(false)).check(&line).unwrap().is_valid);
        assert!(ChartTypeAdvisor::new(Some(true)).check(&line).unwrap().is_valid);
        let scatter = xy("date", vec![ColumnRef::new("a"), ColumnRef::new("b")], ChartKind::Scatter);
        assert!(!ChartTypeAdvisor::default().check(&scatter).unwrap().is_valid);
        let area = xy("product", vec![ColumnRef::new("a")], ChartKind::Area);
        assert!(!ChartTypeAdvisor::default().check(&area).unwrap().is_valid);
    }

    #[test]
    fn runtime_flags_unfiltered_raw_table() {
        let settings = AdvisorConfig::default();
        let mut table = TableChartConfig::new(vec![ColumnRef::new("product")]);
        let advisor = RuntimeAdvisor::new(settings, None);
        assert!(!advisor.check(&table.clone().into()).unwrap().is_valid);
        table.filters = Some(vec![Some(FilterConfig::new("region", "=", "EU"))]);
        assert!(advisor.check(&table.into()).unwrap().is_valid);
    }

    #[test]
    fn runtime_combines_issues() {
        let settings = AdvisorConfig {
            max_metrics: 1,
            ..AdvisorConfig::default()
        };
        let mut config = XyChartConfig::new(
            ColumnRef::new("order_date"),
            vec![
                ColumnRef::new("customer").with_aggregate("COUNT_DISTINCT"),
                ColumnRef::new("revenue"),
            ],
            ChartKind::Line,
        );
        config.group_by = Some(ColumnRef::new("region"));
        let warning = RuntimeAdvisor::new(settings, Some(true))
            .check(&config.into())
            .unwrap()
            .warning
            .unwrap();
        assert_eq!(warning.details.len(), 3);
        assert_eq!(warning.message, "3 potential performance issues");
    }

    #[test]
    fn analyze_chart_collects_all_advisors() {
        let config = xy("user_id", vec![ColumnRef::new("a"), ColumnRef::new("b")], ChartKind::Scatter);
        let warnings = analyze_chart(&config, &AdvisorConfig::default(), Some(false));
        let advisors: Vec<&str> = warnings.iter().map(|w| w.advisor).collect();
        assert_eq!(advisors, vec!["cardinality", "chart_type"]);
    }
}
