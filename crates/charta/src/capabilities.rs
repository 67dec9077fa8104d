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

use crate::advisor::looks_temporal;
use crate::schema::{ChartConfig, ChartKind, ColumnRef, TableChartConfig, XyChartConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartCapabilities {
    pub supports_interaction: bool,
    pub supports_real_time: bool,
    pub supports_drill_down: bool,
    pub supports_export: bool,
    pub optimal_formats: Vec<String>,
    pub data_types: Vec<String>,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSemantics {
    pub primary_insight: String,
    pub data_story: String,
    pub recommended_actions: Vec<String>,
    pub anomalies: Vec<String>,
    pub statistical_summary: Map<String, Value>,
}
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
fn metric_labels(columns: &[ColumnRef]) -> String {
    columns
        .iter()
        .map(|c| match c.custom_label() {
            Some(label) => label.to_string(),
            None => format!("{}({})", c.effective_aggregate(), c.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
/// `x_is_temporal` is the classifier's verdict when known; otherwise the
/// x-axis name decides.
pub fn analyze_chart_capabilities(config: &ChartConfig, x_is_temporal: Option<bool>) -> ChartCapabilities {
    match config {
        ChartConfig::Table(_) => ChartCapabilities {
            supports_interaction: true,
            supports_real_time: false,
            supports_drill_down: false,
            supports_export: true,
            optimal_formats: strings(&["url", "table", "ascii"]),
            data_types: strings(&["tabular"]),
        },
        ChartConfig::Xy(xy) => {
            let temporal = x_is_temporal.unwrap_or_else(|| looks_temporal(&xy.x.name));
            let mut data_types = vec![if temporal { "time_series" } else { "categorical" }];
            if xy.group_by.is_some() && !data_types.contains(&"categorical") {
                data_types.push("categorical");
            }
            data_types.push("metric");
            ChartCapabilities {
                supports_interaction: true,
                supports_real_time: temporal
                    && matches!(xy.kind, ChartKind::Line | ChartKind::Area | ChartKind::Other),
                supports_drill_down: xy.group_by.is_some(),
                supports_export: true,
                optimal_formats: strings(&["url", "interactive", "vega_lite"]),
                data_types: strings(&data_types),
            }
        }
    }
}
fn table_semantics(table: &TableChartConfig) -> (String, String, Vec<String>) {
    let (metrics, raw): (Vec<ColumnRef>, Vec<ColumnRef>) =
        table.columns.iter().cloned().partition(ColumnRef::is_aggregated);
    let raw_names = raw.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ");
    let (insight, story) = match (raw.is_empty(), metrics.is_empty()) {
        (false, true) => (
            format!("Lists individual records with {raw_names}"),
            format!("This table shows raw rows for {} column(s).", raw.len()),
        ),
        (true, false) => (
            format!("Summarises {} across the whole dataset", metric_labels(&metrics)),
            "This table shows dataset-wide totals in a single row.".to_string(),
        ),
        _ => (
            format!("Summarises {} for each {raw_names}", metric_labels(&metrics)),
            format!("This table groups rows by {raw_names} and aggregates {} metric(s).", metrics.len()),
        ),
    };
    let actions = strings(&[
        "Sort by a metric column to find the largest values",
        "Add filters to focus on a subset of rows",
    ]);
    (insight, story, actions)
}
fn xy_semantics(xy: &XyChartConfig) -> (String, String, Vec<String>) {
    let metrics = metric_labels(&xy.y);
    let x = &xy.x.name;
    let insight = match xy.kind {
        ChartKind::Line | ChartKind::Other => format!("Shows how {metrics} changes over {x}"),
        ChartKind::Bar => format!("Compares {metrics} across {x}"),
        ChartKind::Area => format!("Shows the volume of {metrics} over {x}"),
        ChartKind::Scatter => format!("Shows the relationship between {x} and {metrics}"),
    };
    let mut story = format!("This {} chart plots {metrics} against {x}", xy.kind.as_str());
    if let Some(group_by) = xy.group_by.as_ref().filter(|g| g.name != xy.x.name) {
        story.push_str(&format!(", split by {}", group_by.name));
    }
    story.push('.');
    let mut actions = match xy.kind {
        ChartKind::Line | ChartKind::Area | ChartKind::Other => strings(&[
            "Look for peaks, dips and seasonal patterns",
            "Compare recent values against the long-run trend",
        ]),
        ChartKind::Bar => strings(&[
            "Identify the highest and lowest categories",
            "Sort bars by value to make ranking clearer",
        ]),
        ChartKind::Scatter => strings(&[
            "Look for clusters and outliers",
            "Check whether the relationship looks linear",
        ]),
    };
    if xy.group_by.is_some() {
        actions.push("Drill into individual series to compare groups".to_string());
    }
    (insight, story, actions)
}
/// Describes what a chart is meant to show. Anomalies and statistics need
/// query results and are left empty.
pub fn analyze_chart_semantics(config: &ChartConfig) -> ChartSemantics {
    let (primary_insight, data_story, recommended_actions) = match config {
        ChartConfig::Table(table) => table_semantics(table),
        ChartConfig::Xy(xy) => xy_semantics(xy),
    };
    ChartSemantics {
        primary_insight,
        data_story,
        recommended_actions,
        anomalies: Vec::new(),
        statistical_summary: Map::new(),
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drill_down_requires_group_by() {
        let mut xy = XyChartConfig::new(ColumnRef::new("date"), vec![ColumnRef::new("v")], ChartKind::Line);
        let caps = analyze_chart_capabilities(&xy.clone().into(), None);
        assert!(!caps.supports_drill_down);
        assert!(caps.supports_real_time);
        assert_eq!(caps.data_types, vec!["time_series", "metric"]);
        xy.group_by = Some(ColumnRef::new("region"));
        let caps = analyze_chart_capabilities(&xy.into(), Some(true));
        assert!(caps.supports_drill_down);
        assert_eq!(caps.data_types, vec!["time_series", "categorical", "metric"]);
    }

    #[test]
    fn table_is_tabular() {
        let table: ChartConfig = TableChartConfig::new(vec![ColumnRef::new("product")]).into();
        let caps = analyze_chart_capabilities(&table, None);
        assert_eq!(caps.data_types, vec!["tabular"]);
        assert!(!caps.supports_real_time);
    }

    #[test]
    fn semantics_describe_the_chart() {
        let mut xy = XyChartConfig::new(
            ColumnRef::new("region"),
            vec![ColumnRef::new("revenue").with_aggregate("avg")],
            ChartKind::Bar,
        );
        xy.group_by = Some(ColumnRef::new("channel"));
        let semantics = analyze_chart_semantics(&xy.into());
        assert_eq!(semantics.primary_insight, "Compares AVG(revenue) across region");
        assert_eq!(semantics.data_story, "This bar chart plots AVG(revenue) against region, split by channel.");
        assert!(semantics.anomalies.is_empty());
        assert!(semantics.statistical_summary.is_empty());
    }

    #[test]
    fn mixed_table_semantics_mention_grouping() {
        let table: ChartConfig = TableChartConfig::new(vec![
            ColumnRef::new("product"),
            ColumnRef::new("revenue").with_aggregate("SUM"),
        ])
        .into();
        let semantics = analyze_chart_semantics(&table);
        assert_eq!(semantics.primary_insight, "Summarises SUM(revenue) for each product");
    }
}
