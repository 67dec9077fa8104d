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

//! Declarative chart configuration accepted by the mappers.

use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregate {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    CountDistinct,
    Stddev,
    Var,
    Median,
    Percentile,
}
impl Aggregate {
    pub const ALL: [Aggregate; 10] = [
        Aggregate::Sum,
        Aggregate::Count,
        Aggregate::Avg,
        Aggregate::Min,
        Aggregate::Max,
        Aggregate::CountDistinct,
        Aggregate::Stddev,
        Aggregate::Var,
        Aggregate::Median,
        Aggregate::Percentile,
    ];
    /// Case-insensitive lookup against the allow-list.
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.to_uppercase();
        Self::ALL.into_iter().find(|agg| agg.as_str() == upper)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Count => "COUNT",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::CountDistinct => "COUNT_DISTINCT",
            Aggregate::Stddev => "STDDEV",
            Aggregate::Var => "VAR",
            Aggregate::Median => "MEDIAN",
            Aggregate::Percentile => "PERCENTILE",
        }
    }
    pub fn is_count(&self) -> bool {
        matches!(self, Aggregate::Count | Aggregate::CountDistinct)
    }
}
impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
}
impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aggregate: None,
            label: None,
            dtype: None,
        }
    }
    pub fn with_aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.aggregate = Some(aggregate.into());
        self
    }
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
    pub fn is_aggregated(&self) -> bool {
        self.aggregate.is_some()
    }
    /// The aggregate the normaliser will apply, after the SUM fallback.
    pub fn effective_aggregate(&self) -> Aggregate {
        self.aggregate
            .as_deref()
            .and_then(Aggregate::parse)
            .unwrap_or(Aggregate::Sum)
    }
    pub fn custom_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FilterValue>),
}
impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}
impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}
impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}
pub const FILTER_OPERATORS: [&str; 6] = ["=", "!=", ">", ">=", "<", "<="];
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub op: String,
    pub value: FilterValue,
}
impl FilterConfig {
    pub fn new(column: impl Into<String>, op: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            column: column.into(),
            op: op.into(),
            value: value.into(),
        }
    }
    pub fn has_known_operator(&self) -> bool {
        FILTER_OPERATORS.contains(&self.op.as_str())
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    Linear,
    Log,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    Bottom,
    Left,
    Right,
}
impl LegendPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegendPosition::Top => "top",
            LegendPosition::Bottom => "bottom",
            LegendPosition::Left => "left",
            LegendPosition::Right => "right",
        }
    }
}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<AxisScale>,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendConfig {
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<LegendPosition>,
}
impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            show: true,
            position: None,
        }
    }
}
fn default_true() -> bool {
    true
}
fn default_table_viz_type() -> String {
    "table".to_string()
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChartConfig {
    pub columns: Vec<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Option<FilterConfig>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<Vec<String>>,
    #[serde(default = "default_table_viz_type")]
    pub viz_type: String,
}
impl TableChartConfig {
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        Self {
            columns,
            filters: None,
            sort_by: None,
            viz_type: default_table_viz_type(),
        }
    }
    pub fn validate(&self) -> ValidationResult<()> {
        if self.columns.is_empty() {
            return Err(ValidationError::EmptyColumns);
        }
        for (idx, column) in self.columns.iter().enumerate() {
            if column.is_blank() {
                return Err(ValidationError::BlankColumnName {
                    field: format!("columns[{idx}]"),
                });
            }
        }
        Ok(())
    }
}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Area,
    Scatter,
    #[serde(other)]
    Other,
}
impl ChartKind {
    /// Unknown kinds render as line charts.
    pub fn viz_type(&self) -> &'static str {
        match self {
            ChartKind::Line | ChartKind::Other => "echarts_timeseries_line",
            ChartKind::Bar => "echarts_timeseries_bar",
            ChartKind::Area => "echarts_area",
            ChartKind::Scatter => "echarts_timeseries_scatter",
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line | ChartKind::Other => "line",
            ChartKind::Bar => "bar",
            ChartKind::Area => "area",
            ChartKind::Scatter => "scatter",
        }
    }
    pub fn display_name(&self) -> &'static str {
        match self {
            ChartKind::Line | ChartKind::Other => "Line",
            ChartKind::Bar => "Bar",
            ChartKind::Area => "Area",
            ChartKind::Scatter => "Scatter",
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyChartConfig {
    pub x: ColumnRef,
    pub y: Vec<ColumnRef>,
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Option<FilterConfig>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_grain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacked: Option<bool>,
}
impl XyChartConfig {
    pub fn new(x: ColumnRef, y: Vec<ColumnRef>, kind: ChartKind) -> Self {
        Self {
            x,
            y,
            kind,
            group_by: None,
            x_axis: None,
            y_axis: None,
            legend: None,
            filters: None,
            time_grain: None,
            stacked: None,
        }
    }
    pub fn validate(&self) -> ValidationResult<()> {
        if self.x.is_blank() {
            return Err(ValidationError::BlankColumnName {
                field: "x".to_string(),
            });
        }
        if self.y.is_empty() {
            return Err(ValidationError::EmptyMetrics);
        }
        for (idx, column) in self.y.iter().enumerate() {
            if column.is_blank() {
                return Err(ValidationError::BlankColumnName {
                    field: format!("y[{idx}]"),
                });
            }
        }
        Ok(())
    }
    pub fn is_stacked(&self) -> bool {
        self.stacked.unwrap_or(false)
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chart_type", rename_all = "lowercase")]
pub enum ChartConfig {
    Table(TableChartConfig),
    Xy(XyChartConfig),
}
impl ChartConfig {
    pub fn chart_type(&self) -> &'static str {
        match self {
            ChartConfig::Table(_) => "table",
            ChartConfig::Xy(_) => "xy",
        }
    }
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            ChartConfig::Table(config) => config.validate(),
            ChartConfig::Xy(config) => config.validate(),
        }
    }
}
impl From<TableChartConfig> for ChartConfig {
    fn from(config: TableChartConfig) -> Self {
        ChartConfig::Table(config)
    }
}
impl From<XyChartConfig> for ChartConfig {
    fn from(config: XyChartConfig) -> Self {
        ChartConfig::Xy(config)
    }
}
