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

//! Previews rendered from a query executor response.

use crate::config::PreviewConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
const FIELD_SAMPLE_ROWS: usize = 10;
const TOOLTIP_FIELDS: usize = 5;
const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\d{4}-\d{2}-\d{2}|^\d{1,2}/\d{1,2}/\d{2,4}$|^\d{1,2}:\d{2}(:\d{2})?$|\b(jan(uary)?|feb(ruary)?|mar(ch)?|apr(il)?|may|june?|july?|aug(ust)?|sept?(ember)?|oct(ober)?|nov(ember)?|dec(ember)?)\b|\b(mon|tues|wednes|thurs|fri|satur|sun)day\b",
    )
    .unwrap()
});
/// Response of the query executor for one visualization query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub colnames: Vec<String>,
    #[serde(default)]
    pub rowcount: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub is_cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dttm: Option<String>,
}
impl QueryResult {
    pub fn from_rows(data: Vec<Map<String, Value>>) -> Self {
        let colnames = data
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            rowcount: data.len(),
            data,
            colnames,
            ..Default::default()
        }
    }
    /// Column order as reported by the executor, else the first row's keys.
    pub fn fields(&self) -> Vec<String> {
        if !self.colnames.is_empty() {
            return self.colnames.clone();
        }
        self.data
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
    pub fn total_rows(&self) -> usize {
        self.rowcount.max(self.data.len())
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Temporal,
    Quantitative,
    Nominal,
}
impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Temporal => "temporal",
            FieldType::Quantitative => "quantitative",
            FieldType::Nominal => "nominal",
        }
    }
}
pub fn looks_like_date(value: &str) -> bool {
    DATE_LIKE.is_match(value.trim())
}
fn is_number(value: &Value) -> bool {
    matches!(value, Value::Number(_))
}
/// Infers a field's encoding type from the first few non-null values.
pub fn infer_field_type(result: &QueryResult, field: &str) -> FieldType {
    let samples: Vec<&Value> = result
        .data
        .iter()
        .take(FIELD_SAMPLE_ROWS)
        .filter_map(|row| row.get(field))
        .filter(|v| !v.is_null())
        .collect();
    if samples.is_empty() {
        return FieldType::Nominal;
    }
    if samples
        .iter()
        .any(|v| v.as_str().is_some_and(looks_like_date))
    {
        FieldType::Temporal
    } else if samples.iter().all(|v| is_number(v)) {
        FieldType::Quantitative
    } else {
        FieldType::Nominal
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkFamily {
    Line,
    Bar,
    Area,
    Scatter,
    Pie,
    Table,
}
impl MarkFamily {
    pub fn for_viz_type(viz_type: &str) -> Self {
        match viz_type {
            "echarts_timeseries_line" | "echarts_timeseries" | "echarts_timeseries_smooth"
            | "echarts_timeseries_step" | "line" => MarkFamily::Line,
            "echarts_timeseries_bar" | "echarts_timeseries_column" | "bar" | "column" => {
                MarkFamily::Bar
            }
            "echarts_area" | "area" => MarkFamily::Area,
            "echarts_timeseries_scatter" | "scatter" => MarkFamily::Scatter,
            "pie" => MarkFamily::Pie,
            "table" | "ag-grid-table" => MarkFamily::Table,
            other => {
                debug!(viz_type = other, "Unknown viz type, previewing as scatter");
                MarkFamily::Scatter
            }
        }
    }
}
fn encoding_channel(field: &str, field_type: FieldType) -> Value {
    json!({"field": field, "type": field_type.as_str(), "title": field})
}
fn tooltip(typed: &[(String, FieldType)], limit: usize) -> Value {
    Value::Array(
        typed
            .iter()
            .take(limit)
            .map(|(field, field_type)| json!({"field": field, "type": field_type.as_str()}))
            .collect(),
    )
}
/// Builds a Vega-Lite v5 spec for the rows in `result`.
pub fn vega_lite_spec(viz_type: &str, title: &str, result: &QueryResult, width: u32, height: u32) -> Value {
    if result.data.is_empty() {
        return json!({"data": {"values": []}, "mark": "point"});
    }
    let typed: Vec<(String, FieldType)> = result
        .fields()
        .into_iter()
        .map(|field| {
            let field_type = infer_field_type(result, &field);
            (field, field_type)
        })
        .collect();
    let first = typed
        .first()
        .cloned()
        .unwrap_or_else(|| ("x".to_string(), FieldType::Nominal));
    let second = typed.get(1).cloned().unwrap_or_else(|| first.clone());
    let (mark, encoding) = match MarkFamily::for_viz_type(viz_type) {
        MarkFamily::Line => (
            json!({"type": "line", "point": true, "tooltip": true}),
            json!({
                "x": encoding_channel(&first.0, first.1),
                "y": encoding_channel(&second.0, second.1),
                "tooltip": tooltip(&typed, TOOLTIP_FIELDS),
            }),
        ),
        MarkFamily::Bar => (
            json!({"type": "bar", "tooltip": true}),
            json!({
                "x": encoding_channel(&first.0, first.1),
                "y": encoding_channel(&second.0, second.1),
                "tooltip": tooltip(&typed, TOOLTIP_FIELDS),
            }),
        ),
        MarkFamily::Area => (
            json!({"type": "area", "tooltip": true}),
            json!({
                "x": encoding_channel(&first.0, first.1),
                "y": encoding_channel(&second.0, second.1),
                "tooltip": tooltip(&typed, TOOLTIP_FIELDS),
            }),
        ),
        MarkFamily::Scatter => (
            json!({"type": "circle", "size": 100, "tooltip": true}),
            json!({
                "x": encoding_channel(&first.0, first.1),
                "y": encoding_channel(&second.0, second.1),
                "tooltip": tooltip(&typed, TOOLTIP_FIELDS),
            }),
        ),
        MarkFamily::Pie => (
            json!({"type": "arc", "tooltip": true}),
            json!({
                "theta": {"field": second.0, "type": second.1.as_str()},
                "color": encoding_channel(&first.0, first.1),
                "tooltip": tooltip(&typed, TOOLTIP_FIELDS),
            }),
        ),
        MarkFamily::Table => (
            json!({"type": "circle", "size": 50}),
            json!({
                "y": encoding_channel(&first.0, first.1),
                "tooltip": tooltip(&typed, 2 * TOOLTIP_FIELDS),
            }),
        ),
    };
    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "description": format!("Chart preview for {title}"),
        "data": {"values": result.data},
        "width": width,
        "height": height,
        "mark": mark,
        "encoding": encoding,
    })
}
fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
fn interest_score(header: &str, rows: &[Map<String, Value>]) -> usize {
    let lower = header.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let mut score = 0;
    if has_any(&["name", "title", "id"]) {
        score += 10;
    }
    if has_any(&["amount", "price", "cost", "revenue", "sales"]) {
        score += 8;
    }
    if has_any(&["date", "time", "created", "updated"]) {
        score += 6;
    }
    if has_any(&["count", "total", "sum", "avg"]) {
        score += 5;
    }
    let mut distinct: Vec<String> = rows
        .iter()
        .take(FIELD_SAMPLE_ROWS)
        .map(|row| display_value(row.get(header)))
        .collect();
    distinct.sort();
    distinct.dedup();
    if distinct.len() > 1 {
        score += distinct.len().min(5);
    }
    score
}
/// Keeps the `max_columns` most business-relevant columns, in score order.
pub fn select_display_columns(headers: &[String], rows: &[Map<String, Value>], max_columns: usize) -> Vec<String> {
    if headers.len() <= max_columns {
        return headers.to_vec();
    }
    let mut scored: Vec<(usize, &String)> = headers
        .iter()
        .map(|h| (interest_score(h, rows), h))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(max_columns).map(|(_, h)| h.clone()).collect()
}
fn content_len(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Number(n)) if n.is_f64() => format!("{:.2}", n.as_f64().unwrap_or_default()).len(),
        other => display_value(other).chars().count(),
    }
}
fn column_widths(headers: &[String], rows: &[Map<String, Value>], total_width: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| (h.chars().count() + 2).min(15).max(8))
        .collect();
    for row in rows.iter().take(FIELD_SAMPLE_ROWS) {
        for (width, header) in widths.iter_mut().zip(headers) {
            *width = (*width).max((content_len(row.get(header)) + 1).min(20));
        }
    }
    let used: usize = widths.iter().sum::<usize>() + headers.len() * 3;
    let available = total_width.saturating_sub(10).min(80);
    if used < available && !widths.is_empty() {
        let extra = (available - used) / widths.len();
        widths.iter_mut().for_each(|w| *w += extra);
    }
    widths
}
fn abbreviate(value: &Value) -> String {
    if let Some(int) = value.as_i64() {
        return match int.unsigned_abs() {
            n if n >= 1_000_000 => format!("{}M", int / 1_000_000),
            n if n >= 1_000 => format!("{}K", int / 1_000),
            _ => int.to_string(),
        };
    }
    let float = value.as_f64().unwrap_or_default();
    match float.abs() {
        n if n >= 1_000_000.0 => format!("{:.1}M", float / 1_000_000.0),
        n if n >= 1_000.0 => format!("{:.1}K", float / 1_000.0),
        _ => format!("{float:.2}"),
    }
}
fn format_cell(value: Option<&Value>, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let numeric = matches!(value, Some(Value::Number(_)));
    let mut text = match value {
        Some(number @ Value::Number(_)) => abbreviate(number),
        other => display_value(other),
    };
    if text.chars().count() > inner {
        text = text.chars().take(width.saturating_sub(5)).collect::<String>() + "...";
    }
    if numeric {
        format!("{text:>inner$}")
    } else {
        format!("{text:<inner$}")
    }
}
fn rule(widths: &[usize], left: char, mid: char, right: char, fill: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| fill.to_string().repeat(*w)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}
fn header_cell(header: &str, width: usize) -> String {
    let shown: String = header.chars().take(width.saturating_sub(2)).collect();
    format!("{shown:^width$}")
}
fn numeric_summaries(headers: &[String], rows: &[Map<String, Value>]) -> Vec<String> {
    headers
        .iter()
        .filter_map(|header| {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| row.get(header).and_then(Value::as_f64))
                .collect();
            if values.len() < 2 {
                return None;
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = values.iter().sum::<f64>() / values.len() as f64;
            let avg = if avg.abs() >= 1000.0 {
                format!("{:.1}K", avg / 1000.0)
            } else {
                format!("{avg:.1}")
            };
            Some(format!("  {header}: avg={avg}, range={min:.1}-{max:.1}"))
        })
        .collect()
}
/// Renders a box-drawn text table of the first rows.
pub fn ascii_table(result: &QueryResult, config: &PreviewConfig) -> String {
    if result.data.is_empty() {
        return "No data for table".to_string();
    }
    let headers = select_display_columns(&result.fields(), &result.data, config.max_columns);
    let widths = column_widths(&headers, &result.data, config.ascii_width);
    let mut lines = vec![
        "Data Table".to_string(),
        "═".repeat(config.ascii_width.min(70)),
        rule(&widths, '┌', '┬', '┐', '─'),
    ];
    let titles: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| header_cell(h, *w))
        .collect();
    lines.push(format!("│{}│", titles.join("│")));
    lines.push(rule(&widths, '├', '┼', '┤', '─'));
    let row_count = result.data.len().min(config.max_rows);
    for (idx, row) in result.data.iter().take(row_count).enumerate() {
        let cells: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format_cell(row.get(h), *w))
            .collect();
        lines.push(format!("│ {} │", cells.join(" │ ")));
        if idx > 0 && (idx + 1) % 5 == 0 && idx + 1 < row_count {
            lines.push(rule(&widths, '├', '┼', '┤', '┈'));
        }
    }
    lines.push(rule(&widths, '├', '┼', '┤', '─'));
    lines.push(format!("Showing {row_count} of {} rows", result.total_rows()));
    let summaries = numeric_summaries(&headers, &result.data);
    if !summaries.is_empty() {
        lines.push(String::new());
        lines.push("Numeric Summaries:".to_string());
        lines.extend(summaries);
    }
    lines.join("\n")
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewFormat {
    Ascii,
    VegaLite,
    Table,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartPreview {
    Ascii {
        ascii_content: String,
        width: usize,
    },
    VegaLite {
        specification: Value,
        supports_streaming: bool,
    },
    Table {
        table_data: String,
        row_count: usize,
    },
}
pub fn render_preview(
    format: PreviewFormat,
    viz_type: &str,
    title: &str,
    result: &QueryResult,
    config: &PreviewConfig,
) -> ChartPreview {
    match format {
        PreviewFormat::Ascii => ChartPreview::Ascii {
            ascii_content: ascii_table(result, config),
            width: config.ascii_width,
        },
        PreviewFormat::VegaLite => ChartPreview::VegaLite {
            specification: vega_lite_spec(viz_type, title, result, config.width, config.height),
            supports_streaming: false,
        },
        PreviewFormat::Table => {
            let wide = PreviewConfig {
                ascii_width: config.ascii_width.max(120),
                ..config.clone()
            };
            ChartPreview::Table {
                table_data: ascii_table(result, &wide),
                row_count: result.data.len(),
            }
        }
    }
}
