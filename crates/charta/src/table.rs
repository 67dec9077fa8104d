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

use crate::error::{Result, ValidationError};
use crate::filters::map_filters;
use crate::form_data::FormData;
use crate::metrics::{create_metric_object, MetricObject};
use crate::schema::TableChartConfig;
use tracing::debug;
pub const DEFAULT_ROW_LIMIT: u64 = 1000;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Raw,
    Aggregate,
    Mixed,
}
impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Raw => "raw",
            QueryMode::Aggregate | QueryMode::Mixed => "aggregate",
        }
    }
}
pub fn map_table_config(config: &TableChartConfig) -> Result<FormData> {
    if config.columns.is_empty() {
        return Err(ValidationError::EmptyColumns.into());
    }
    let mut raw_columns: Vec<String> = Vec::new();
    let mut aggregated_metrics: Vec<MetricObject> = Vec::new();
    for column in &config.columns {
        if column.is_aggregated() {
            aggregated_metrics.push(create_metric_object(column));
        } else {
            raw_columns.push(column.name.clone());
        }
    }
    let mode = match (raw_columns.is_empty(), aggregated_metrics.is_empty()) {
        (true, true) => return Err(ValidationError::NoColumnsOrMetrics.into()),
        (false, true) => QueryMode::Raw,
        (true, false) => QueryMode::Aggregate,
        (false, false) => QueryMode::Mixed,
    };
    debug!(
        ?mode,
        raw = raw_columns.len(),
        metrics = aggregated_metrics.len(),
        "Mapping table chart"
    );
    let mut form_data = FormData::new();
    form_data.insert("viz_type", config.viz_type.as_str());
    match mode {
        QueryMode::Raw => {
            form_data.insert_serialized("all_columns", &raw_columns)?;
            form_data.insert("query_mode", mode.as_str());
            form_data.insert("include_time", false);
            form_data.insert("order_desc", true);
            form_data.insert("row_limit", DEFAULT_ROW_LIMIT);
        }
        QueryMode::Aggregate => {
            form_data.insert_serialized("metrics", &aggregated_metrics)?;
            form_data.insert("query_mode", mode.as_str());
        }
        QueryMode::Mixed => {
            form_data.insert_serialized("all_columns", &raw_columns)?;
            form_data.insert_serialized("metrics", &aggregated_metrics)?;
            form_data.insert_serialized("groupby", &raw_columns)?;
            form_data.insert("query_mode", mode.as_str());
        }
    }
    if let Some(filters) = config.filters.as_deref().filter(|f| !f.is_empty()) {
        form_data.insert_serialized("adhoc_filters", &map_filters(filters))?;
    }
    if let Some(sort_by) = config.sort_by.as_deref().filter(|s| !s.is_empty()) {
        form_data.insert_serialized("order_by_cols", &sort_by)?;
    }
    Ok(form_data)
}
