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

use crate::dataset::{DatasetId, DatasetResolver};
use crate::error::{Result, ValidationError};
use crate::form_data::FormData;
use crate::schema::ChartConfig;
use crate::table::map_table_config;
use crate::xy::map_xy_config;
use serde_json::Value;
pub const SUPPORTED_CHART_TYPES: [&str; 2] = ["table", "xy"];
pub fn map_config_to_form_data(
    config: &ChartConfig,
    resolver: &dyn DatasetResolver,
    dataset_id: Option<&DatasetId>,
) -> Result<FormData> {
    match config {
        ChartConfig::Table(table) => map_table_config(table),
        ChartConfig::Xy(xy) => map_xy_config(xy, resolver, dataset_id),
    }
}
/// Reads a chart config from loosely-typed JSON.
///
/// The tag is checked before the body so that a missing or unknown
/// `chart_type` reports as unsupported rather than as a schema error.
pub fn parse_chart_config(raw: &Value) -> Result<ChartConfig> {
    let chart_type = raw.get("chart_type").and_then(Value::as_str);
    match chart_type {
        Some(tag) if SUPPORTED_CHART_TYPES.contains(&tag) => {}
        other => {
            return Err(ValidationError::UnsupportedChartType {
                chart_type: other.unwrap_or("<missing>").to_string(),
            }
            .into())
        }
    }
    serde_json::from_value(raw.clone()).map_err(|e| {
        ValidationError::InvalidConfig {
            reason: e.to_string(),
        }
        .into()
    })
}
