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

//! XY (time-series or categorical) chart mapping.
//!
//! A non-temporal x-axis must never reach the time-bucketing path of the
//! query executor, so the categorical branch nulls both time keys. The
//! x-axis column is also never repeated in `groupby`.

use crate::dataset::{DatasetId, DatasetResolver};
use crate::error::{Result, ValidationError};
use crate::filters::map_filters;
use crate::form_data::FormData;
use crate::metrics::{create_metric_object, MetricObject};
use crate::schema::{AxisConfig, AxisScale, LegendConfig, XyChartConfig};
use crate::temporal::is_column_truly_temporal;
use tracing::debug;
pub fn map_xy_config(
    config: &XyChartConfig,
    resolver: &dyn DatasetResolver,
    dataset_id: Option<&DatasetId>,
) -> Result<FormData> {
    if config.y.is_empty() {
        return Err(ValidationError::EmptyMetrics.into());
    }
    let x_is_temporal = is_column_truly_temporal(resolver, &config.x.name, dataset_id);
    map_xy_config_with_verdict(config, x_is_temporal)
}
/// Maps with an already-decided x-axis classification, so callers that
/// need the verdict elsewhere look the dataset up only once.
pub fn map_xy_config_with_verdict(config: &XyChartConfig, x_is_temporal: bool) -> Result<FormData> {
    let metrics = build_metrics(config)?;
    let mut form_data = FormData::new();
    form_data.insert("viz_type", config.kind.viz_type());
    form_data.insert_serialized("metrics", &metrics)?;
    form_data.insert("x_axis", config.x.name.as_str());
    if x_is_temporal {
        if let Some(time_grain) = config.time_grain.as_deref() {
            form_data.insert("time_grain_sqla", time_grain);
        }
    } else {
        debug!(column = %config.x.name, "Non-temporal x-axis, using categorical sort");
        form_data.insert("x_axis_sort_series_type", "name");
        form_data.insert("x_axis_sort_series_ascending", true);
        form_data.insert_null("time_grain_sqla");
        form_data.insert_null("granularity_sqla");
    }
    if let Some(group_by) = config.group_by.as_ref() {
        if group_by.name != config.x.name {
            form_data.insert_serialized("groupby", &[group_by.name.as_str()])?;
        } else {
            debug!(column = %group_by.name, "Group-by duplicates x-axis, omitting groupby");
        }
    }
    if let Some(filters) = config.filters.as_deref().filter(|f| !f.is_empty()) {
        form_data.insert_serialized("adhoc_filters", &map_filters(filters))?;
    }
    if config.is_stacked() {
        form_data.insert("stack", "Stack");
    }
    if let Some(x_axis) = config.x_axis.as_ref() {
        apply_x_axis(&mut form_data, x_axis);
    }
    if let Some(y_axis) = config.y_axis.as_ref() {
        apply_y_axis(&mut form_data, y_axis);
    }
    if let Some(legend) = config.legend.as_ref() {
        apply_legend(&mut form_data, legend);
    }
    Ok(form_data)
}
fn build_metrics(config: &XyChartConfig) -> Result<Vec<MetricObject>> {
    let mut metrics = Vec::with_capacity(config.y.len());
    for (idx, column) in config.y.iter().enumerate() {
        if column.is_blank() {
            return Err(ValidationError::BlankColumnName {
                field: format!("y[{idx}]"),
            }
            .into());
        }
        metrics.push(create_metric_object(column));
    }
    if metrics.is_empty() {
        return Err(ValidationError::EmptyMetrics.into());
    }
    Ok(metrics)
}
fn apply_x_axis(form_data: &mut FormData, axis: &AxisConfig) {
    if let Some(title) = axis.title.as_deref() {
        form_data.insert("x_axis_title", title);
    }
    if let Some(format) = axis.format.as_deref() {
        form_data.insert("x_axis_format", format);
    }
}
fn apply_y_axis(form_data: &mut FormData, axis: &AxisConfig) {
    if let Some(title) = axis.title.as_deref() {
        form_data.insert("y_axis_title", title);
    }
    if let Some(format) = axis.format.as_deref() {
        form_data.insert("y_axis_format", format);
    }
    if axis.scale == Some(AxisScale::Log) {
        form_data.insert("y_axis_scale", "log");
    }
}
fn apply_legend(form_data: &mut FormData, legend: &LegendConfig) {
    if !legend.show {
        form_data.insert("show_legend", false);
    }
    if let Some(position) = legend.position {
        form_data.insert("legend_orientation", position.as_str());
    }
}
