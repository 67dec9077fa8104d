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

use crate::schema::{Aggregate, ColumnRef};
use serde::{Deserialize, Serialize};
use tracing::debug;
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricColumn {
    pub column_name: String,
}
/// Simple ad hoc metric as the explore view stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricObject {
    pub aggregate: String,
    pub column: MetricColumn,
    pub expression_type: String,
    pub label: String,
    pub option_name: String,
    pub sql_expression: Option<String>,
    pub has_custom_label: bool,
    pub datasource_warning: bool,
}
/// Normalises a column reference into a metric.
///
/// A missing aggregate defaults to SUM and an aggregate outside the allow-list
/// silently falls back to SUM as well. The caller is expected to have rejected
/// blank names already.
pub fn create_metric_object(column: &ColumnRef) -> MetricObject {
    let aggregate = match column.aggregate.as_deref() {
        None => Aggregate::Sum,
        Some(raw) => Aggregate::parse(raw).unwrap_or_else(|| {
            debug!(column = %column.name, aggregate = raw, "Unknown aggregate, using SUM");
            Aggregate::Sum
        }),
    };
    let custom_label = column.custom_label();
    let label = custom_label
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}({})", aggregate.as_str(), column.name));
    MetricObject {
        aggregate: aggregate.as_str().to_string(),
        column: MetricColumn {
            column_name: column.name.clone(),
        },
        expression_type: "SIMPLE".to_string(),
        label,
        option_name: format!("metric_{}", column.name),
        sql_expression: None,
        has_custom_label: custom_label.is_some(),
        datasource_warning: false,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_sum_with_synthesised_label() {
        let metric = create_metric_object(&ColumnRef::new("orders"));
        assert_eq!(metric.aggregate, "SUM");
        assert_eq!(metric.label, "SUM(orders)");
        assert_eq!(metric.option_name, "metric_orders");
        assert!(!metric.has_custom_label);
    }

    #[test]
    fn lowercase_aggregate_is_upper_cased() {
        let metric = create_metric_object(&ColumnRef::new("price").with_aggregate("avg"));
        assert_eq!(metric.aggregate, "AVG");
        assert_eq!(metric.label, "AVG(price)");
    }

    #[test]
    fn unknown_aggregate_falls_back_to_sum() {
        let metric = create_metric_object(&ColumnRef::new("price").with_aggregate("GEOMEAN"));
        assert_eq!(metric.aggregate, "SUM");
        assert_eq!(metric.label, "SUM(price)");
    }

    #[test]
    fn custom_label_is_kept() {
        let metric = create_metric_object(
            &ColumnRef::new("revenue")
                .with_aggregate("MAX")
                .with_label("Peak revenue"),
        );
        assert_eq!(metric.label, "Peak revenue");
        assert!(metric.has_custom_label);
    }

    #[test]
    fn empty_label_counts_as_absent() {
        let metric = create_metric_object(&ColumnRef::new("revenue").with_label(""));
        assert_eq!(metric.label, "SUM(revenue)");
        assert!(!metric.has_custom_label);
    }

    #[test]
    fn serialises_with_explore_key_names() {
        let value = serde_json::to_value(create_metric_object(&ColumnRef::new("orders"))).unwrap();
        assert_eq!(
            value,
            json!({
                "aggregate": "SUM",
                "column": {"column_name": "orders"},
                "expressionType": "SIMPLE",
                "label": "SUM(orders)",
                "optionName": "metric_orders",
                "sqlExpression": null,
                "hasCustomLabel": false,
                "datasourceWarning": false
            })
        );
    }
}
