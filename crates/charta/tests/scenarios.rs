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

use charta::error::{CacheError, CacheResult, LookupError, LookupResult};
use charta::filters::map_filter_operator;
use charta::metrics::create_metric_object;
use charta::naming::FormDataEntry;
use charta::table::map_table_config;
use charta::xy::map_xy_config;
use charta::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

const REGISTRY: &str = r#"
datasets:
  - id: 3
    uuid: 0b6f5a3c-1d2e-4f70-8a9b-c0d1e2f3a4b5
    table_name: orders
    columns:
      - column_name: date
        type: DATE
        is_dttm: true
      - column_name: year
        type: INTEGER
        is_dttm: true
      - column_name: region
        type: VARCHAR(64)
      - column_name: revenue
        type: NUMERIC(12,2)
"#;

fn registry() -> InMemoryDatasetRegistry {
    InMemoryDatasetRegistry::from_yaml_str(REGISTRY).unwrap()
}

fn sum_revenue() -> Vec<ColumnRef> {
    vec![ColumnRef::new("revenue").with_aggregate("SUM")]
}

struct FailingResolver;

impl DatasetResolver for FailingResolver {
    fn find_by_id(&self, _id: &DatasetId) -> LookupResult<Option<Dataset>> {
        Err(LookupError::Backend("connection refused".to_string()))
    }
}

struct CountingResolver {
    inner: InMemoryDatasetRegistry,
    lookups: AtomicUsize,
}

impl DatasetResolver for CountingResolver {
    fn find_by_id(&self, id: &DatasetId) -> LookupResult<Option<Dataset>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id)
    }
}

struct FailingCache;

impl FormDataCache for FailingCache {
    fn create(&self, _entry: &FormDataEntry) -> CacheResult<String> {
        Err(CacheError::StoreFailed("cache unavailable".to_string()))
    }
}

#[test]
fn scenario_a_mixed_table() {
    let config = TableChartConfig::new(vec![ColumnRef::new("product"), ColumnRef::new("revenue").with_aggregate("SUM")]);
    let form_data = map_table_config(&config).unwrap();
    assert_eq!(form_data.get("all_columns"), Some(&json!(["product"])));
    assert_eq!(form_data.get("groupby"), Some(&json!(["product"])));
    assert_eq!(form_data.get_str("query_mode"), Some("aggregate"));
    let metric = &form_data.get("metrics").unwrap()[0];
    assert_eq!(metric["aggregate"], "SUM");
    assert_eq!(metric["column"], json!({"column_name": "revenue"}));
    assert_eq!(metric["label"], "SUM(revenue)");
}

#[test]
fn scenario_b_temporal_line() {
    let config = XyChartConfig::new(ColumnRef::new("date"), sum_revenue(), ChartKind::Line);
    let form_data = map_xy_config(&config, &registry(), Some(&DatasetId::Numeric(3))).unwrap();
    assert_eq!(form_data.viz_type(), Some("echarts_timeseries_line"));
    assert_eq!(form_data.get_str("x_axis"), Some("date"));
    assert!(!form_data.contains_key("groupby"));
    assert!(!form_data.contains_key("time_grain_sqla"));

    let mut with_grain = config.clone();
    with_grain.time_grain = Some("P1M".to_string());
    let form_data = map_xy_config(&with_grain, &registry(), Some(&DatasetId::Numeric(3))).unwrap();
    assert_eq!(form_data.get_str("time_grain_sqla"), Some("P1M"));
}

#[test]
fn scenario_c_integer_year_is_categorical() {
    let mut config = XyChartConfig::new(ColumnRef::new("year"), sum_revenue(), ChartKind::Line);
    config.time_grain = Some("P1Y".to_string());
    let form_data = map_xy_config(&config, &registry(), Some(&DatasetId::Numeric(3))).unwrap();
    assert_eq!(form_data.get_str("x_axis_sort_series_type"), Some("name"));
    assert_eq!(form_data.get("x_axis_sort_series_ascending"), Some(&Value::Bool(true)));
    assert_eq!(form_data.get("time_grain_sqla"), Some(&Value::Null));
    assert_eq!(form_data.get("granularity_sqla"), Some(&Value::Null));
}

#[test]
fn scenario_c_by_uuid() {
    let id = DatasetId::parse("0b6f5a3c-1d2e-4f70-8a9b-c0d1e2f3a4b5").unwrap();
    let config = XyChartConfig::new(ColumnRef::new("YEAR"), sum_revenue(), ChartKind::Bar);
    let form_data = map_xy_config(&config, &registry(), Some(&id)).unwrap();
    assert_eq!(form_data.get("granularity_sqla"), Some(&Value::Null));
}

#[test]
fn scenario_d_group_by_matching_x_is_dropped() {
    let mut config = XyChartConfig::new(ColumnRef::new("date"), sum_revenue(), ChartKind::Bar);
    config.group_by = Some(ColumnRef::new("date"));
    let form_data = map_xy_config(&config, &registry(), None).unwrap();
    assert!(!form_data.contains_key("groupby"));

    config.group_by = Some(ColumnRef::new("region"));
    let form_data = map_xy_config(&config, &registry(), None).unwrap();
    assert_eq!(form_data.get("groupby"), Some(&json!(["region"])));
}

#[test]
fn scenario_e_filter_operators() {
    assert_eq!(map_filter_operator("="), "==");
    assert_eq!(map_filter_operator("???"), "???");
}

#[test]
fn scenario_f_default_metric() {
    let metric = serde_json::to_value(create_metric_object(&ColumnRef::new("orders"))).unwrap();
    assert_eq!(metric["aggregate"], "SUM");
    assert_eq!(metric["label"], "SUM(orders)");
    assert_eq!(metric["optionName"], "metric_orders");
    assert_eq!(metric["expressionType"], "SIMPLE");
    assert_eq!(metric["sqlExpression"], Value::Null);
    assert_eq!(metric["hasCustomLabel"], false);
    assert_eq!(metric["datasourceWarning"], false);

    let padded = create_metric_object(&ColumnRef::new("price").with_aggregate(" avg "));
    assert_eq!(padded.aggregate, "SUM");
    assert_eq!(padded.label, "SUM(price)");
}

#[test]
fn missing_dataset_and_failing_lookup_count_as_temporal() {
    let config = XyChartConfig::new(ColumnRef::new("year"), sum_revenue(), ChartKind::Line);
    let missing = map_xy_config(&config, &registry(), Some(&DatasetId::Numeric(99))).unwrap();
    assert!(!missing.contains_key("granularity_sqla"));
    let failing = map_xy_config(&config, &FailingResolver, Some(&DatasetId::Numeric(3))).unwrap();
    assert!(!failing.contains_key("granularity_sqla"));
}

#[test]
fn explore_link_uses_cache_key_when_dataset_resolves() {
    let cache = InMemoryFormDataCache::new();
    let mut form_data = FormData::new();
    form_data.insert("viz_type", "table");
    let link = generate_explore_link(&registry(), &cache, "http://bi.local/", "3", &form_data);
    let key = link.strip_prefix("http://bi.local/explore/?form_data_key=").unwrap();
    let entry = cache.get(key).unwrap();
    assert_eq!(entry.datasource_id, 3);
    assert_eq!(entry.datasource_type, "table");
    assert_eq!(serde_json::from_str::<Value>(&entry.form_data).unwrap()["viz_type"], "table");
}

#[test]
fn explore_link_degrades_without_raising() {
    let form_data = FormData::new();
    let cache = InMemoryFormDataCache::new();
    assert_eq!(
        generate_explore_link(&registry(), &cache, "http://bi.local", "42", &form_data),
        "http://bi.local/explore/?datasource_type=table&datasource_id=42"
    );
    assert_eq!(
        generate_explore_link(&FailingResolver, &cache, "http://bi.local", "3", &form_data),
        "http://bi.local/explore/?datasource_type=table&datasource_id=3"
    );
    assert_eq!(
        generate_explore_link(&registry(), &FailingCache, "http://bi.local", "0b6f5a3c-1d2e-4f70-8a9b-c0d1e2f3a4b5", &form_data),
        "http://bi.local/explore/?datasource_type=table&datasource_id=3"
    );
    assert!(cache.is_empty());
}

#[test]
fn mapper_end_to_end() {
    let mapper = ChartMapper::new(registry(), InMemoryFormDataCache::new(), MapperConfig::default());
    let raw = json!({
        "chart_type": "xy",
        "x": {"name": "year"},
        "y": [{"name": "revenue", "aggregate": "sum"}],
        "kind": "line",
        "filters": [{"column": "region", "op": "=", "value": "EMEA"}, null]
    });
    let chart = mapper.generate_from_value(&raw, Some("3")).unwrap();
    assert_eq!(chart.name, "Line Chart - year vs revenue");
    assert_eq!(chart.form_data.get("time_grain_sqla"), Some(&Value::Null));
    let filters = chart.form_data.get("adhoc_filters").unwrap().as_array().unwrap();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0]["operator"], "==");
    assert!(chart.warnings.iter().any(|w| w.advisor == "chart_type"));
    assert_eq!(chart.capabilities.data_types, vec!["categorical", "metric"]);

    let link = mapper.explore_link("3", &chart.form_data);
    assert!(link.contains("/explore/?form_data_key="));
    assert_eq!(mapper.cache().len(), 1);
}

#[test]
fn generate_looks_the_dataset_up_once() {
    let resolver = CountingResolver {
        inner: registry(),
        lookups: AtomicUsize::new(0),
    };
    let mapper = ChartMapper::new(resolver, InMemoryFormDataCache::new(), MapperConfig::default());
    let config: ChartConfig = XyChartConfig::new(ColumnRef::new("year"), sum_revenue(), ChartKind::Line).into();
    let chart = mapper.generate(&config, Some(&DatasetId::Numeric(3))).unwrap();
    assert_eq!(mapper.resolver().lookups.load(Ordering::SeqCst), 1);
    assert_eq!(chart.form_data.get("granularity_sqla"), Some(&Value::Null));
    assert_eq!(chart.capabilities.data_types, vec!["categorical", "metric"]);
    assert!(chart.warnings.iter().any(|w| w.advisor == "chart_type"));
}

#[test]
fn unsupported_chart_type_is_rejected() {
    let err = parse_chart_config(&json!({"chart_type": "pie"})).unwrap_err();
    assert!(matches!(
        err,
        ChartMapError::Validation(ValidationError::UnsupportedChartType { ref chart_type }) if chart_type == "pie"
    ));
}
