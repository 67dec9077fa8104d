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

pub mod advisor;
pub mod capabilities;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod filters;
pub mod form_data;
pub mod mapper;
pub mod metrics;
pub mod naming;
pub mod preview;
pub mod schema;
pub mod table;
pub mod temporal;
pub mod xy;

#[cfg(feature = "scheduler")]
pub mod scheduler;

pub use advisor::{analyze_chart, AdvisoryWarning, Advisor};
pub use capabilities::{analyze_chart_capabilities, analyze_chart_semantics, ChartCapabilities, ChartSemantics};
pub use config::{AdvisorConfig, MapperConfig, PreviewConfig};
pub use dataset::{
    Dataset, DatasetColumn, DatasetId, DatasetResolver, InMemoryDatasetRegistry, NoDatasets,
};
pub use diagnostics::{create_error_response, diagnose_raw_config, ErrorResponse};
pub use error::{ChartMapError, ErrorReporter, Result, ValidationError};
pub use form_data::FormData;
pub use mapper::{map_config_to_form_data, parse_chart_config};
pub use naming::{generate_chart_name, generate_explore_link, FormDataCache, InMemoryFormDataCache};
pub use preview::{render_preview, ChartPreview, PreviewFormat, QueryResult};
pub use schema::{ChartConfig, ChartKind, ColumnRef, FilterConfig, TableChartConfig, XyChartConfig};
#[cfg(feature = "scheduler")]
pub use scheduler::TaskManager;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};
/// Everything produced for one chart request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedChart {
    pub name: String,
    pub form_data: FormData,
    pub warnings: Vec<AdvisoryWarning>,
    pub capabilities: ChartCapabilities,
    pub semantics: ChartSemantics,
    pub generated_at: DateTime<Utc>,
}
impl GeneratedChart {
    pub fn viz_type(&self) -> Option<&str> {
        self.form_data.viz_type()
    }
}
pub struct ChartMapper<R: DatasetResolver, C: FormDataCache> {
    resolver: R,
    cache: C,
    config: MapperConfig,
}
impl<R: DatasetResolver, C: FormDataCache> ChartMapper<R, C> {
    pub fn new(resolver: R, cache: C, config: MapperConfig) -> Self {
        Self {
            resolver,
            cache,
            config,
        }
    }
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }
    pub fn resolver(&self) -> &R {
        &self.resolver
    }
    pub fn cache(&self) -> &C {
        &self.cache
    }
    pub fn generate(&self, config: &ChartConfig, dataset_id: Option<&DatasetId>) -> Result<GeneratedChart> {
        config.validate()?;
        let (x_is_temporal, form_data) = match config {
            ChartConfig::Xy(xy_config) => {
                let verdict = temporal::is_column_truly_temporal(&self.resolver, &xy_config.x.name, dataset_id);
                (Some(verdict), xy::map_xy_config_with_verdict(xy_config, verdict)?)
            }
            ChartConfig::Table(table) => (None, table::map_table_config(table)?),
        };
        let chart = GeneratedChart {
            name: generate_chart_name(config),
            warnings: analyze_chart(config, &self.config.advisor, x_is_temporal),
            capabilities: analyze_chart_capabilities(config, x_is_temporal),
            semantics: analyze_chart_semantics(config),
            form_data,
            generated_at: Utc::now(),
        };
        info!(
            chart_type = config.chart_type(),
            viz_type = chart.viz_type().unwrap_or("unknown"),
            warnings = chart.warnings.len(),
            "Generated chart form data"
        );
        Ok(chart)
    }
    /// Parses, validates and maps loosely-typed input, returning the
    /// structured error envelope on any failure.
    pub fn generate_from_value(
        &self,
        raw: &Value,
        dataset_id: Option<&str>,
    ) -> std::result::Result<GeneratedChart, ErrorResponse> {
        let started = Instant::now();
        let attempt = || -> Result<GeneratedChart> {
            let config = parse_chart_config(raw)?;
            let dataset_id = dataset_id.map(DatasetId::parse).transpose()?;
            self.generate(&config, dataset_id.as_ref())
        };
        attempt().map_err(|e| create_error_response(&e, started, Some(raw)))
    }
    pub fn explore_link(&self, raw_dataset_id: &str, form_data: &FormData) -> String {
        generate_explore_link(
            &self.resolver,
            &self.cache,
            &self.config.base_url,
            raw_dataset_id,
            form_data,
        )
    }
    pub fn preview(&self, format: PreviewFormat, chart: &GeneratedChart, result: &QueryResult) -> ChartPreview {
        debug!(?format, rows = result.data.len(), "Rendering preview");
        render_preview(
            format,
            chart.viz_type().unwrap_or("table"),
            &chart.name,
            result,
            &self.config.preview,
        )
    }
}
impl Default for ChartMapper<NoDatasets, InMemoryFormDataCache> {
    fn default() -> Self {
        Self::new(NoDatasets, InMemoryFormDataCache::new(), MapperConfig::default())
    }
}
