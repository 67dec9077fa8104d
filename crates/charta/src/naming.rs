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

//! Default chart titles and shareable explore links.

use crate::dataset::{DatasetId, DatasetResolver};
use crate::error::{CacheError, CacheResult, LookupResult, Result};
use crate::form_data::FormData;
use crate::schema::ChartConfig;
use dashmap::DashMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?');
pub fn generate_chart_name(config: &ChartConfig) -> String {
    match config {
        ChartConfig::Table(table) => {
            let columns: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            format!("Table Chart - {}", columns.join(", "))
        }
        ChartConfig::Xy(xy) => {
            let metrics: Vec<&str> = xy.y.iter().map(|c| c.name.as_str()).collect();
            format!(
                "{} Chart - {} vs {}",
                xy.kind.display_name(),
                xy.x.name,
                metrics.join(", ")
            )
        }
    }
}
/// Entry persisted in the explore form-data cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDataEntry {
    pub datasource_id: i64,
    pub datasource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<i64>,
    /// JSON-encoded form data.
    pub form_data: String,
}
impl FormDataEntry {
    pub fn for_table(datasource_id: i64, form_data: &FormData) -> Result<Self> {
        Ok(Self {
            datasource_id,
            datasource_type: "table".to_string(),
            chart_id: None,
            form_data: form_data.to_json_string()?,
        })
    }
}
/// Key/value store the explore view reads `form_data_key` from.
pub trait FormDataCache: Send + Sync {
    fn create(&self, entry: &FormDataEntry) -> CacheResult<String>;
}
#[derive(Debug, Default)]
pub struct InMemoryFormDataCache {
    entries: DashMap<String, FormDataEntry>,
}
impl InMemoryFormDataCache {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, key: &str) -> CacheResult<FormDataEntry> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CacheError::KeyNotFound {
                key: key.to_string(),
            })
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl FormDataCache for InMemoryFormDataCache {
    fn create(&self, entry: &FormDataEntry) -> CacheResult<String> {
        let key = Uuid::new_v4().simple().to_string();
        self.entries.insert(key.clone(), entry.clone());
        Ok(key)
    }
}
fn explore_base(base_url: &str) -> String {
    format!("{}/explore/", base_url.trim_end_matches('/'))
}
pub fn datasource_explore_link(base_url: &str, datasource_id: &str) -> String {
    format!(
        "{}?datasource_type=table&datasource_id={}",
        explore_base(base_url),
        utf8_percent_encode(datasource_id.trim(), QUERY_VALUE)
    )
}
/// Numeric id of the dataset behind `raw_dataset_id`, if it exists.
pub fn resolve_numeric_id(
    resolver: &dyn DatasetResolver,
    raw_dataset_id: &str,
) -> LookupResult<Option<i64>> {
    let id = DatasetId::parse(raw_dataset_id)?;
    Ok(resolver.find_by_id(&id)?.map(|dataset| dataset.id))
}
pub fn try_cached_explore_link(
    cache: &dyn FormDataCache,
    base_url: &str,
    datasource_id: i64,
    form_data: &FormData,
) -> Result<String> {
    let entry = FormDataEntry::for_table(datasource_id, form_data)?;
    let key = cache.create(&entry)?;
    Ok(format!("{}?form_data_key={}", explore_base(base_url), key))
}
/// Always returns a usable link. Lookup and cache failures degrade to a
/// plain datasource link.
pub fn generate_explore_link(
    resolver: &dyn DatasetResolver,
    cache: &dyn FormDataCache,
    base_url: &str,
    raw_dataset_id: &str,
    form_data: &FormData,
) -> String {
    let resolved = match resolve_numeric_id(resolver, raw_dataset_id) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(dataset_id = raw_dataset_id, error = %e, "Dataset lookup failed for explore link");
            None
        }
    };
    let Some(datasource_id) = resolved else {
        debug!(dataset_id = raw_dataset_id, "Dataset not resolved, using datasource link");
        return datasource_explore_link(base_url, raw_dataset_id);
    };
    match try_cached_explore_link(cache, base_url, datasource_id, form_data) {
        Ok(link) => link,
        Err(e) => {
            warn!(datasource_id, error = %e, "Failed to cache form data for explore link");
            datasource_explore_link(base_url, &datasource_id.to_string())
        }
    }
}
