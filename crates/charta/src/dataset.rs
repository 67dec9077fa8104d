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

//! Read-only view of datasets and their column metadata.
//!
//! The mapper never owns datasets. It reaches them through [`DatasetResolver`],
//! which a host application implements over its own persistence layer.
//! [`InMemoryDatasetRegistry`] is a YAML-backed resolver for tests and demos.

use crate::error::{LookupError, LookupResult};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum DatasetId {
    Numeric(i64),
    Uuid(Uuid),
}
impl DatasetId {
    pub fn parse(value: &str) -> LookupResult<Self> {
        let trimmed = value.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(DatasetId::Numeric(id));
        }
        Uuid::parse_str(trimmed)
            .map(DatasetId::Uuid)
            .map_err(|_| LookupError::InvalidIdentifier {
                value: value.to_string(),
            })
    }
    /// Column the persistence layer should match against.
    pub fn id_column(&self) -> &'static str {
        match self {
            DatasetId::Numeric(_) => "id",
            DatasetId::Uuid(_) => "uuid",
        }
    }
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            DatasetId::Numeric(id) => Some(*id),
            DatasetId::Uuid(_) => None,
        }
    }
}
impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetId::Numeric(id) => write!(f, "{id}"),
            DatasetId::Uuid(uuid) => write!(f, "{uuid}"),
        }
    }
}
impl From<i64> for DatasetId {
    fn from(id: i64) -> Self {
        DatasetId::Numeric(id)
    }
}
impl<'de> Deserialize<'de> for DatasetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(DatasetId::Numeric(id)),
            Raw::Text(text) => DatasetId::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenericDataType {
    Numeric,
    String,
    Temporal,
    Boolean,
}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub sql_type: String,
    pub generic_type: GenericDataType,
}
impl ColumnSpec {
    pub fn is_temporal(&self) -> bool {
        self.generic_type == GenericDataType::Temporal
    }
}
/// Engine-specific knowledge about native SQL types.
pub trait EngineSpec: Send + Sync {
    fn get_column_spec(&self, native_type: &str) -> Option<ColumnSpec>;
}
static TYPE_MAPPINGS: Lazy<Vec<(Regex, GenericDataType)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)^\s*bool(ean)?\s*$").unwrap(),
            GenericDataType::Boolean,
        ),
        (
            Regex::new(r"(?i)^\s*(date|datetime|datetime2|datetime64|datetimeoffset|smalldatetime|timestamp|timestamptz|timestamp_ntz|timestamp_ltz|timestamp_tz|time|timetz)\b").unwrap(),
            GenericDataType::Temporal,
        ),
        (
            Regex::new(r"(?i)^\s*(tinyint|smallint|mediumint|int|integer|bigint|hugeint|int2|int4|int8|u?int(8|16|32|64|128|256)|serial|bigserial|long)\b").unwrap(),
            GenericDataType::Numeric,
        ),
        (
            Regex::new(r"(?i)^\s*(decimal|numeric|number|float|float4|float8|float32|float64|double|real|money)\b").unwrap(),
            GenericDataType::Numeric,
        ),
        (
            Regex::new(r"(?i)^\s*(char|character|varchar|nchar|nvarchar|varchar2|text|string|clob|uuid|json|jsonb|enum)\b").unwrap(),
            GenericDataType::String,
        ),
    ]
});
/// Coarse native-type classification shared by all engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseEngineSpec;
impl EngineSpec for BaseEngineSpec {
    fn get_column_spec(&self, native_type: &str) -> Option<ColumnSpec> {
        TYPE_MAPPINGS
            .iter()
            .find(|(pattern, _)| pattern.is_match(native_type))
            .map(|(_, generic_type)| ColumnSpec {
                sql_type: native_type.to_string(),
                generic_type: *generic_type,
            })
    }
}
static BASE_ENGINE_SPEC: BaseEngineSpec = BaseEngineSpec;
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetColumn {
    pub column_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    #[serde(default)]
    pub is_dttm: bool,
}
impl DatasetColumn {
    pub fn new(column_name: impl Into<String>, sql_type: Option<&str>, is_dttm: bool) -> Self {
        Self {
            column_name: column_name.into(),
            sql_type: sql_type.map(str::to_string),
            is_dttm,
        }
    }
}
fn default_backend() -> String {
    "postgresql".to_string()
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_backend")]
    pub backend: String,
}
impl Default for Database {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<DatasetColumn>,
    #[serde(default)]
    pub database: Database,
}
impl Dataset {
    pub fn find_column(&self, name: &str) -> Option<&DatasetColumn> {
        let wanted = name.to_lowercase();
        self.columns
            .iter()
            .find(|column| column.column_name.to_lowercase() == wanted)
    }
}
/// Lookup contract over the host's dataset store.
pub trait DatasetResolver: Send + Sync {
    fn find_by_id(&self, id: &DatasetId) -> LookupResult<Option<Dataset>>;
    fn engine_spec(&self, _dataset: &Dataset) -> &dyn EngineSpec {
        &BASE_ENGINE_SPEC
    }
}
/// Resolver for callers without dataset access; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDatasets;
impl DatasetResolver for NoDatasets {
    fn find_by_id(&self, _id: &DatasetId) -> LookupResult<Option<Dataset>> {
        Ok(None)
    }
}
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    datasets: Vec<Dataset>,
}
#[derive(Debug, Default)]
pub struct InMemoryDatasetRegistry {
    datasets: HashMap<i64, Dataset>,
    ids_by_uuid: HashMap<Uuid, i64>,
}
impl InMemoryDatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read dataset registry file: {}",
                path.as_ref().display()
            )
        })?;
        Self::from_yaml_str(&content)
    }
    pub fn from_yaml_str(yaml_content: &str) -> Result<Self> {
        let file: RegistryFile =
            serde_yaml::from_str(yaml_content).context("Failed to parse dataset registry YAML")?;
        let mut registry = Self::new();
        for dataset in file.datasets {
            if registry.datasets.contains_key(&dataset.id) {
                anyhow::bail!("Duplicate dataset id found: {}", dataset.id);
            }
            registry.insert(dataset);
        }
        Ok(registry)
    }
    pub fn insert(&mut self, dataset: Dataset) {
        if let Some(uuid) = dataset.uuid {
            self.ids_by_uuid.insert(uuid, dataset.id);
        }
        self.datasets.insert(dataset.id, dataset);
    }
    pub fn len(&self) -> usize {
        self.datasets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
impl DatasetResolver for InMemoryDatasetRegistry {
    fn find_by_id(&self, id: &DatasetId) -> LookupResult<Option<Dataset>> {
        let numeric = match id {
            DatasetId::Numeric(id) => Some(*id),
            DatasetId::Uuid(uuid) => self.ids_by_uuid.get(uuid).copied(),
        };
        Ok(numeric.and_then(|id| self.datasets.get(&id)).cloned())
    }
}
