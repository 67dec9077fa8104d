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

use charta::config::{ENV_BASE_URL, ENV_MAX_METRICS};
use charta::error::ConfigError;
use charta::{ChartMapper, DatasetId, DatasetResolver, InMemoryDatasetRegistry, InMemoryFormDataCache, MapperConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_mapper_config_from_file() {
    let file = write_temp(
        "base_url: https://superset.example.org\nadvisor:\n  max_metrics: 4\n  high_cardinality_patterns: [id, email]\npreview:\n  max_rows: 25\n",
    );
    let config = MapperConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.base_url, "https://superset.example.org");
    assert_eq!(config.advisor.max_metrics, 4);
    assert_eq!(config.advisor.high_cardinality_patterns, vec!["id", "email"]);
    assert_eq!(config.preview.max_rows, 25);
    assert_eq!(config.preview.max_columns, 6);
}

#[test]
fn missing_config_file_is_a_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MapperConfig::from_yaml_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileError { .. }));
}

#[test]
fn environment_overrides_file_values() {
    std::env::set_var(ENV_BASE_URL, "https://override.example.org");
    std::env::set_var(ENV_MAX_METRICS, "not-a-number");
    let config = MapperConfig::default().with_env_overrides().unwrap();
    assert_eq!(config.base_url, "https://override.example.org");
    assert_eq!(config.advisor.max_metrics, 5);
    std::env::set_var(ENV_MAX_METRICS, "2");
    let config = MapperConfig::default().with_env_overrides().unwrap();
    assert_eq!(config.advisor.max_metrics, 2);
    std::env::set_var(ENV_BASE_URL, "not a url");
    assert!(MapperConfig::default().with_env_overrides().is_err());
    std::env::remove_var(ENV_BASE_URL);
    std::env::remove_var(ENV_MAX_METRICS);
}

#[test]
fn loads_dataset_registry_from_file() {
    let file = write_temp(
        "datasets:\n  - id: 11\n    table_name: events\n    columns:\n      - column_name: created_at\n        type: TIMESTAMP\n",
    );
    let registry = InMemoryDatasetRegistry::from_yaml_file(file.path()).unwrap();
    assert_eq!(registry.len(), 1);
    let dataset = registry.find_by_id(&DatasetId::Numeric(11)).unwrap().unwrap();
    assert_eq!(dataset.table_name, "events");
    assert_eq!(dataset.database.backend, "postgresql");

    let mapper = ChartMapper::new(registry, InMemoryFormDataCache::new(), MapperConfig::default());
    let link = mapper.explore_link("11", &Default::default());
    assert!(link.starts_with("http://localhost:8088/explore/?form_data_key="));
}

#[test]
fn duplicate_dataset_ids_are_rejected() {
    let file = write_temp("datasets:\n  - id: 1\n  - id: 1\n");
    let err = InMemoryDatasetRegistry::from_yaml_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Duplicate dataset id"));
}
