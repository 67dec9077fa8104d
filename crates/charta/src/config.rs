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

use crate::error::{ConfigError, ConfigResult};
use crate::schema::Aggregate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
pub const DEFAULT_BASE_URL: &str = "http://localhost:8088";
pub const ENV_BASE_URL: &str = "CHARTA_BASE_URL";
pub const ENV_MAX_METRICS: &str = "CHARTA_MAX_METRICS";
pub const ENV_MAX_TABLE_COLUMNS: &str = "CHARTA_MAX_TABLE_COLUMNS";
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub base_url: String,
    pub advisor: AdvisorConfig,
    pub preview: PreviewConfig,
}
impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            advisor: AdvisorConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Column-name fragments that suggest one distinct value per row.
    pub high_cardinality_patterns: Vec<String>,
    pub max_metrics: usize,
    pub max_table_columns: usize,
    pub expensive_aggregates: Vec<Aggregate>,
}
impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            high_cardinality_patterns: [
                "id", "uuid", "guid", "email", "ip", "timestamp", "session", "token", "hash",
                "phone", "address", "url",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            max_metrics: 5,
            max_table_columns: 20,
            expensive_aggregates: vec![
                Aggregate::CountDistinct,
                Aggregate::Median,
                Aggregate::Percentile,
            ],
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    pub ascii_width: usize,
    pub max_rows: usize,
    pub max_columns: usize,
}
impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            ascii_width: 80,
            max_rows: 15,
            max_columns: 6,
        }
    }
}
fn parse_env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
}
impl MapperConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileError {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), base_url = %config.base_url, "Loaded mapper configuration");
        Ok(config)
    }
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
    /// Applies `CHARTA_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> ConfigResult<Self> {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            debug!(base_url = %base_url, "Base URL overridden from environment");
            self.base_url = base_url;
        }
        if let Some(max_metrics) = parse_env_usize(ENV_MAX_METRICS) {
            self.advisor.max_metrics = max_metrics;
        }
        if let Some(max_columns) = parse_env_usize(ENV_MAX_TABLE_COLUMNS) {
            self.advisor.max_table_columns = max_columns;
        }
        self.validate()?;
        Ok(self)
    }
    pub fn validate(&self) -> ConfigResult<()> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
            });
        }
        self.advisor.validate()?;
        self.preview.validate()
    }
    /// Tighter limits, for shared deployments.
    pub fn strict() -> Self {
        Self {
            advisor: AdvisorConfig {
                max_metrics: 3,
                max_table_columns: 10,
                ..Default::default()
            },
            ..Default::default()
        }
    }
    pub fn lenient() -> Self {
        Self {
            advisor: AdvisorConfig {
                max_metrics: 10,
                max_table_columns: 50,
                expensive_aggregates: Vec::new(),
                ..Default::default()
            },
            preview: PreviewConfig {
                max_rows: 50,
                max_columns: 10,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
impl AdvisorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_metrics == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "advisor.max_metrics must be greater than 0".to_string(),
            });
        }
        if self.max_table_columns == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "advisor.max_table_columns must be greater than 0".to_string(),
            });
        }
        for pattern in &self.high_cardinality_patterns {
            if pattern.trim().is_empty() {
                return Err(ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: "pattern must not be blank".to_string(),
                });
            }
        }
        Ok(())
    }
}
impl PreviewConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "preview width and height must be greater than 0".to_string(),
            });
        }
        if self.max_rows == 0 || self.max_columns == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "preview.max_rows and preview.max_columns must be greater than 0".to_string(),
            });
        }
        if self.ascii_width < 20 {
            return Err(ConfigError::InvalidValue {
                field: "preview.ascii_width".to_string(),
                value: self.ascii_width.to_string(),
            });
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = MapperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url, "http://localhost:8088");
        assert_eq!(config.advisor.max_metrics, 5);
        assert_eq!(config.preview.max_rows, 15);
    }

    #[test]
    fn presets_validate() {
        assert!(MapperConfig::strict().validate().is_ok());
        assert!(MapperConfig::lenient().validate().is_ok());
        assert!(MapperConfig::strict().advisor.max_metrics < MapperConfig::lenient().advisor.max_metrics);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = MapperConfig::from_yaml_str(
            "base_url: https://bi.example.com\nadvisor:\n  max_metrics: 2\n  expensive_aggregates: [MEDIAN]\n",
        )
        .unwrap();
        assert_eq!(config.base_url, "https://bi.example.com");
        assert_eq!(config.advisor.max_metrics, 2);
        assert_eq!(config.advisor.max_table_columns, 20);
        assert_eq!(config.advisor.expensive_aggregates, vec![Aggregate::Median]);
        assert_eq!(config.preview.width, 400);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            MapperConfig::from_yaml_str("base_url: ftp://nope\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            MapperConfig::from_yaml_str("advisor:\n  max_metrics: 0\n"),
            Err(ConfigError::ValidationFailed { .. })
        ));
        assert!(matches!(
            MapperConfig::from_yaml_str("advisor: [1, 2"),
            Err(ConfigError::YamlParseError { .. })
        ));
    }
}
