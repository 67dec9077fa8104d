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

use crate::schema::{FilterConfig, FilterValue};
use serde::{Deserialize, Serialize};
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdhocFilter {
    pub clause: String,
    pub expression_type: String,
    pub subject: String,
    pub operator: String,
    pub comparator: FilterValue,
}
/// Unknown operators pass through unchanged so the executor can decide.
pub fn map_filter_operator(op: &str) -> String {
    match op {
        "=" => "==",
        ">" => ">",
        "<" => "<",
        ">=" => ">=",
        "<=" => "<=",
        "!=" => "!=",
        other => other,
    }
    .to_string()
}
pub fn map_filter(filter: &FilterConfig) -> AdhocFilter {
    AdhocFilter {
        clause: "WHERE".to_string(),
        expression_type: "SIMPLE".to_string(),
        subject: filter.column.clone(),
        operator: map_filter_operator(&filter.op),
        comparator: filter.value.clone(),
    }
}
pub fn map_filters(filters: &[Option<FilterConfig>]) -> Vec<AdhocFilter> {
    filters.iter().flatten().map(map_filter).collect()
}
