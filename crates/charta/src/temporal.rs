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
use crate::error::LookupResult;
use tracing::{debug, warn};
/// Outcome of looking a column up in its dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalVerdict {
    /// Engine type metadata decided.
    FromSqlType(bool),
    /// No usable type, the stored `is_dttm` flag decided.
    FromDttmFlag(bool),
    ColumnNotFound,
    DatasetNotFound,
}
impl TemporalVerdict {
    pub fn is_temporal(&self) -> bool {
        match self {
            TemporalVerdict::FromSqlType(temporal) | TemporalVerdict::FromDttmFlag(temporal) => {
                *temporal
            }
            TemporalVerdict::ColumnNotFound | TemporalVerdict::DatasetNotFound => true,
        }
    }
}
/// Classifies `column_name` against the dataset's column metadata.
///
/// A declared SQL type the engine recognises overrides the `is_dttm` flag,
/// which name heuristics can set on integer columns such as `year`.
pub fn classify_column(
    resolver: &dyn DatasetResolver,
    column_name: &str,
    dataset_id: &DatasetId,
) -> LookupResult<TemporalVerdict> {
    let Some(dataset) = resolver.find_by_id(dataset_id)? else {
        return Ok(TemporalVerdict::DatasetNotFound);
    };
    let Some(column) = dataset.find_column(column_name) else {
        return Ok(TemporalVerdict::ColumnNotFound);
    };
    let spec = column
        .sql_type
        .as_deref()
        .and_then(|sql_type| resolver.engine_spec(&dataset).get_column_spec(sql_type));
    Ok(match spec {
        Some(spec) => TemporalVerdict::FromSqlType(spec.is_temporal()),
        None => TemporalVerdict::FromDttmFlag(column.is_dttm),
    })
}
/// Fail-open wrapper over [`classify_column`]. Anything short of a definite
/// answer counts as temporal.
pub fn is_column_truly_temporal(
    resolver: &dyn DatasetResolver,
    column_name: &str,
    dataset_id: Option<&DatasetId>,
) -> bool {
    let Some(dataset_id) = dataset_id else {
        return true;
    };
    match classify_column(resolver, column_name, dataset_id) {
        Ok(verdict) => {
            debug!(column = column_name, dataset_id = %dataset_id, ?verdict, "Classified x-axis column");
            verdict.is_temporal()
        }
        Err(e) => {
            warn!(column = column_name, dataset_id = %dataset_id, error = %e, "Temporal lookup failed, assuming temporal");
            true
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Database, Dataset, DatasetColumn};
    use crate::error::LookupError;

    struct OneDataset(Dataset);
    impl DatasetResolver for OneDataset {
        fn find_by_id(&self, id: &DatasetId) -> LookupResult<Option<Dataset>> {
            Ok((id.as_numeric() == Some(self.0.id)).then(|| self.0.clone()))
        }
    }
    struct Broken;
    impl DatasetResolver for Broken {
        fn find_by_id(&self, _id: &DatasetId) -> LookupResult<Option<Dataset>> {
            Err(LookupError::MissingAttribute {
                dataset: "1".to_string(),
                attribute: "columns".to_string(),
            })
        }
    }

    fn resolver() -> OneDataset {
        OneDataset(Dataset {
            id: 1,
            uuid: None,
            table_name: "sales".to_string(),
            columns: vec![
                DatasetColumn::new("order_date", Some("TIMESTAMP"), false),
                DatasetColumn::new("year", Some("INTEGER"), true),
                DatasetColumn::new("legacy_ts", None, true),
                DatasetColumn::new("blob", Some("GEOMETRY"), false),
            ],
            database: Database::default(),
        })
    }

    #[test]
    fn missing_dataset_id_is_temporal() {
        assert!(is_column_truly_temporal(&resolver(), "year", None));
    }

    #[test]
    fn sql_type_overrides_dttm_flag() {
        let id = DatasetId::Numeric(1);
        assert!(!is_column_truly_temporal(&resolver(), "year", Some(&id)));
        assert!(is_column_truly_temporal(&resolver(), "ORDER_DATE", Some(&id)));
    }

    #[test]
    fn untyped_columns_use_dttm_flag() {
        let id = DatasetId::Numeric(1);
        assert_eq!(
            classify_column(&resolver(), "legacy_ts", &id).unwrap(),
            TemporalVerdict::FromDttmFlag(true)
        );
        assert!(!is_column_truly_temporal(&resolver(), "blob", Some(&id)));
    }

    #[test]
    fn unknown_column_and_dataset_fail_open() {
        assert!(is_column_truly_temporal(&resolver(), "nope", Some(&DatasetId::Numeric(1))));
        assert!(is_column_truly_temporal(&resolver(), "year", Some(&DatasetId::Numeric(2))));
    }

    #[test]
    fn lookup_errors_fail_open() {
        let id = DatasetId::Numeric(1);
        assert!(classify_column(&Broken, "year", &id).is_err());
        assert!(is_column_truly_temporal(&Broken, "year", Some(&id)));
    }
}
