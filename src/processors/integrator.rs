use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row, KEY_COLUMN};
use crate::writers::TableWriter;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// How an auxiliary table is joined onto the base table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Left,
    Right,
    Outer,
    Inner,
}

/// Declarative merge recipe for one auxiliary dataset.
///
/// Deserialized from the integration configuration document, one entry per
/// source file. `flag_label` also accepts the legacy `label` key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Auxiliary columns carried into the result. An entirely empty recipe
    /// (no columns, no flag, no mappings) carries every non-id column.
    pub columns: Vec<String>,

    /// Add a boolean presence column instead of / in addition to `columns`.
    pub flag: bool,

    /// Name of the presence column; required when `flag` is set.
    #[serde(alias = "label")]
    pub flag_label: Option<String>,

    pub how: JoinType,

    /// Null values in each base column (key) are filled from the matched
    /// auxiliary column (value) after the join.
    pub columns_to_map: BTreeMap<String, String>,
}

impl MergeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.flag && self.flag_label.as_deref().map_or(true, str::is_empty) {
            return Err(IntegrationError::Config(
                "flag requested without a flag_label".to_string(),
            ));
        }
        Ok(())
    }

    fn carries_everything(&self) -> bool {
        self.columns.is_empty() && !self.flag && self.columns_to_map.is_empty()
    }
}

/// Owns the growing integrated table and applies one auxiliary dataset at a
/// time under a [`MergeConfig`].
///
/// Every merge computes the exact output column set before joining, so
/// auxiliary columns can never collide into or silently overwrite base
/// columns. A failed call leaves the base table untouched.
pub struct DataIntegrator {
    base: DataTable,
}

impl DataIntegrator {
    pub fn new(base: DataTable) -> Result<Self> {
        if !base.has_column(KEY_COLUMN) {
            return Err(IntegrationError::MissingKey {
                table: "reference".to_string(),
            });
        }
        Ok(Self { base })
    }

    /// Merge one auxiliary table into the base table.
    pub fn add_data(&mut self, mut aux: DataTable, config: &MergeConfig) -> Result<()> {
        config.validate()?;
        if !aux.has_column(KEY_COLUMN) {
            return Err(IntegrationError::MissingKey {
                table: "auxiliary".to_string(),
            });
        }

        if let Some(label) = config.flag_label.as_deref().filter(|_| config.flag) {
            if self.base.has_column(label) {
                return Err(IntegrationError::Config(format!(
                    "flag_label '{}' collides with an existing column",
                    label
                )));
            }
            aux.fill_column(label, Value::Bool(true));
        }

        let carried = self.carried_columns(&aux, config);
        let mappings = Self::mapping_pairs(&aux, config);

        // Exact output layout, fixed before any row is built.
        let mut columns: Vec<String> = self.base.columns().to_vec();
        columns.extend(carried.iter().cloned());
        for (base_col, _) in &mappings {
            if !columns.contains(base_col) {
                debug!(column = %base_col, "mapping target absent from base table; creating it");
                columns.push(base_col.clone());
            }
        }

        let rows = self.join_rows(&aux, config, &carried, &mappings);

        self.base = DataTable::from_parts(columns, rows);
        Ok(())
    }

    /// Read-only snapshot of the integrated table.
    pub fn get_integrated_data(&self) -> DataTable {
        self.base.clone()
    }

    /// Serialize the integrated table; format selected from the path suffix.
    pub fn save_integrated(&self, path: &Path) -> Result<()> {
        TableWriter::new().write(&self.base, path)
    }

    /// Auxiliary columns that survive into the result, in auxiliary column
    /// order. Collisions with existing base columns are dropped, never
    /// overwritten; their values stay reachable through `columns_to_map`.
    fn carried_columns(&self, aux: &DataTable, config: &MergeConfig) -> Vec<String> {
        let wanted: Vec<&str> = if config.carries_everything() {
            aux.columns().iter().map(String::as_str).collect()
        } else {
            let mut names: Vec<&str> = config.columns.iter().map(String::as_str).collect();
            for name in &config.columns {
                if !aux.has_column(name) {
                    warn!(column = %name, "configured column is absent from the auxiliary table");
                }
            }
            names.retain(|name| aux.has_column(name));
            if let Some(label) = config.flag_label.as_deref().filter(|_| config.flag) {
                if !names.contains(&label) {
                    names.push(label);
                }
            }
            names
        };

        wanted
            .into_iter()
            .filter(|name| *name != KEY_COLUMN)
            .filter(|name| {
                if self.base.has_column(name) {
                    warn!(
                        column = %name,
                        "auxiliary column collides with an existing base column; keeping the base values"
                    );
                    false
                } else {
                    true
                }
            })
            .map(String::from)
            .collect()
    }

    fn mapping_pairs(aux: &DataTable, config: &MergeConfig) -> Vec<(String, String)> {
        config
            .columns_to_map
            .iter()
            .filter(|(_, aux_col)| {
                if aux.has_column(aux_col) {
                    true
                } else {
                    warn!(column = %aux_col, "mapping source is absent from the auxiliary table");
                    false
                }
            })
            .map(|(base_col, aux_col)| (base_col.clone(), aux_col.clone()))
            .collect()
    }

    fn join_rows(
        &self,
        aux: &DataTable,
        config: &MergeConfig,
        carried: &[String],
        mappings: &[(String, String)],
    ) -> Vec<Row> {
        let aux_index = aux.key_index();
        let flag_label = config.flag_label.as_deref().filter(|_| config.flag);

        let matched = |base_row: &Row, aux_row: &Row| -> Row {
            let mut row = base_row.clone();
            for column in carried {
                row.insert(
                    column.clone(),
                    aux_row.get(column).cloned().unwrap_or(Value::Null),
                );
            }
            Self::coalesce(&mut row, Some(aux_row), mappings);
            row
        };

        let base_only = |base_row: &Row| -> Row {
            let mut row = base_row.clone();
            for column in carried {
                // Flag completion: absence from the auxiliary table reads as
                // false, never null. Other carried columns stay null.
                let filler = if Some(column.as_str()) == flag_label {
                    Value::Bool(false)
                } else {
                    Value::Null
                };
                row.insert(column.clone(), filler);
            }
            Self::coalesce(&mut row, None, mappings);
            row
        };

        let aux_only = |aux_row: &Row| -> Row {
            let mut row = Row::new();
            row.insert(
                KEY_COLUMN.to_string(),
                aux_row.get(KEY_COLUMN).cloned().unwrap_or(Value::Null),
            );
            for column in carried {
                row.insert(
                    column.clone(),
                    aux_row.get(column).cloned().unwrap_or(Value::Null),
                );
            }
            Self::coalesce(&mut row, Some(aux_row), mappings);
            row
        };

        let mut rows = Vec::new();
        match config.how {
            JoinType::Left | JoinType::Outer => {
                for base_row in self.base.rows() {
                    match Self::matches(&aux_index, base_row) {
                        Some(indices) => {
                            for &i in indices {
                                rows.push(matched(base_row, &aux.rows()[i]));
                            }
                        }
                        None => rows.push(base_only(base_row)),
                    }
                }
                if config.how == JoinType::Outer {
                    let base_index = self.base.key_index();
                    for aux_row in aux.rows() {
                        if Self::matches(&base_index, aux_row).is_none() {
                            rows.push(aux_only(aux_row));
                        }
                    }
                }
            }
            JoinType::Inner => {
                for base_row in self.base.rows() {
                    if let Some(indices) = Self::matches(&aux_index, base_row) {
                        for &i in indices {
                            rows.push(matched(base_row, &aux.rows()[i]));
                        }
                    }
                }
            }
            JoinType::Right => {
                let base_index = self.base.key_index();
                for aux_row in aux.rows() {
                    match Self::matches(&base_index, aux_row) {
                        Some(indices) => {
                            for &i in indices {
                                rows.push(matched(&self.base.rows()[i], aux_row));
                            }
                        }
                        None => rows.push(aux_only(aux_row)),
                    }
                }
            }
        }
        rows
    }

    fn matches<'a>(
        index: &'a std::collections::HashMap<String, Vec<usize>>,
        row: &Row,
    ) -> Option<&'a Vec<usize>> {
        row.get(KEY_COLUMN)
            .and_then(DataTable::value_key)
            .and_then(|key| index.get(&key))
    }

    /// Fill null mapping targets from the matched auxiliary row.
    fn coalesce(row: &mut Row, aux_row: Option<&Row>, mappings: &[(String, String)]) {
        for (base_col, aux_col) in mappings {
            let base_is_null = row.get(base_col).map_or(true, Value::is_null);
            if !base_is_null {
                continue;
            }
            let fill = aux_row
                .and_then(|r| r.get(aux_col))
                .cloned()
                .unwrap_or(Value::Null);
            row.insert(base_col.clone(), fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table(columns: &[&str], rows: &[&[(&str, Value)]]) -> DataTable {
        let mut t = DataTable::with_columns(columns.to_vec());
        for row in rows {
            t.push_row(
                row.iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
        }
        t
    }

    fn base_two_genes() -> DataTable {
        table(
            &["id"],
            &[&[("id", json!("G1"))], &[("id", json!("G2"))]],
        )
    }

    fn aux_score() -> DataTable {
        table(
            &["id", "score"],
            &[&[("id", json!("G1")), ("score", json!(5))]],
        )
    }

    #[test]
    fn test_left_join_carries_columns() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            ..Default::default()
        };

        integrator.add_data(aux_score(), &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.len(), 2);
        assert_eq!(result.columns(), &["id", "score"]);
        assert_eq!(result.get(0, "score"), &json!(5));
        assert_eq!(result.get(1, "score"), &Value::Null);
    }

    #[test]
    fn test_left_join_preserves_row_count() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let before = integrator.get_integrated_data().len();

        let config = MergeConfig {
            columns: vec!["score".to_string()],
            ..Default::default()
        };
        integrator.add_data(aux_score(), &config).unwrap();

        assert_eq!(integrator.get_integrated_data().len(), before);
    }

    #[test]
    fn test_flag_is_always_boolean() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let config = MergeConfig {
            flag: true,
            flag_label: Some("has_score".to_string()),
            ..Default::default()
        };

        integrator.add_data(aux_score(), &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.get(0, "has_score"), &json!(true));
        assert_eq!(result.get(1, "has_score"), &json!(false));
        // The score column was not whitelisted and must not leak through.
        assert!(!result.has_column("score"));
    }

    #[test]
    fn test_flag_without_label_is_config_error() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let config = MergeConfig {
            flag: true,
            ..Default::default()
        };

        let err = integrator.add_data(aux_score(), &config).unwrap_err();
        assert!(matches!(err, IntegrationError::Config(_)));
        // Failed validation leaves the base table untouched.
        assert_eq!(integrator.get_integrated_data(), base_two_genes());
    }

    #[test]
    fn test_missing_key_column_is_rejected() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let aux = table(&["score"], &[&[("score", json!(5))]]);

        let err = integrator.add_data(aux, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, IntegrationError::MissingKey { .. }));
        assert_eq!(integrator.get_integrated_data(), base_two_genes());
    }

    #[test]
    fn test_coalesce_fills_nulls_only() {
        let base = table(
            &["id", "x"],
            &[
                &[("id", json!("G1")), ("x", Value::Null)],
                &[("id", json!("G2")), ("x", json!(1))],
            ],
        );
        let aux = table(
            &["id", "y"],
            &[
                &[("id", json!("G1")), ("y", json!(7))],
                &[("id", json!("G2")), ("y", json!(9))],
            ],
        );

        let mut integrator = DataIntegrator::new(base).unwrap();
        let config = MergeConfig {
            columns_to_map: BTreeMap::from([("x".to_string(), "y".to_string())]),
            ..Default::default()
        };
        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.get(0, "x"), &json!(7));
        assert_eq!(result.get(1, "x"), &json!(1));
        // The mapping source never appears in the result.
        assert!(!result.has_column("y"));
    }

    #[test]
    fn test_whitelist_is_exhaustive() {
        let base = base_two_genes();
        let aux = table(
            &["id", "score", "noise", "more_noise"],
            &[&[
                ("id", json!("G1")),
                ("score", json!(5)),
                ("noise", json!("x")),
                ("more_noise", json!("y")),
            ]],
        );

        let mut integrator = DataIntegrator::new(base).unwrap();
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            ..Default::default()
        };
        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.columns(), &["id", "score"]);
    }

    #[test]
    fn test_empty_config_carries_all_columns() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let aux = table(
            &["id", "a", "b"],
            &[&[("id", json!("G1")), ("a", json!(1)), ("b", json!(2))]],
        );

        integrator.add_data(aux, &MergeConfig::default()).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.columns(), &["id", "a", "b"]);
        assert_eq!(result.get(0, "a"), &json!(1));
        assert_eq!(result.get(1, "a"), &Value::Null);
    }

    #[test]
    fn test_inner_join_drops_unmatched_rows() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            how: JoinType::Inner,
            ..Default::default()
        };

        integrator.add_data(aux_score(), &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0, "id"), &json!("G1"));
    }

    #[test]
    fn test_outer_join_appends_new_keys() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let aux = table(
            &["id", "score"],
            &[
                &[("id", json!("G1")), ("score", json!(5))],
                &[("id", json!("G9")), ("score", json!(3))],
            ],
        );
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            how: JoinType::Outer,
            ..Default::default()
        };

        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.len(), 3);
        assert_eq!(result.get(2, "id"), &json!("G9"));
        assert_eq!(result.get(2, "score"), &json!(3));
    }

    #[test]
    fn test_outer_join_flag_true_for_appended_keys() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let aux = table(&["id"], &[&[("id", json!("G9"))]]);
        let config = MergeConfig {
            flag: true,
            flag_label: Some("present".to_string()),
            how: JoinType::Outer,
            ..Default::default()
        };

        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.len(), 3);
        assert_eq!(result.get(0, "present"), &json!(false));
        assert_eq!(result.get(1, "present"), &json!(false));
        assert_eq!(result.get(2, "present"), &json!(true));
    }

    #[test]
    fn test_right_join_keeps_all_aux_rows() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let aux = table(
            &["id", "score"],
            &[
                &[("id", json!("G2")), ("score", json!(1))],
                &[("id", json!("G9")), ("score", json!(2))],
            ],
        );
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            how: JoinType::Right,
            ..Default::default()
        };

        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.len(), 2);
        assert_eq!(result.get(0, "id"), &json!("G2"));
        assert_eq!(result.get(1, "id"), &json!("G9"));
    }

    #[test]
    fn test_duplicate_aux_keys_duplicate_base_rows() {
        let mut integrator = DataIntegrator::new(base_two_genes()).unwrap();
        let aux = table(
            &["id", "score"],
            &[
                &[("id", json!("G1")), ("score", json!(5))],
                &[("id", json!("G1")), ("score", json!(6))],
            ],
        );
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            ..Default::default()
        };

        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.len(), 3);
        assert_eq!(result.get(0, "score"), &json!(5));
        assert_eq!(result.get(1, "score"), &json!(6));
    }

    #[test]
    fn test_colliding_column_keeps_base_values() {
        let base = table(
            &["id", "name"],
            &[&[("id", json!("G1")), ("name", json!("ACE2"))]],
        );
        let aux = table(
            &["id", "name"],
            &[&[("id", json!("G1")), ("name", json!("other"))]],
        );

        let mut integrator = DataIntegrator::new(base).unwrap();
        let config = MergeConfig {
            columns: vec!["name".to_string()],
            ..Default::default()
        };
        integrator.add_data(aux, &config).unwrap();
        let result = integrator.get_integrated_data();

        assert_eq!(result.columns(), &["id", "name"]);
        assert_eq!(result.get(0, "name"), &json!("ACE2"));
    }

    #[test]
    fn test_flag_label_collision_is_config_error() {
        let base = table(
            &["id", "present"],
            &[&[("id", json!("G1")), ("present", json!(true))]],
        );
        let mut integrator = DataIntegrator::new(base).unwrap();
        let config = MergeConfig {
            flag: true,
            flag_label: Some("present".to_string()),
            ..Default::default()
        };

        let err = integrator.add_data(aux_score(), &config).unwrap_err();
        assert!(matches!(err, IntegrationError::Config(_)));
    }

    #[test]
    fn test_add_data_is_idempotent_across_copies() {
        let aux = aux_score();
        let config = MergeConfig {
            columns: vec!["score".to_string()],
            flag: true,
            flag_label: Some("has_score".to_string()),
            how: JoinType::Outer,
            ..Default::default()
        };

        let mut first = DataIntegrator::new(base_two_genes()).unwrap();
        first.add_data(aux.clone(), &config).unwrap();

        let mut second = DataIntegrator::new(base_two_genes()).unwrap();
        second.add_data(aux, &config).unwrap();

        assert_eq!(first.get_integrated_data(), second.get_integrated_data());
    }

    #[test]
    fn test_config_deserialization_defaults() {
        let config: MergeConfig = serde_json::from_str(
            r#"{"columns": [], "flag": true, "label": "COVID-19 UniprotKB", "how": "outer"}"#,
        )
        .unwrap();

        assert!(config.flag);
        assert_eq!(config.flag_label.as_deref(), Some("COVID-19 UniprotKB"));
        assert_eq!(config.how, JoinType::Outer);
        assert!(config.validate().is_ok());

        let config: MergeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.how, JoinType::Left);

        assert!(serde_json::from_str::<MergeConfig>(r#"{"unknown_option": 1}"#).is_err());
    }
}
