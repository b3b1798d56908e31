//! In-memory panel dataset keyed by a two-level (entity, time) index.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};

/// Column-oriented panel data. Entities and times are interned to dense ids
/// at load time; value columns are f64.
#[derive(Debug, Clone, Default)]
pub struct PanelData {
    entity_ids: Vec<u64>,
    time_ids: Vec<u64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl PanelData {
    /// Build from parallel index vectors and named value columns.
    pub fn new(
        entity_ids: Vec<u64>,
        time_ids: Vec<u64>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self> {
        let n = entity_ids.len();
        if time_ids.len() != n {
            return Err(anyhow!(
                "time index length {} != entity index length {}",
                time_ids.len(),
                n
            ));
        }
        for (name, values) in &columns {
            if values.len() != n {
                return Err(anyhow!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    n
                ));
            }
        }
        Ok(Self {
            entity_ids,
            time_ids,
            columns,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn n_entities(&self) -> usize {
        let mut ids: Vec<u64> = self.entity_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    pub fn entity_ids(&self) -> &[u64] {
        &self.entity_ids
    }

    pub fn time_ids(&self) -> &[u64] {
        &self.time_ids
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("dataset has no column '{name}'"))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// New dataset with `name` added (or replaced). Used for stage-two
    /// regressions on stage-one fitted values.
    pub fn with_column(&self, name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.n_rows() {
            return Err(anyhow!(
                "column '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.n_rows()
            ));
        }
        let mut columns = self.columns.clone();
        columns.insert(name.to_string(), values);
        Ok(Self {
            entity_ids: self.entity_ids.clone(),
            time_ids: self.time_ids.clone(),
            columns,
        })
    }

    /// Subsample of rows where `column` equals `value`. Used for subgroup
    /// regressions on a 0/1 group variable.
    pub fn filter_eq(&self, column: &str, value: f64) -> Result<Self> {
        let filter = self.column(column)?.to_vec();
        let keep: Vec<usize> = filter
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| (v == value).then_some(i))
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let kept = keep.iter().map(|&i| values[i]).collect();
                (name.clone(), kept)
            })
            .collect();
        Ok(Self {
            entity_ids: keep.iter().map(|&i| self.entity_ids[i]).collect(),
            time_ids: keep.iter().map(|&i| self.time_ids[i]).collect(),
            columns,
        })
    }
}
