//! Panel dataset loading from CSV.
//!
//! The file must carry the entity and time index columns plus one numeric
//! column per variable. Rows with missing or unparsable values are dropped;
//! a high drop rate is logged loudly but does not fail the load.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::regress::PanelData;

/// Fraction of dropped rows above which the loader warns.
const DROP_WARN_RATIO: f64 = 0.2;

/// Load a CSV file into a [`PanelData`].
///
/// Non-numeric entity and time labels are interned to dense integer ids in
/// first-appearance order, so string firm codes and fiscal-year labels both
/// work.
pub fn load_panel_csv(path: &Path, entity_col: &str, time_col: &str) -> Result<PanelData> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .clone();
    let entity_pos = position(&headers, entity_col)
        .ok_or_else(|| anyhow!("entity column '{entity_col}' not found in {}", path.display()))?;
    let time_pos = position(&headers, time_col)
        .ok_or_else(|| anyhow!("time column '{time_col}' not found in {}", path.display()))?;

    let value_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|&(pos, _)| pos != entity_pos && pos != time_pos)
        .map(|(pos, name)| (pos, name.to_string()))
        .collect();
    if value_columns.is_empty() {
        return Err(anyhow!(
            "{} has no variable columns beyond the index",
            path.display()
        ));
    }

    let mut entities = Interner::default();
    let mut times = Interner::default();
    let mut entity_ids = Vec::new();
    let mut time_ids = Vec::new();
    let mut columns: BTreeMap<String, Vec<f64>> = value_columns
        .iter()
        .map(|(_, name)| (name.clone(), Vec::new()))
        .collect();

    let mut total = 0usize;
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| format!("read record of {}", path.display()))?;
        total += 1;

        let parsed: Option<Vec<f64>> = value_columns
            .iter()
            .map(|&(pos, _)| record.get(pos).and_then(parse_value))
            .collect();
        let Some(values) = parsed else {
            dropped += 1;
            continue;
        };
        let (Some(entity), Some(time)) = (record.get(entity_pos), record.get(time_pos)) else {
            dropped += 1;
            continue;
        };

        entity_ids.push(entities.intern(entity));
        time_ids.push(times.intern(time));
        for ((_, name), value) in value_columns.iter().zip(values) {
            columns
                .get_mut(name)
                .expect("column vector was created above")
                .push(value);
        }
    }

    if total == 0 {
        return Err(anyhow!("{} has no data rows", path.display()));
    }
    let ratio = dropped as f64 / total as f64;
    if ratio > DROP_WARN_RATIO {
        warn!(
            dropped,
            total,
            "more than {:.0}% of rows dropped for missing values",
            DROP_WARN_RATIO * 100.0
        );
    }
    info!(
        rows = total - dropped,
        dropped,
        entities = entities.len(),
        periods = times.len(),
        "panel dataset loaded"
    );

    PanelData::new(entity_ids, time_ids, columns)
}

fn position(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Dense-id interner preserving first-appearance order.
#[derive(Default)]
struct Interner {
    ids: BTreeMap<String, u64>,
}

impl Interner {
    fn intern(&mut self, label: &str) -> u64 {
        let next = self.ids.len() as u64;
        *self.ids.entry(label.trim().to_string()).or_insert(next)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
