use serde::Serialize;
use thiserror::Error;

use crate::model::{Cohort, Column, Table};

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("cannot compute statistics of an empty table")]
    EmptyTable,
    #[error("column {0:?} has zero standard deviation")]
    ZeroDeviation(String),
    #[error("column {0:?} has an undefined standard deviation (fewer than two subjects)")]
    UndefinedDeviation(String),
    #[error("table and statistics disagree on columns ({table} vs {stats})")]
    ColumnMismatch { table: usize, stats: usize },
    #[error("{labels} cohort labels for {rows} table rows")]
    LabelMismatch { rows: usize, labels: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortMeans {
    #[serde(rename = "HC")]
    pub hc: Option<f64>,
    #[serde(rename = "PD")]
    pub pd: Option<f64>,
    #[serde(rename = "SWEDD")]
    pub swedd: Option<f64>,
}

impl CohortMeans {
    pub fn get(&self, cohort: Cohort) -> Option<f64> {
        match cohort {
            Cohort::HealthyControl => self.hc,
            Cohort::Parkinsons => self.pd,
            Cohort::Swedd => self.swedd,
        }
    }

    fn set(&mut self, cohort: Cohort, value: Option<f64>) {
        match cohort {
            Cohort::HealthyControl => self.hc = value,
            Cohort::Parkinsons => self.pd = value,
            Cohort::Swedd => self.swedd = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub mean: f64,
    /// Sample (n-1) standard deviation; `None` below two subjects.
    pub std: Option<f64>,
    pub cohort_means: CohortMeans,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsFrame {
    pub columns: Vec<ColumnStats>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Global mean and sample std per column, plus means for `present` cohorts.
pub fn compute_statistics(
    table: &Table,
    labels: &[Cohort],
    present: &[Cohort],
) -> Result<StatsFrame, StatsError> {
    if table.is_empty() {
        return Err(StatsError::EmptyTable);
    }
    if labels.len() != table.n_rows() {
        return Err(StatsError::LabelMismatch {
            rows: table.n_rows(),
            labels: labels.len(),
        });
    }

    let columns = table
        .columns
        .iter()
        .map(|column| {
            let global = mean(column.values.iter().copied()).unwrap_or(f64::NAN);
            let mut cohort_means = CohortMeans {
                hc: None,
                pd: None,
                swedd: None,
            };
            for &cohort in present {
                let values = column
                    .values
                    .iter()
                    .zip(labels)
                    .filter(|(_, l)| **l == cohort)
                    .map(|(v, _)| *v);
                cohort_means.set(cohort, mean(values));
            }
            ColumnStats {
                name: column.name.clone(),
                mean: global,
                std: sample_std(&column.values, global),
                cohort_means,
            }
        })
        .collect();

    Ok(StatsFrame { columns })
}

/// Z-scores every column with its global mean and standard deviation.
pub fn normalize(table: &Table, stats: &StatsFrame) -> Result<Table, StatsError> {
    if table.n_cols() != stats.columns.len() {
        return Err(StatsError::ColumnMismatch {
            table: table.n_cols(),
            stats: stats.columns.len(),
        });
    }

    let mut columns = Vec::with_capacity(table.n_cols());
    for (column, st) in table.columns.iter().zip(&stats.columns) {
        if column.name != st.name {
            return Err(StatsError::ColumnMismatch {
                table: table.n_cols(),
                stats: stats.columns.len(),
            });
        }
        let std = st
            .std
            .ok_or_else(|| StatsError::UndefinedDeviation(column.name.clone()))?;
        if std == 0.0 {
            return Err(StatsError::ZeroDeviation(column.name.clone()));
        }
        columns.push(Column {
            name: column.name.clone(),
            values: column.values.iter().map(|v| (v - st.mean) / std).collect(),
        });
    }

    Ok(Table {
        index: table.index.clone(),
        columns,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_stats.rs"]
mod tests;
