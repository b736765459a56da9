use serde::Serialize;

use crate::model::store::SubjectId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Ordered named columns over a shared subject index. Every cell is present;
/// incomplete subjects are removed before a table is built.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub index: Vec<SubjectId>,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[row]).collect()
    }
}

pub fn feature_name(event: &str, test: &str) -> String {
    format!("{test} [{event}]")
}
