use thiserror::Error;

use crate::input::manifest::SelectionPair;
use crate::model::table::feature_name;
use crate::model::{Cohort, Column, Store, SubjectId, Table};

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("selection references unknown pair: test {test:?} at event {event:?}")]
    UnknownPair { event: String, test: String },
    #[error("subject {0} has no cohort")]
    UnknownCohort(SubjectId),
    #[error("no cohorts selected")]
    EmptyCohorts,
    #[error("no (event, test) pairs selected")]
    EmptyPairs,
}

/// A complete-case table plus the cohort of every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub table: Table,
    pub labels: Vec<Cohort>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Builds the subject x feature table for `pairs`, keeping subjects in
/// `cohorts` with a value in every column.
///
/// An empty result is not an error; it is logged and returned as is.
pub fn extract_selection(
    store: &Store,
    cohorts: &[Cohort],
    pairs: &[SelectionPair],
) -> Result<Selection, SelectionError> {
    if cohorts.is_empty() {
        return Err(SelectionError::EmptyCohorts);
    }
    if pairs.is_empty() {
        return Err(SelectionError::EmptyPairs);
    }

    let mut unique: Vec<&SelectionPair> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if !unique.contains(&pair) {
            unique.push(pair);
        }
    }

    let mut slices = Vec::with_capacity(unique.len());
    for pair in &unique {
        let unknown = || SelectionError::UnknownPair {
            event: pair.event.clone(),
            test: pair.test.clone(),
        };
        let event = store.event_index(&pair.event).ok_or_else(unknown)?;
        let test = store.test_index(&pair.test).ok_or_else(unknown)?;
        slices.push((feature_name(&pair.event, &pair.test), store.slice(event, test)));
    }

    let mut index = Vec::new();
    let mut labels = Vec::new();
    let mut rows = Vec::new();
    for (row, &subject) in store.subjects.iter().enumerate() {
        let cohort = *store
            .subject_cohort
            .get(&subject)
            .ok_or(SelectionError::UnknownCohort(subject))?;
        if !cohorts.contains(&cohort) {
            continue;
        }
        if slices.iter().all(|(_, values)| values[row].is_some()) {
            index.push(subject);
            labels.push(cohort);
            rows.push(row);
        }
    }

    let columns = slices
        .into_iter()
        .map(|(name, values)| Column {
            name,
            values: rows.iter().filter_map(|&r| values[r]).collect(),
        })
        .collect();
    let selection = Selection {
        table: Table { index, columns },
        labels,
    };

    if selection.is_empty() {
        tracing::warn!(
            pairs = unique.len(),
            cohorts = cohorts.len(),
            "no subjects have complete data for the selection"
        );
    } else {
        tracing::info!(
            subjects = selection.table.n_rows(),
            features = selection.table.n_cols(),
            "extracted selection"
        );
    }
    Ok(selection)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_select.rs"]
mod tests;
