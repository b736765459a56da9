use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::input::catalog::{TestCatalog, resolve_test_catalog};
use crate::input::roster::{SUBJECT_COLUMN, SubjectRegistry, load_subject_roster, parse_subject_id};
use crate::input::snapshot::write_snapshot;
use crate::input::{InputError, read_csv};
use crate::model::Store;
use crate::model::diagnostics::{DiagnosticsSink, ParseDiagnostic};
use crate::model::events::event_timeline;
use crate::model::genotype::BELOW_DETECTION_LIMIT;
use crate::model::store::StoreDims;
use crate::pipeline::stage1_biomarkers::EVENT_COLUMN;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("internal error while building store: {0}")]
    Internal(String),
}

/// How one raw cell contributes to its store cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Number(f64),
    Empty,
    Invalid,
}

pub fn parse_cell(text: &str) -> CellValue {
    let text = text.trim();
    if text.is_empty() {
        return CellValue::Empty;
    }
    if text == BELOW_DETECTION_LIMIT {
        return CellValue::Number(0.0);
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Number(v),
        Ok(_) => CellValue::Empty,
        Err(_) => CellValue::Invalid,
    }
}

/// Accumulates contributions into the dense store array.
///
/// A cell is missing until its first numeric contribution, then sums every
/// further one. An empty or invalid contribution poisons the cell; a
/// poisoned cell stays missing no matter what arrives afterwards.
#[derive(Debug)]
pub struct StoreBuilder {
    dims: StoreDims,
    values: Vec<Option<f64>>,
    poisoned: Vec<bool>,
}

impl StoreBuilder {
    pub fn new(dims: StoreDims) -> Self {
        StoreBuilder {
            dims,
            values: vec![None; dims.n_cells()],
            poisoned: vec![false; dims.n_cells()],
        }
    }

    pub fn contribute(&mut self, event: usize, subject: usize, test: usize, value: CellValue) {
        let offset = self.dims.offset(event, subject, test);
        if self.poisoned[offset] {
            return;
        }
        match value {
            CellValue::Number(v) => {
                let cell = self.values[offset].get_or_insert(0.0);
                *cell += v;
            }
            CellValue::Empty | CellValue::Invalid => {
                self.poisoned[offset] = true;
                self.values[offset] = None;
            }
        }
    }

    pub fn finish(self) -> Vec<Option<f64>> {
        self.values
    }
}

pub fn build_store(
    registry: &SubjectRegistry,
    events: &[String],
    catalog: &TestCatalog,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Store, BuildError> {
    let dims = StoreDims {
        n_events: events.len(),
        n_subjects: registry.subjects.len(),
        n_tests: catalog.tests.len(),
    };
    let mut builder = StoreBuilder::new(dims);

    for path in &catalog.files {
        ingest_file(path, registry, events, catalog, &mut builder, sink)?;
    }

    let store = Store::from_parts(
        registry.subjects.clone(),
        registry.cohorts.clone(),
        events.to_vec(),
        catalog.tests.clone(),
        catalog.code_map.clone(),
        builder.finish(),
    )
    .ok_or_else(|| BuildError::Internal("store array does not match its axes".to_string()))?;

    let present = store.values().iter().filter(|v| v.is_some()).count();
    tracing::info!(
        events = dims.n_events,
        subjects = dims.n_subjects,
        tests = dims.n_tests,
        present,
        "built three-axis store"
    );
    Ok(store)
}

fn ingest_file(
    path: &Path,
    registry: &SubjectRegistry,
    events: &[String],
    catalog: &TestCatalog,
    builder: &mut StoreBuilder,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(), BuildError> {
    let table = read_csv(path)?;
    let subject_col = table.column(SUBJECT_COLUMN)?;
    let event_col = table.column(EVENT_COLUMN)?;

    // (column, test) for every header that the catalog maps
    let mut mapped = Vec::new();
    for (col, header) in table.headers.iter().enumerate() {
        let Some(descriptor) = catalog.code_map.get(header) else {
            continue;
        };
        let test = catalog.test_index(descriptor).ok_or_else(|| {
            BuildError::Internal(format!(
                "{}: column {header:?} maps to unknown test {descriptor:?}",
                path.display()
            ))
        })?;
        mapped.push((col, test));
    }
    if mapped.is_empty() {
        tracing::warn!(file = %path.display(), "no catalogued columns in file");
    }

    let file = path.display().to_string();
    let mut used_rows = 0usize;
    let mut skipped_rows = 0usize;
    for row in &table.rows {
        let subject_id = parse_subject_id(table.field(row, subject_col));
        let subject = subject_id.and_then(|id| registry.subjects.binary_search(&id).ok());
        let event_code = table.field(row, event_col);
        let event = events.iter().position(|e| e == event_code);
        let (Some(subject_id), Some(subject), Some(event)) = (subject_id, subject, event) else {
            skipped_rows += 1;
            continue;
        };
        used_rows += 1;

        for &(col, test) in &mapped {
            let entry = table.field(row, col);
            let value = parse_cell(entry);
            if value == CellValue::Invalid {
                sink.record(ParseDiagnostic {
                    file: file.clone(),
                    subject: subject_id,
                    test: catalog.tests[test].clone(),
                    event: event_code.to_string(),
                    entry: entry.to_string(),
                });
            }
            builder.contribute(event, subject, test, value);
        }
    }

    tracing::info!(
        file = %file,
        rows = used_rows,
        skipped = skipped_rows,
        columns = mapped.len(),
        "ingested source file"
    );
    Ok(())
}

/// File locations for the `build` command.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub control: PathBuf,
    pub roster: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct BuildSummary {
    pub store: Store,
    pub diagnostics: usize,
}

pub fn run_build(config: &BuildConfig, sink: &mut dyn DiagnosticsSink) -> Result<BuildSummary, BuildError> {
    let registry = load_subject_roster(&config.roster)?;
    let catalog = resolve_test_catalog(&config.control)?;
    let events = event_timeline();

    let mut counting = CountingSink { inner: sink, count: 0 };
    let store = build_store(&registry, &events, &catalog, &mut counting)?;
    write_snapshot(&config.output, &store)?;

    Ok(BuildSummary {
        store,
        diagnostics: counting.count,
    })
}

struct CountingSink<'a> {
    inner: &'a mut dyn DiagnosticsSink,
    count: usize,
}

impl DiagnosticsSink for CountingSink<'_> {
    fn record(&mut self, diagnostic: ParseDiagnostic) {
        self.count += 1;
        self.inner.record(diagnostic);
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_store.rs"]
mod tests;
