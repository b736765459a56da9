//! Reshapes the biospecimen analysis exports into the subject/event/test-column
//! layout used by every other PPMI data file.
//!
//! The raw exports are long format (one row per assay result) and contain
//! re-run assays, free-text visit names, and text-valued genetic results.
//! This stage keeps the latest run of each assay, recodes visits to event
//! codes, pivots to one row per (subject, event), and turns the genetic and
//! sentinel text into numbers.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::input::manifest::BiomarkerControl;
use crate::input::roster::{SUBJECT_COLUMN, parse_subject_id};
use crate::input::{InputError, read_csv};
use crate::model::SubjectId;
use crate::model::events::recode_biospecimen_event;
use crate::model::genotype::{APOE_ALLELES, CopyNumber, SnpEncoding, allele_count, is_snp_column, sentinel_value};

pub const EVENT_COLUMN: &str = "EVENT_ID";
const RAW_EVENT_COLUMN: &str = "CLINICAL_EVENT";
const TYPE_COLUMN: &str = "TYPE";
const TESTNAME_COLUMN: &str = "TESTNAME";
const TESTVALUE_COLUMN: &str = "TESTVALUE";
const RUNDATE_COLUMN: &str = "RUNDATE";

pub const COPY_NUMBER_COLUMN: &str = "SNCA_multiplication";
pub const APOE_PRIMARY_COLUMN: &str = "ApoE_Genotype";
pub const APOE_LEGACY_COLUMN: &str = "APOE GENOTYPE";

#[derive(Debug, Clone, PartialEq)]
pub struct BiomarkerRecord {
    pub subject: SubjectId,
    pub event: String,
    pub assay_type: String,
    pub test_name: String,
    pub value: String,
    pub run_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum RunDate {
    Parsed(u32, u32, u32),
    Text(String),
}

fn run_date_key(text: &str) -> RunDate {
    let parts: Vec<&str> = text.split(['-', '/']).collect();
    let nums: Vec<Option<u32>> = parts.iter().map(|p| p.trim().parse::<u32>().ok()).collect();
    match (parts.len(), text.contains('-'), nums.as_slice()) {
        // YYYY-MM-DD
        (3, true, [Some(y), Some(m), Some(d)]) => RunDate::Parsed(*y, *m, *d),
        // MM/DD/YYYY
        (3, false, [Some(m), Some(d), Some(y)]) => RunDate::Parsed(*y, *m, *d),
        _ => RunDate::Text(text.to_string()),
    }
}

impl BiomarkerRecord {
    fn group_key(&self) -> (SubjectId, &str, &str, &str) {
        (
            self.subject,
            self.event.as_str(),
            self.assay_type.as_str(),
            self.test_name.as_str(),
        )
    }

    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.group_key()
            .cmp(&other.group_key())
            .then_with(|| run_date_key(&self.run_date).cmp(&run_date_key(&other.run_date)))
    }
}

pub fn read_biomarker_records(paths: &[PathBuf]) -> Result<Vec<BiomarkerRecord>, InputError> {
    let mut records = Vec::new();
    for path in paths {
        let table = read_csv(path)?;
        let subject_col = table.column(SUBJECT_COLUMN)?;
        let event_col = table.column(RAW_EVENT_COLUMN)?;
        let type_col = table.column(TYPE_COLUMN)?;
        let name_col = table.column(TESTNAME_COLUMN)?;
        let value_col = table.column(TESTVALUE_COLUMN)?;
        let date_col = table.column(RUNDATE_COLUMN)?;

        let before = records.len();
        for row in &table.rows {
            let raw_subject = table.field(row, subject_col);
            let Some(subject) = parse_subject_id(raw_subject) else {
                tracing::warn!(file = %path.display(), subject = raw_subject, "unreadable subject id; row skipped");
                continue;
            };
            records.push(BiomarkerRecord {
                subject,
                event: table.field(row, event_col).to_string(),
                assay_type: table.field(row, type_col).to_string(),
                test_name: table.field(row, name_col).to_string(),
                value: table.field(row, value_col).to_string(),
                run_date: table.field(row, date_col).to_string(),
            });
        }
        tracing::info!(file = %path.display(), records = records.len() - before, "read biomarker file");
    }
    Ok(records)
}

/// Keeps only the most recent run for each (subject, event, type, test) group.
///
/// Runs with the same date keep source order, so the first one listed wins.
pub fn discard_obsolete_runs(mut records: Vec<BiomarkerRecord>) -> Vec<BiomarkerRecord> {
    records.sort_by(|a, b| b.sort_cmp(a));

    let mut kept: Vec<BiomarkerRecord> = Vec::with_capacity(records.len());
    for record in records {
        if let Some(last) = kept.last() {
            if last.group_key() == record.group_key() {
                continue;
            }
        }
        kept.push(record);
    }

    kept.sort_by(|a, b| a.sort_cmp(b));
    kept
}

/// Rewrites visit names to event codes; rows with unknown visits are dropped.
pub fn recode_events(records: Vec<BiomarkerRecord>) -> Vec<BiomarkerRecord> {
    let total = records.len();
    let out: Vec<BiomarkerRecord> = records
        .into_iter()
        .filter_map(|mut r| {
            let code = recode_biospecimen_event(&r.event)?;
            r.event = code.to_string();
            Some(r)
        })
        .collect();
    if out.len() < total {
        tracing::debug!(dropped = total - out.len(), "dropped records with unrecognised events");
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Missing,
    Text(String),
    Number(f64),
}

impl Field {
    fn from_raw(text: &str) -> Field {
        if text.is_empty() {
            Field::Missing
        } else {
            Field::Text(text.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Field::Missing => String::new(),
            Field::Text(t) => t.clone(),
            Field::Number(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideColumn {
    pub name: String,
    pub cells: Vec<Field>,
}

/// One row per (subject, event), one column per test.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideTable {
    pub keys: Vec<(SubjectId, String)>,
    pub columns: Vec<WideColumn>,
}

impl WideTable {
    fn take_column(&mut self, name: &str) -> Option<WideColumn> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }
}

pub fn pivot_records(records: &[BiomarkerRecord]) -> WideTable {
    let mut test_names: Vec<&str> = records.iter().map(|r| r.test_name.as_str()).collect();
    test_names.sort_unstable();
    test_names.dedup();

    let mut rows: BTreeMap<(SubjectId, &str), usize> = BTreeMap::new();
    for r in records {
        rows.entry((r.subject, r.event.as_str())).or_insert(0);
    }
    for (idx, slot) in rows.values_mut().enumerate() {
        *slot = idx;
    }

    let mut columns: Vec<WideColumn> = test_names
        .iter()
        .map(|name| WideColumn {
            name: name.to_string(),
            cells: vec![Field::Missing; rows.len()],
        })
        .collect();

    for r in records {
        let row = rows[&(r.subject, r.event.as_str())];
        let Ok(col) = test_names.binary_search(&r.test_name.as_str()) else {
            continue;
        };
        let cell = &mut columns[col].cells[row];
        if *cell != Field::Missing {
            tracing::warn!(
                subject = r.subject,
                event = %r.event,
                test = %r.test_name,
                assay_type = %r.assay_type,
                "second result for one test in a visit; keeping the first"
            );
            continue;
        }
        *cell = Field::from_raw(&r.value);
    }

    let keys = rows.keys().map(|(s, e)| (*s, e.to_string())).collect();
    WideTable { keys, columns }
}

pub fn clean_sentinels(table: &mut WideTable) {
    for column in &mut table.columns {
        for cell in &mut column.cells {
            if let Some(value) = cell.as_text().and_then(sentinel_value) {
                *cell = Field::Number(value);
            }
        }
    }
}

pub fn recode_copy_number(table: &mut WideTable) {
    let Some(column) = table.columns.iter_mut().find(|c| c.name == COPY_NUMBER_COLUMN) else {
        return;
    };
    for cell in &mut column.cells {
        let value = match cell.as_text() {
            Some(text) => match CopyNumber::parse(text) {
                Some(cn) => cn.value(),
                None => {
                    tracing::warn!(entry = text, "unrecognised copy-number code; marked missing");
                    None
                }
            },
            None => None,
        };
        *cell = value.map_or(Field::Missing, Field::Number);
    }
}

/// Merges the two ApoE genotype columns and replaces them with allele counts.
pub fn recode_apoe(table: &mut WideTable) {
    let primary = table.take_column(APOE_PRIMARY_COLUMN);
    let legacy = table.take_column(APOE_LEGACY_COLUMN);
    if primary.is_none() && legacy.is_none() {
        return;
    }

    let n_rows = table.keys.len();
    let pick = |col: &Option<WideColumn>, row: usize| -> Option<String> {
        col.as_ref()
            .and_then(|c| c.cells[row].as_text())
            .map(str::to_string)
    };
    let combined: Vec<Option<String>> = (0..n_rows)
        .map(|row| pick(&primary, row).or_else(|| pick(&legacy, row)))
        .collect();

    for allele in APOE_ALLELES {
        let cells = combined
            .iter()
            .map(|g| allele_count(g.as_deref(), allele).map_or(Field::Missing, Field::Number))
            .collect();
        table.columns.push(WideColumn {
            name: format!("ApoE {allele} Count"),
            cells,
        });
    }
}

pub fn recode_snps(table: &mut WideTable) {
    let snps: Vec<String> = table
        .columns
        .iter()
        .filter(|c| is_snp_column(&c.name))
        .map(|c| c.name.clone())
        .collect();

    for snp in snps {
        let Some(column) = table.take_column(&snp) else {
            continue;
        };
        let encoding = SnpEncoding::learn(column.cells.iter().filter_map(Field::as_text));
        let cells = column
            .cells
            .iter()
            .map(|cell| match cell.as_text() {
                Some(genotype) => match encoding.encode(genotype) {
                    Some(v) => Field::Number(v),
                    None => {
                        tracing::warn!(snp = %snp, entry = genotype, "unreadable genotype; marked missing");
                        Field::Missing
                    }
                },
                None => Field::Missing,
            })
            .collect();
        table.columns.push(WideColumn {
            name: encoding.column_name(&snp),
            cells,
        });
    }
}

pub fn write_wide_csv(path: &Path, table: &WideTable) -> Result<(), InputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| InputError::data_source(parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| InputError::data_source(path, e))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let to_err = |e: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let mut header = vec![SUBJECT_COLUMN.to_string(), EVENT_COLUMN.to_string()];
    header.extend(table.columns.iter().map(|c| c.name.clone()));
    writer.write_record(&header).map_err(to_err)?;

    for (row, (subject, event)) in table.keys.iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(subject.to_string());
        record.push(event.clone());
        record.extend(table.columns.iter().map(|c| c.cells[row].render()));
        writer.write_record(&record).map_err(to_err)?;
    }
    writer
        .flush()
        .map_err(|e| InputError::data_source(path, e))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage1Output {
    pub records_read: usize,
    pub records_kept: usize,
    pub table: WideTable,
}

pub fn prepare_biomarkers(control: &BiomarkerControl) -> Result<Stage1Output, InputError> {
    let records = read_biomarker_records(&control.raw)?;
    let records_read = records.len();

    let records = discard_obsolete_runs(records);
    let records = recode_events(records);
    let records_kept = records.len();

    let mut table = pivot_records(&records);
    clean_sentinels(&mut table);
    recode_copy_number(&mut table);
    recode_apoe(&mut table);
    recode_snps(&mut table);

    write_wide_csv(&control.outputfile, &table)?;
    tracing::info!(
        rows = table.keys.len(),
        columns = table.columns.len(),
        path = %control.outputfile.display(),
        "wrote cleaned biomarker table"
    );

    Ok(Stage1Output {
        records_read,
        records_kept,
        table,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_biomarkers.rs"]
mod tests;
