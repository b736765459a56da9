use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::input::InputError;
use crate::input::manifest::load_plink_instructions;
use crate::input::roster::{SubjectRegistry, load_subject_roster, parse_subject_id};
use crate::model::Cohort;

const PHENOTYPE_FIELD: usize = 5;
const AFFECTED: &str = "2";
const UNAFFECTED: &str = "1";

#[derive(Debug, Error)]
pub enum PlinkError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: line {line}: expected at least 6 fields, found {found}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        found: usize,
    },
}

impl PlinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PlinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlinkSummary {
    pub affected: usize,
    pub unaffected: usize,
    pub unknown: usize,
}

pub fn backup_path(fam_path: &Path) -> PathBuf {
    let mut name = fam_path.as_os_str().to_os_string();
    name.push(".old");
    PathBuf::from(name)
}

/// Sets the phenotype of every enrolled subject in a plain-text `.fam` file:
/// 2 when the subject's cohort is in `affected`, 1 otherwise, including
/// enrolled subjects outside HC/PD/SWEDD. Subjects missing from the roster
/// keep their value. The original file is kept as `<file>.old`.
pub fn label_plink_fam(
    fam_path: &Path,
    affected: &[Cohort],
    registry: &SubjectRegistry,
) -> Result<PlinkSummary, PlinkError> {
    let file = File::open(fam_path).map_err(|e| InputError::data_source(fam_path, e))?;
    let reader = BufReader::new(file);
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PlinkError::io(fam_path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if fields.len() <= PHENOTYPE_FIELD {
            return Err(PlinkError::Malformed {
                path: fam_path.to_path_buf(),
                line: idx + 1,
                found: fields.len(),
            });
        }
        rows.push(fields);
    }

    let backup = backup_path(fam_path);
    fs::copy(fam_path, &backup).map_err(|e| PlinkError::io(&backup, e))?;

    let mut summary = PlinkSummary::default();
    for fields in &mut rows {
        let subject = parse_subject_id(&fields[0]).filter(|&id| registry.is_enrolled(id));
        match subject.map(|id| registry.cohort(id)) {
            Some(Some(c)) if affected.contains(&c) => {
                fields[PHENOTYPE_FIELD] = AFFECTED.to_string();
                summary.affected += 1;
            }
            Some(_) => {
                fields[PHENOTYPE_FIELD] = UNAFFECTED.to_string();
                summary.unaffected += 1;
            }
            None => {
                tracing::warn!(subject = %fields[0], "subject not found in study roster; entry left unchanged");
                summary.unknown += 1;
            }
        }
    }

    let file = File::create(fam_path).map_err(|e| PlinkError::io(fam_path, e))?;
    let mut w = BufWriter::new(file);
    for fields in &rows {
        writeln!(w, "{}", fields.join(" ")).map_err(|e| PlinkError::io(fam_path, e))?;
    }
    w.flush().map_err(|e| PlinkError::io(fam_path, e))?;

    tracing::info!(
        path = %fam_path.display(),
        affected = summary.affected,
        unaffected = summary.unaffected,
        unknown = summary.unknown,
        "labelled PLINK subjects"
    );
    Ok(summary)
}

pub fn run_label_plink(control: &Path, roster: &Path) -> Result<PlinkSummary, PlinkError> {
    let instructions = load_plink_instructions(control)?;
    let registry = load_subject_roster(roster)?;
    label_plink_fam(&instructions.fam_path, &instructions.affected, &registry)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/plink_labels.rs"]
mod tests;
