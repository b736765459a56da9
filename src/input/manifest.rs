use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::input::{InputError, read_json};
use crate::model::Cohort;

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub filename: PathBuf,
    pub testlist: Vec<String>,
    pub testdict: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SelectDataFile {
    selectdata: BTreeMap<String, DatasetEntry>,
}

/// Datasets of the selection manifest, keyed (and therefore ordered) by name.
pub fn load_selectdata(path: &Path) -> Result<BTreeMap<String, DatasetEntry>, InputError> {
    let file: SelectDataFile = read_json(path)?;
    Ok(file.selectdata)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BiomarkerControl {
    pub raw: Vec<PathBuf>,
    pub outputfile: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BiomarkerControlFile {
    biomarkers: BiomarkerControl,
}

pub fn load_biomarker_control(path: &Path) -> Result<BiomarkerControl, InputError> {
    let file: BiomarkerControlFile = read_json(path)?;
    if file.biomarkers.raw.is_empty() {
        return Err(InputError::config(path, "no raw biomarker files listed"));
    }
    Ok(file.biomarkers)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPair {
    pub event: String,
    pub test: String,
}

impl SelectionPair {
    pub fn new(event: impl Into<String>, test: impl Into<String>) -> Self {
        SelectionPair {
            event: event.into(),
            test: test.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmploySelection {
    pub cohorts: Vec<Cohort>,
    pub pairs: Vec<SelectionPair>,
}

#[derive(Debug, Deserialize)]
struct EmployDataset {
    events: Vec<String>,
    tests: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmployData {
    #[serde(default)]
    cohort: Vec<String>,
    #[serde(flatten)]
    datasets: BTreeMap<String, EmployDataset>,
}

#[derive(Debug, Deserialize)]
struct EmployFile {
    employdata: EmployData,
}

pub fn load_employ_manifest(path: &Path) -> Result<EmploySelection, InputError> {
    let file: EmployFile = read_json(path)?;
    let data = file.employdata;

    let cohorts = parse_cohort_list(path, &data.cohort)?;

    let mut pairs: Vec<SelectionPair> = Vec::new();
    for dataset in data.datasets.values() {
        for event in &dataset.events {
            for test in &dataset.tests {
                let pair = SelectionPair::new(event.as_str(), test.as_str());
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
    }

    Ok(EmploySelection { cohorts, pairs })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlinkInstructions {
    pub affected: Vec<Cohort>,
    pub fam_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PlinkControl {
    cohort: Vec<String>,
    filename: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PlinkControlFile {
    plink: PlinkControl,
}

pub fn load_plink_instructions(path: &Path) -> Result<PlinkInstructions, InputError> {
    let file: PlinkControlFile = read_json(path)?;
    let affected = parse_cohort_list(path, &file.plink.cohort)?;
    Ok(PlinkInstructions {
        affected,
        fam_path: file.plink.filename,
    })
}

fn parse_cohort_list(path: &Path, codes: &[String]) -> Result<Vec<Cohort>, InputError> {
    if codes.is_empty() {
        return Err(InputError::config(path, "no cohorts specified"));
    }
    let mut cohorts = Vec::with_capacity(codes.len());
    for code in codes {
        let cohort = Cohort::parse(code)
            .ok_or_else(|| InputError::config(path, format!("unknown cohort {code:?}")))?;
        if !cohorts.contains(&cohort) {
            cohorts.push(cohort);
        }
    }
    Ok(cohorts)
}
