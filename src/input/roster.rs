use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::input::{InputError, read_csv};
use crate::model::{Cohort, SubjectId};

pub const SUBJECT_COLUMN: &str = "PATNO";
const STATUS_COLUMN: &str = "ENROLL_STATUS";
const CATEGORY_COLUMN: &str = "ENROLL_CAT";
const ENROLLED: &str = "Enrolled";

/// Enrolled study subjects, ascending, with their cohort. Enrolled subjects
/// in other categories are only tracked in `uncategorized`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectRegistry {
    pub subjects: Vec<SubjectId>,
    pub cohorts: BTreeMap<SubjectId, Cohort>,
    pub uncategorized: BTreeSet<SubjectId>,
}

impl SubjectRegistry {
    pub fn from_cohorts(cohorts: BTreeMap<SubjectId, Cohort>) -> Self {
        let subjects = cohorts.keys().copied().collect();
        SubjectRegistry {
            subjects,
            cohorts,
            uncategorized: BTreeSet::new(),
        }
    }

    pub fn is_enrolled(&self, subject: SubjectId) -> bool {
        self.cohorts.contains_key(&subject) || self.uncategorized.contains(&subject)
    }

    pub fn cohort(&self, subject: SubjectId) -> Option<Cohort> {
        self.cohorts.get(&subject).copied()
    }
}

pub fn parse_subject_id(text: &str) -> Option<SubjectId> {
    text.trim().parse::<SubjectId>().ok()
}

pub fn load_subject_roster(path: &Path) -> Result<SubjectRegistry, InputError> {
    let table = read_csv(path)?;
    let id_col = table.column(SUBJECT_COLUMN)?;
    let status_col = table.column(STATUS_COLUMN)?;
    let category_col = table.column(CATEGORY_COLUMN)?;

    let mut cohorts = BTreeMap::new();
    let mut uncategorized = BTreeSet::new();
    for (line, row) in table.rows.iter().enumerate() {
        if table.field(row, status_col) != ENROLLED {
            continue;
        }
        let raw_id = table.field(row, id_col);
        let Some(subject) = parse_subject_id(raw_id) else {
            return Err(InputError::malformed(
                path,
                format!("row {}: invalid subject id {raw_id:?}", line + 2),
            ));
        };
        let category = table.field(row, category_col);
        let Some(cohort) = Cohort::parse(category) else {
            tracing::warn!(
                subject,
                category,
                "enrolled subject outside HC/PD/SWEDD cohorts; skipping"
            );
            uncategorized.insert(subject);
            continue;
        };
        if cohorts.insert(subject, cohort).is_some() {
            tracing::warn!(subject, "duplicate roster entry; keeping last");
        }
    }

    tracing::info!(subjects = cohorts.len(), path = %path.display(), "read subject roster");
    uncategorized.retain(|s| !cohorts.contains_key(s));
    let mut registry = SubjectRegistry::from_cohorts(cohorts);
    registry.uncategorized = uncategorized;
    Ok(registry)
}
