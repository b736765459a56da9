use std::collections::BTreeMap;

use crate::model::cohort::Cohort;

pub type SubjectId = u32;

/// Dense event x subject x test array. `None` marks a missing observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub subjects: Vec<SubjectId>,
    pub subject_cohort: BTreeMap<SubjectId, Cohort>,
    pub events: Vec<String>,
    pub tests: Vec<String>,
    pub code_map: BTreeMap<String, String>,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDims {
    pub n_events: usize,
    pub n_subjects: usize,
    pub n_tests: usize,
}

impl StoreDims {
    pub fn n_cells(&self) -> usize {
        self.n_events * self.n_subjects * self.n_tests
    }

    #[inline]
    pub fn offset(&self, event: usize, subject: usize, test: usize) -> usize {
        (event * self.n_subjects + subject) * self.n_tests + test
    }
}

impl Store {
    /// Returns `None` when `values` does not match the axis lengths.
    pub fn from_parts(
        subjects: Vec<SubjectId>,
        subject_cohort: BTreeMap<SubjectId, Cohort>,
        events: Vec<String>,
        tests: Vec<String>,
        code_map: BTreeMap<String, String>,
        values: Vec<Option<f64>>,
    ) -> Option<Store> {
        let dims = StoreDims {
            n_events: events.len(),
            n_subjects: subjects.len(),
            n_tests: tests.len(),
        };
        if values.len() != dims.n_cells() {
            return None;
        }
        Some(Store {
            subjects,
            subject_cohort,
            events,
            tests,
            code_map,
            values,
        })
    }

    pub fn dims(&self) -> StoreDims {
        StoreDims {
            n_events: self.events.len(),
            n_subjects: self.subjects.len(),
            n_tests: self.tests.len(),
        }
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn get(&self, event: usize, subject: usize, test: usize) -> Option<f64> {
        let dims = self.dims();
        if event >= dims.n_events || subject >= dims.n_subjects || test >= dims.n_tests {
            return None;
        }
        self.values[dims.offset(event, subject, test)]
    }

    pub fn event_index(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    pub fn test_index(&self, test: &str) -> Option<usize> {
        self.tests.iter().position(|t| t == test)
    }

    /// All subjects' values for one (event, test) pair, in subject order.
    pub fn slice(&self, event: usize, test: usize) -> Vec<Option<f64>> {
        (0..self.subjects.len())
            .map(|s| self.get(event, s, test))
            .collect()
    }

    /// Tests with at least one observation, per event. Events without data are omitted.
    pub fn available_data(&self) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        for (e, event) in self.events.iter().enumerate() {
            let mut tests: Vec<String> = self
                .tests
                .iter()
                .enumerate()
                .filter(|(t, _)| (0..self.subjects.len()).any(|s| self.get(e, s, *t).is_some()))
                .map(|(_, name)| name.clone())
                .collect();
            if tests.is_empty() {
                continue;
            }
            tests.sort();
            out.insert(event.clone(), tests);
        }
        out
    }
}
