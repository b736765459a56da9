use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::input::InputError;
use crate::input::manifest::load_selectdata;

/// Source files plus the mapping from raw column codes to canonical tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCatalog {
    pub files: Vec<PathBuf>,
    pub tests: Vec<String>,
    pub code_map: BTreeMap<String, String>,
}

impl TestCatalog {
    pub fn test_index(&self, descriptor: &str) -> Option<usize> {
        self.tests.iter().position(|t| t == descriptor)
    }
}

pub fn resolve_test_catalog(path: &Path) -> Result<TestCatalog, InputError> {
    let datasets = load_selectdata(path)?;
    if datasets.is_empty() {
        return Err(InputError::config(path, "selectdata lists no datasets"));
    }

    let mut catalog = TestCatalog::default();
    for (name, entry) in &datasets {
        catalog.files.push(entry.filename.clone());
        for test in &entry.testlist {
            if !catalog.tests.contains(test) {
                catalog.tests.push(test.clone());
            }
        }
        for (code, descriptor) in &entry.testdict {
            if let Some(previous) = catalog.code_map.get(code) {
                if previous != descriptor {
                    tracing::warn!(
                        dataset = %name,
                        code = %code,
                        previous = %previous,
                        descriptor = %descriptor,
                        "code remapped by later dataset"
                    );
                }
            }
            catalog.code_map.insert(code.clone(), descriptor.clone());
        }
    }

    for (code, descriptor) in &catalog.code_map {
        if catalog.test_index(descriptor).is_none() {
            return Err(InputError::config(
                path,
                format!("code {code:?} maps to {descriptor:?}, which no testlist declares"),
            ));
        }
    }

    tracing::info!(
        files = catalog.files.len(),
        tests = catalog.tests.len(),
        codes = catalog.code_map.len(),
        "resolved test catalog"
    );
    Ok(catalog)
}
