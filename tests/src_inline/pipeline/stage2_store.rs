use super::*;
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::input::snapshot::read_snapshot;
use crate::model::Cohort;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("ppmi_stage2_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn registry() -> SubjectRegistry {
    SubjectRegistry::from_cohorts(BTreeMap::from([
        (3001, Cohort::HealthyControl),
        (3002, Cohort::Parkinsons),
    ]))
}

fn events() -> Vec<String> {
    vec!["SC".to_string(), "BL".to_string()]
}

fn catalog(files: Vec<PathBuf>) -> TestCatalog {
    TestCatalog {
        files,
        tests: vec!["X".to_string(), "Y".to_string()],
        code_map: BTreeMap::from([
            ("A".to_string(), "X".to_string()),
            ("B".to_string(), "X".to_string()),
            ("C".to_string(), "Y".to_string()),
        ]),
    }
}

fn cell(store: &Store, event: &str, subject: u32, test: &str) -> Option<f64> {
    store.get(
        store.event_index(event).unwrap(),
        store.subjects.binary_search(&subject).unwrap(),
        store.test_index(test).unwrap(),
    )
}

#[test]
fn test_parse_cell() {
    assert_eq!(parse_cell(" 3.5 "), CellValue::Number(3.5));
    assert_eq!(parse_cell("below detection limit"), CellValue::Number(0.0));
    assert_eq!(parse_cell(""), CellValue::Empty);
    assert_eq!(parse_cell("nan"), CellValue::Empty);
    assert_eq!(parse_cell("N/A"), CellValue::Invalid);
}

#[test]
fn test_builder_poison_is_order_independent() {
    let dims = StoreDims {
        n_events: 1,
        n_subjects: 1,
        n_tests: 1,
    };
    let mut first = StoreBuilder::new(dims);
    first.contribute(0, 0, 0, CellValue::Number(3.0));
    first.contribute(0, 0, 0, CellValue::Invalid);

    let mut second = StoreBuilder::new(dims);
    second.contribute(0, 0, 0, CellValue::Invalid);
    second.contribute(0, 0, 0, CellValue::Number(3.0));

    assert_eq!(first.finish(), vec![None]);
    assert_eq!(second.finish(), vec![None]);
}

#[test]
fn test_synonym_codes_are_summed() {
    let dir = make_temp_dir();
    let path = dir.join("updrs.csv");
    fs::write(&path, "PATNO,EVENT_ID,A,B,C\n3001,BL,3.0,4.0,1\n").unwrap();

    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let store = build_store(&registry(), &events(), &catalog(vec![path]), &mut sink).unwrap();
    assert_eq!(cell(&store, "BL", 3001, "X"), Some(7.0));
    assert_eq!(cell(&store, "BL", 3001, "Y"), Some(1.0));
    assert_eq!(cell(&store, "SC", 3001, "X"), None);
    assert!(sink.is_empty());
}

#[test]
fn test_summing_spans_files() {
    let dir = make_temp_dir();
    let a = dir.join("a.csv");
    let b = dir.join("b.csv");
    fs::write(&a, "PATNO,EVENT_ID,A\n3002,SC,1.5\n").unwrap();
    fs::write(&b, "EVENT_ID,PATNO,B\nSC,3002,2.5\n").unwrap();

    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let store = build_store(&registry(), &events(), &catalog(vec![a, b]), &mut sink).unwrap();
    assert_eq!(cell(&store, "SC", 3002, "X"), Some(4.0));
}

#[test]
fn test_invalid_entry_poisons_and_is_reported() {
    let dir = make_temp_dir();
    let a = dir.join("a.csv");
    let b = dir.join("b.csv");
    fs::write(&a, "PATNO,EVENT_ID,A\n3001,BL,N/A\n").unwrap();
    fs::write(&b, "PATNO,EVENT_ID,B\n3001,BL,3.0\n").unwrap();

    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let store = build_store(&registry(), &events(), &catalog(vec![a, b]), &mut sink).unwrap();
    assert_eq!(cell(&store, "BL", 3001, "X"), None);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].subject, 3001);
    assert_eq!(sink[0].test, "X");
    assert_eq!(sink[0].event, "BL");
    assert_eq!(sink[0].entry, "N/A");
    assert!(sink[0].file.ends_with("a.csv"));
}

#[test]
fn test_empty_entry_poisons_silently() {
    let dir = make_temp_dir();
    let path = dir.join("a.csv");
    fs::write(&path, "PATNO,EVENT_ID,A,B\n3001,BL,2.0,\n").unwrap();

    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let store = build_store(&registry(), &events(), &catalog(vec![path]), &mut sink).unwrap();
    assert_eq!(cell(&store, "BL", 3001, "X"), None);
    assert!(sink.is_empty());
}

#[test]
fn test_unknown_subjects_and_events_skipped() {
    let dir = make_temp_dir();
    let path = dir.join("a.csv");
    fs::write(
        &path,
        "PATNO,EVENT_ID,C\n9999,BL,1\n3001,ST,2\nabc,BL,3\n3002,BL,4\n",
    )
    .unwrap();

    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let store = build_store(&registry(), &events(), &catalog(vec![path]), &mut sink).unwrap();
    let present: Vec<f64> = store.values().iter().flatten().copied().collect();
    assert_eq!(present, vec![4.0]);
    assert_eq!(cell(&store, "BL", 3002, "Y"), Some(4.0));
}

#[test]
fn test_missing_event_column_is_fatal() {
    let dir = make_temp_dir();
    let path = dir.join("a.csv");
    fs::write(&path, "PATNO,A\n3001,1\n").unwrap();

    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let err = build_store(&registry(), &events(), &catalog(vec![path]), &mut sink).unwrap_err();
    assert!(matches!(err, BuildError::Input(InputError::MissingColumn { .. })));
}

#[test]
fn test_unmapped_descriptor_is_internal_error() {
    let dir = make_temp_dir();
    let path = dir.join("a.csv");
    fs::write(&path, "PATNO,EVENT_ID,D\n3001,BL,1\n").unwrap();

    let mut cat = catalog(vec![path]);
    cat.code_map.insert("D".to_string(), "Z".to_string());
    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let err = build_store(&registry(), &events(), &cat, &mut sink).unwrap_err();
    assert!(matches!(err, BuildError::Internal(_)));
}

#[test]
fn test_run_build_writes_snapshot() {
    let dir = make_temp_dir();
    let roster = dir.join("Patient_Status.csv");
    fs::write(
        &roster,
        "PATNO,ENROLL_CAT,ENROLL_STATUS\n3001,HC,Enrolled\n3002,PD,Enrolled\n",
    )
    .unwrap();
    let data = dir.join("moca.csv");
    fs::write(&data, "PATNO,EVENT_ID,MCATOT\n3001,BL,27\n3002,BL,bad\n").unwrap();
    let control = dir.join("selectdata.json");
    fs::write(
        &control,
        format!(
            r#"{{"selectdata": {{"MoCA": {{"filename": {:?}, "testlist": ["MoCA"], "testdict": {{"MCATOT": "MoCA"}}}}}}}}"#,
            data.display().to_string()
        ),
    )
    .unwrap();

    let config = BuildConfig {
        control,
        roster,
        output: dir.join("PPMI_data.bin"),
    };
    let mut sink: Vec<ParseDiagnostic> = Vec::new();
    let summary = run_build(&config, &mut sink).unwrap();
    assert_eq!(summary.diagnostics, 1);
    assert_eq!(sink.len(), 1);
    assert_eq!(summary.store.events.len(), 14);

    let restored = read_snapshot(&config.output).unwrap();
    assert_eq!(restored, summary.store);
    assert_eq!(cell(&restored, "BL", 3001, "MoCA"), Some(27.0));
}
