use super::*;
use std::collections::BTreeMap;

// events: BL; tests: TestX, TestY; subjects 1 (HC), 2 (PD), 3 (PD), 4 (SWEDD)
fn store() -> Store {
    let subjects = vec![1, 2, 3, 4];
    let cohorts = BTreeMap::from([
        (1, Cohort::HealthyControl),
        (2, Cohort::Parkinsons),
        (3, Cohort::Parkinsons),
        (4, Cohort::Swedd),
    ]);
    let values = vec![
        None,
        Some(1.0),
        Some(2.0),
        Some(20.0),
        Some(3.0),
        None,
        Some(4.0),
        Some(40.0),
    ];
    Store::from_parts(
        subjects,
        cohorts,
        vec!["BL".to_string()],
        vec!["TestX".to_string(), "TestY".to_string()],
        BTreeMap::new(),
        values,
    )
    .unwrap()
}

fn values_of<'a>(table: &'a Table, name: &str) -> &'a [f64] {
    &table.columns.iter().find(|c| c.name == name).unwrap().values
}

#[test]
fn test_complete_cases_only() {
    let pairs = vec![
        SelectionPair::new("BL", "TestX"),
        SelectionPair::new("BL", "TestY"),
    ];
    let sel = extract_selection(&store(), &[Cohort::Parkinsons, Cohort::Swedd], &pairs).unwrap();
    assert_eq!(sel.table.index, vec![2, 4]);
    assert_eq!(sel.labels, vec![Cohort::Parkinsons, Cohort::Swedd]);
    assert_eq!(sel.table.column_names(), vec!["TestX [BL]", "TestY [BL]"]);
    assert_eq!(values_of(&sel.table, "TestX [BL]"), [2.0, 4.0]);
    assert_eq!(values_of(&sel.table, "TestY [BL]"), [20.0, 40.0]);
}

#[test]
fn test_duplicate_pairs_collapse() {
    let pairs = vec![
        SelectionPair::new("BL", "TestY"),
        SelectionPair::new("BL", "TestY"),
    ];
    let sel = extract_selection(&store(), &Cohort::ALL, &pairs).unwrap();
    assert_eq!(sel.table.n_cols(), 1);
    assert_eq!(sel.table.index, vec![1, 2, 4]);
}

#[test]
fn test_empty_result_is_soft() {
    let pairs = vec![SelectionPair::new("BL", "TestX")];
    let sel = extract_selection(&store(), &[Cohort::HealthyControl], &pairs).unwrap();
    assert!(sel.is_empty());
    assert!(sel.labels.is_empty());
    assert_eq!(sel.table.column_names(), vec!["TestX [BL]"]);
}

#[test]
fn test_unknown_pair_is_fatal() {
    let pairs = vec![SelectionPair::new("V04", "TestX")];
    let err = extract_selection(&store(), &Cohort::ALL, &pairs).unwrap_err();
    assert_eq!(
        err,
        SelectionError::UnknownPair {
            event: "V04".to_string(),
            test: "TestX".to_string()
        }
    );

    let pairs = vec![SelectionPair::new("BL", "TestZ")];
    assert!(extract_selection(&store(), &Cohort::ALL, &pairs).is_err());
}

#[test]
fn test_no_cohorts_rejected() {
    let pairs = vec![SelectionPair::new("BL", "TestX")];
    assert_eq!(
        extract_selection(&store(), &[], &pairs).unwrap_err(),
        SelectionError::EmptyCohorts
    );
}

#[test]
fn test_no_pairs_rejected() {
    assert_eq!(
        extract_selection(&store(), &[Cohort::Parkinsons], &[]).unwrap_err(),
        SelectionError::EmptyPairs
    );
}
