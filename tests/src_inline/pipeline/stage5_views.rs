use super::*;
use crate::model::cohort::count_cohorts;
use crate::pipeline::stage4_stats::{compute_statistics, normalize};

fn names(v: &[String]) -> Vec<&str> {
    v.iter().map(String::as_str).collect()
}

#[test]
fn test_single_feature_profile_only() {
    let catalog = available_views(1, 3);
    assert_eq!(names(&catalog.profile), vec!["Profile"]);
    assert!(catalog.correlation.is_empty());
    assert!(catalog.roc_curve.is_empty());
    assert!(catalog.projection.is_empty());
}

#[test]
fn test_two_features_correlation_and_roc() {
    let catalog = available_views(2, 2);
    assert_eq!(names(&catalog.correlation), vec!["Correlation"]);
    assert_eq!(
        names(&catalog.roc_curve),
        vec!["Logistic Regression", "kNN", "Random Forest"]
    );
    assert!(catalog.projection.is_empty());

    let single_cohort = available_views(2, 1);
    assert!(single_cohort.roc_curve.is_empty());
}

#[test]
fn test_three_features_all_cohorts() {
    let catalog = available_views(3, 3);
    assert!(catalog.profile.is_empty());
    assert!(catalog.correlation.is_empty());
    assert_eq!(catalog.roc_curve.len(), 3);
    assert_eq!(names(&catalog.projection), vec!["Center-of-Mass"]);

    assert!(available_views(3, 2).projection.is_empty());
    assert!(available_views(0, 3).is_empty());
}

#[test]
fn test_catalog_json_shape() {
    let json = serde_json::to_string(&available_views(2, 2)).unwrap();
    assert_eq!(
        json,
        r#"{"Correlation":["Correlation"],"Profile":[],"Projection":[],"ROC Curve":["Logistic Regression","kNN","Random Forest"]}"#
    );
}

#[test]
fn test_parse_image_request() {
    let req = parse_image_request(r#"{"PPMI Image": {"Type": "ROC Curve", "Option": "kNN"}}"#).unwrap();
    assert_eq!(req.kind, ViewKind::RocCurve);
    assert_eq!(req.option, "kNN");

    let req = parse_image_request(r#"{"PPMI Image": {"Type": "Profile"}}"#).unwrap();
    assert_eq!(req.kind, ViewKind::Profile);
    assert_eq!(req.option, "");

    assert!(matches!(
        parse_image_request(r#"{"PPMI Image": {"Type": "Heatmap", "Option": ""}}"#),
        Err(ViewError::Request(_))
    ));
    assert!(matches!(parse_image_request("{}"), Err(ViewError::Request(_))));
}

struct Fixture {
    normalized: Table,
    labels: Vec<Cohort>,
    stats: StatsFrame,
    counts: CohortCounts,
}

fn fixture() -> Fixture {
    let labels = vec![
        Cohort::HealthyControl,
        Cohort::HealthyControl,
        Cohort::Parkinsons,
        Cohort::Parkinsons,
        Cohort::Swedd,
        Cohort::Swedd,
    ];
    let col = |name: &str, values: [f64; 6]| Column {
        name: name.to_string(),
        values: values.to_vec(),
    };
    let table = Table {
        index: vec![11, 12, 21, 22, 31, 32],
        columns: vec![
            col("X [BL]", [1.0, 2.0, 5.0, 6.0, 3.0, 4.0]),
            col("Y [BL]", [0.0, 1.0, 4.0, 4.0, 9.0, 8.0]),
            col("Z [BL]", [1.0, 1.0, 2.0, 5.0, 3.0, 0.0]),
        ],
    };
    let counts = count_cohorts(&labels);
    let stats = compute_statistics(&table, &labels, &counts.present()).unwrap();
    let normalized = normalize(&table, &stats).unwrap();
    Fixture {
        normalized,
        labels,
        stats,
        counts,
    }
}

fn inputs(f: &Fixture) -> ViewInputs<'_> {
    ViewInputs {
        normalized: &f.normalized,
        labels: &f.labels,
        stats: &f.stats,
        counts: &f.counts,
    }
}

fn cohort_mean(values: &[f64], labels: &[Cohort], cohort: Cohort) -> f64 {
    let picked: Vec<f64> = values
        .iter()
        .zip(labels)
        .filter(|(_, l)| **l == cohort)
        .map(|(v, _)| *v)
        .collect();
    picked.iter().sum::<f64>() / picked.len() as f64
}

#[test]
fn test_center_of_mass_projection() {
    let f = fixture();
    let request = ImageRequest {
        kind: ViewKind::Projection,
        option: CENTER_OF_MASS.to_string(),
    };
    let plot = prepare_view(&request, &inputs(&f)).unwrap();
    assert_eq!(plot.series.len(), 2);
    assert_eq!(plot.series[0].name, "Center of Mass");
    assert_eq!(plot.subjects, f.normalized.index);

    // the HC centre lies on the first axis, the PD centre above it
    let hc_second = cohort_mean(&plot.series[1].values, &f.labels, Cohort::HealthyControl);
    assert!(hc_second.abs() < 1e-9);
    let hc_first = cohort_mean(&plot.series[0].values, &f.labels, Cohort::HealthyControl);
    assert!(hc_first > 0.0);
    let pd_second = cohort_mean(&plot.series[1].values, &f.labels, Cohort::Parkinsons);
    assert!(pd_second > 0.0);
}

#[test]
fn test_roc_request_carries_full_table() {
    let f = fixture();
    let request = ImageRequest {
        kind: ViewKind::RocCurve,
        option: "Random Forest".to_string(),
    };
    let plot = prepare_view(&request, &inputs(&f)).unwrap();
    assert_eq!(plot.series, f.normalized.columns);
    assert_eq!(plot.labels, f.labels);
    assert_eq!(plot.counts.subjects, 6);
}

#[test]
fn test_unavailable_views_rejected() {
    let f = fixture();
    let unknown_classifier = ImageRequest {
        kind: ViewKind::RocCurve,
        option: "SVM".to_string(),
    };
    assert!(matches!(
        prepare_view(&unknown_classifier, &inputs(&f)),
        Err(ViewError::NotAvailable { .. })
    ));

    let profile = ImageRequest {
        kind: ViewKind::Profile,
        option: String::new(),
    };
    assert!(matches!(
        prepare_view(&profile, &inputs(&f)),
        Err(ViewError::NotAvailable { .. })
    ));
}

#[test]
fn test_profile_view_and_json_renderer() {
    let f = fixture();
    let single = Table {
        index: f.normalized.index.clone(),
        columns: f.normalized.columns[..1].to_vec(),
    };
    let stats = StatsFrame {
        columns: f.stats.columns[..1].to_vec(),
    };
    let view_inputs = ViewInputs {
        normalized: &single,
        labels: &f.labels,
        stats: &stats,
        counts: &f.counts,
    };
    let request = ImageRequest {
        kind: ViewKind::Profile,
        option: "Profile".to_string(),
    };
    let plot = prepare_view(&request, &view_inputs).unwrap();
    assert_eq!(plot.series.len(), 1);

    let bytes = JsonRenderer.render(&plot).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["kind"], "Profile");
    assert_eq!(value["labels"][0], "HC");
    assert_eq!(value["counts"]["SWEDD"], 2);
    assert_eq!(value["series"][0]["name"], "X [BL]");
}
