pub mod json;
pub mod text;

use serde::Serialize;

use crate::model::{Cohort, CohortCounts};
use crate::pipeline::stage5_views::ViewCatalog;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub name: String,
    pub mean: f64,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub tool: String,
    pub version: String,
    pub store: String,
    pub cohorts_requested: Vec<Cohort>,
    pub pairs_requested: usize,
    pub counts: CohortCounts,
    pub cohorts_present: Vec<Cohort>,
    pub features: Vec<FeatureSummary>,
    pub empty: bool,
    pub views: ViewCatalog,
    pub image: Option<String>,
    pub outputs: Vec<String>,
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

pub fn format_opt_f64_6(v: Option<f64>) -> String {
    v.map_or_else(|| "NA".to_string(), format_f64_6)
}

pub fn join_cohorts(cohorts: &[Cohort]) -> String {
    if cohorts.is_empty() {
        return "none".to_string();
    }
    cohorts
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
