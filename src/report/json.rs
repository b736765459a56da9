use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Store;
use crate::pipeline::stage4_stats::StatsFrame;
use crate::pipeline::stage5_views::ViewCatalog;
use crate::report::AnalysisSummary;

#[derive(Serialize)]
struct AvailableDataDoc<'a> {
    #[serde(rename = "PPMI All Data")]
    data: &'a BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct ViewCatalogDoc<'a> {
    #[serde(rename = "PPMI Tests")]
    tests: &'a ViewCatalog,
}

/// `{"PPMI All Data": {event: [tests]}}` for every event holding data.
pub fn list_available_data(store: &Store) -> Result<String, serde_json::Error> {
    let data = store.available_data();
    serde_json::to_string(&AvailableDataDoc { data: &data })
}

pub fn render_view_catalog(catalog: &ViewCatalog) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ViewCatalogDoc { tests: catalog })
}

pub fn render_stats_json(stats: &StatsFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(stats)
}

pub fn render_summary_json(summary: &AnalysisSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
