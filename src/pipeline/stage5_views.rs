//! View advisor and image-request handling.
//!
//! The advisor decides which plots and classifiers make sense for the shape
//! of a selection. An accepted image request is turned into the numeric
//! series a renderer needs; drawing is left to a [`ViewRenderer`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Cohort, CohortCounts, Column, SubjectId, Table};
use crate::pipeline::stage4_stats::StatsFrame;

pub const ROC_CLASSIFIERS: [&str; 3] = ["Logistic Regression", "kNN", "Random Forest"];
pub const CENTER_OF_MASS: &str = "Center-of-Mass";

#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    #[error("malformed image request: {0}")]
    Request(String),
    #[error("view {kind} / {option:?} is not available for this selection")]
    NotAvailable { kind: ViewKind, option: String },
    #[error("projection is degenerate: {0}")]
    Degenerate(String),
    #[error("rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewKind {
    Correlation,
    Profile,
    Projection,
    #[serde(rename = "ROC Curve")]
    RocCurve,
}

impl ViewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Correlation => "Correlation",
            ViewKind::Profile => "Profile",
            ViewKind::Projection => "Projection",
            ViewKind::RocCurve => "ROC Curve",
        }
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options offered per view type. Field order matches sorted key order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ViewCatalog {
    #[serde(rename = "Correlation")]
    pub correlation: Vec<String>,
    #[serde(rename = "Profile")]
    pub profile: Vec<String>,
    #[serde(rename = "Projection")]
    pub projection: Vec<String>,
    #[serde(rename = "ROC Curve")]
    pub roc_curve: Vec<String>,
}

impl ViewCatalog {
    pub fn options(&self, kind: ViewKind) -> &[String] {
        match kind {
            ViewKind::Correlation => &self.correlation,
            ViewKind::Profile => &self.profile,
            ViewKind::Projection => &self.projection,
            ViewKind::RocCurve => &self.roc_curve,
        }
    }

    /// Profile and correlation views have no subtypes, so any option is accepted.
    pub fn offers(&self, kind: ViewKind, option: &str) -> bool {
        let options = self.options(kind);
        match kind {
            ViewKind::Profile | ViewKind::Correlation => !options.is_empty(),
            ViewKind::Projection | ViewKind::RocCurve => options.iter().any(|o| o == option),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.correlation.is_empty()
            && self.profile.is_empty()
            && self.projection.is_empty()
            && self.roc_curve.is_empty()
    }
}

pub fn available_views(n_features: usize, n_cohorts: usize) -> ViewCatalog {
    let mut catalog = ViewCatalog::default();
    if n_features == 1 {
        catalog.profile.push("Profile".to_string());
        return catalog;
    }
    if n_features < 2 {
        return catalog;
    }
    if n_features == 2 {
        catalog.correlation.push("Correlation".to_string());
    }
    if n_cohorts > 1 {
        catalog
            .roc_curve
            .extend(ROC_CLASSIFIERS.iter().map(|c| c.to_string()));
    }
    if n_features > 2 && n_cohorts == Cohort::ALL.len() {
        catalog.projection.push(CENTER_OF_MASS.to_string());
    }
    catalog
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageRequest {
    #[serde(rename = "Type")]
    pub kind: ViewKind,
    #[serde(rename = "Option", default)]
    pub option: String,
}

#[derive(Debug, Deserialize)]
struct ImageEnvelope {
    #[serde(rename = "PPMI Image")]
    image: ImageRequest,
}

pub fn parse_image_request(text: &str) -> Result<ImageRequest, ViewError> {
    serde_json::from_str::<ImageEnvelope>(text)
        .map(|env| env.image)
        .map_err(|e| ViewError::Request(e.to_string()))
}

/// Everything a renderer receives: one or more numeric series over the
/// selected subjects, and each subject's cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotData {
    pub kind: ViewKind,
    pub option: String,
    pub subjects: Vec<SubjectId>,
    pub labels: Vec<Cohort>,
    pub counts: CohortCounts,
    pub series: Vec<Column>,
}

pub struct ViewInputs<'a> {
    pub normalized: &'a Table,
    pub labels: &'a [Cohort],
    pub stats: &'a StatsFrame,
    pub counts: &'a CohortCounts,
}

pub fn prepare_view(request: &ImageRequest, inputs: &ViewInputs<'_>) -> Result<PlotData, ViewError> {
    let catalog = available_views(inputs.normalized.n_cols(), inputs.counts.present().len());
    if !catalog.offers(request.kind, &request.option) {
        return Err(ViewError::NotAvailable {
            kind: request.kind,
            option: request.option.clone(),
        });
    }

    let series = match request.kind {
        ViewKind::Profile => inputs.normalized.columns[..1].to_vec(),
        ViewKind::Correlation => inputs.normalized.columns[..2].to_vec(),
        ViewKind::Projection => center_of_mass_projection(inputs)?,
        ViewKind::RocCurve => inputs.normalized.columns.clone(),
    };

    tracing::info!(
        kind = %request.kind,
        option = %request.option,
        series = series.len(),
        "prepared view"
    );
    Ok(PlotData {
        kind: request.kind,
        option: request.option.clone(),
        subjects: inputs.normalized.index.clone(),
        labels: inputs.labels.to_vec(),
        counts: *inputs.counts,
        series,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cohort_direction(stats: &StatsFrame, cohort: Cohort) -> Result<Vec<f64>, ViewError> {
    stats
        .columns
        .iter()
        .map(|c| {
            let mean = c.cohort_means.get(cohort);
            match (mean, c.std) {
                (Some(m), Some(std)) if std != 0.0 => Ok((m - c.mean) / std),
                _ => Err(ViewError::Degenerate(format!(
                    "no normalized {cohort} mean for {}",
                    c.name
                ))),
            }
        })
        .collect()
}

/// Projects subjects onto the plane through the HC and PD cohort centres.
///
/// The first axis is the unit HC direction; the second is the PD direction
/// with its HC component removed (Gram-Schmidt), also scaled to unit length.
fn center_of_mass_projection(inputs: &ViewInputs<'_>) -> Result<Vec<Column>, ViewError> {
    let hc = cohort_direction(inputs.stats, Cohort::HealthyControl)?;
    let pd = cohort_direction(inputs.stats, Cohort::Parkinsons)?;

    let hc_len = dot(&hc, &hc).sqrt();
    if hc_len == 0.0 {
        return Err(ViewError::Degenerate("HC centre coincides with the global mean".to_string()));
    }
    let unit_1: Vec<f64> = hc.iter().map(|v| v / hc_len).collect();

    let along = dot(&pd, &unit_1);
    let ortho: Vec<f64> = pd.iter().zip(&unit_1).map(|(p, u)| p - along * u).collect();
    let ortho_len = dot(&ortho, &ortho).sqrt();
    if ortho_len == 0.0 {
        return Err(ViewError::Degenerate("PD centre is collinear with HC".to_string()));
    }
    let unit_2: Vec<f64> = ortho.iter().map(|v| v / ortho_len).collect();

    let table = inputs.normalized;
    let mut first = Vec::with_capacity(table.n_rows());
    let mut second = Vec::with_capacity(table.n_rows());
    for row in 0..table.n_rows() {
        let values = table.row(row);
        first.push(dot(&values, &unit_1));
        second.push(dot(&values, &unit_2));
    }

    Ok(vec![
        Column {
            name: "Center of Mass".to_string(),
            values: first,
        },
        Column {
            name: "View".to_string(),
            values: second,
        },
    ])
}

pub trait ViewRenderer {
    fn render(&self, plot: &PlotData) -> Result<Vec<u8>, ViewError>;
}

/// Emits the plot payload as JSON for an external drawing tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl ViewRenderer for JsonRenderer {
    fn render(&self, plot: &PlotData) -> Result<Vec<u8>, ViewError> {
        serde_json::to_vec_pretty(plot).map_err(|e| ViewError::Render(e.to_string()))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_views.rs"]
mod tests;
