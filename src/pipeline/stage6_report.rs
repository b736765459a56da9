use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::input::InputError;
use crate::input::manifest::load_employ_manifest;
use crate::input::snapshot::read_snapshot;
use crate::model::cohort::count_cohorts;
use crate::model::{Cohort, Table};
use crate::pipeline::stage3_select::{SelectionError, extract_selection};
use crate::pipeline::stage4_stats::{StatsError, StatsFrame, compute_statistics, normalize};
use crate::pipeline::stage5_views::{
    JsonRenderer, ViewError, ViewInputs, ViewRenderer, available_views, parse_image_request,
    prepare_view,
};
use crate::report::json::{render_stats_json, render_summary_json, render_view_catalog};
use crate::report::text::render_report_text;
use crate::report::{AnalysisSummary, FeatureSummary, format_f64_6};

pub const SELECTION_FILE: &str = "selection.tsv";
pub const NORMALIZED_FILE: &str = "normalized.tsv";
pub const STATS_FILE: &str = "stats.json";
pub const VIEWS_FILE: &str = "views.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const REPORT_FILE: &str = "report.txt";
pub const IMAGE_FILE: &str = "view.json";

/// Results of one analysis run. `computed` is `None` for an empty selection.
pub struct AnalysisOutput<'a> {
    pub summary: &'a AnalysisSummary,
    pub table: &'a Table,
    pub labels: &'a [Cohort],
    pub computed: Option<ComputedOutput<'a>>,
    pub image: Option<(&'a str, &'a [u8])>,
}

pub struct ComputedOutput<'a> {
    pub stats: &'a StatsFrame,
    pub normalized: &'a Table,
}

/// Writes the analysis files into `out_dir`; returns the names written.
pub fn write_analysis(out_dir: &Path, output: &AnalysisOutput<'_>) -> std::io::Result<Vec<String>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    if let Some(computed) = &output.computed {
        write_table_tsv(&out_dir.join(SELECTION_FILE), output.table, output.labels)?;
        written.push(SELECTION_FILE.to_string());

        write_table_tsv(&out_dir.join(NORMALIZED_FILE), computed.normalized, output.labels)?;
        written.push(NORMALIZED_FILE.to_string());

        write_text(&out_dir.join(STATS_FILE), &render_stats_json(computed.stats).map_err(to_io)?)?;
        written.push(STATS_FILE.to_string());

        let views = render_view_catalog(&output.summary.views).map_err(to_io)?;
        write_text(&out_dir.join(VIEWS_FILE), &views)?;
        written.push(VIEWS_FILE.to_string());
    }

    if let Some((name, bytes)) = output.image {
        let mut f = BufWriter::new(File::create(out_dir.join(name))?);
        f.write_all(bytes)?;
        f.flush()?;
        written.push(name.to_string());
    }

    written.push(SUMMARY_FILE.to_string());
    written.push(REPORT_FILE.to_string());
    let mut summary = output.summary.clone();
    summary.outputs = written.clone();
    write_text(&out_dir.join(SUMMARY_FILE), &render_summary_json(&summary).map_err(to_io)?)?;

    let stats = output.computed.as_ref().map(|c| c.stats);
    write_text(&out_dir.join(REPORT_FILE), &render_report_text(&summary, stats))?;

    tracing::info!(dir = %out_dir.display(), files = written.len(), "wrote analysis outputs");
    Ok(written)
}

fn write_table_tsv(path: &Path, table: &Table, labels: &[Cohort]) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let mut header = String::from("PATNO\tcohort");
    for name in table.column_names() {
        header.push('\t');
        header.push_str(name);
    }
    writeln!(w, "{}", header)?;

    for (row, subject) in table.index.iter().enumerate() {
        let mut line = format!("{subject}\t{}", labels[row]);
        for column in &table.columns {
            line.push('\t');
            line.push_str(&format_f64_6(column.values[row]));
        }
        writeln!(w, "{}", line)?;
    }
    w.flush()
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

fn to_io(e: serde_json::Error) -> std::io::Error {
    std::io::Error::other(e)
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("writing analysis outputs to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File locations for the `analyze` command.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeConfig {
    pub store: PathBuf,
    pub employ: PathBuf,
    pub out_dir: PathBuf,
    pub image: Option<PathBuf>,
}

pub fn run_analyze(config: &AnalyzeConfig) -> Result<AnalysisSummary, AnalyzeError> {
    let store = read_snapshot(&config.store)?;
    let employ = load_employ_manifest(&config.employ)?;
    let selection = extract_selection(&store, &employ.cohorts, &employ.pairs)?;
    let counts = count_cohorts(&selection.labels);
    let present = counts.present();

    let mut summary = AnalysisSummary {
        tool: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: config.store.display().to_string(),
        cohorts_requested: employ.cohorts.clone(),
        pairs_requested: employ.pairs.len(),
        counts,
        cohorts_present: present.clone(),
        features: Vec::new(),
        empty: selection.is_empty(),
        views: Default::default(),
        image: None,
        outputs: Vec::new(),
    };

    let output_err = |source| AnalyzeError::Output {
        path: config.out_dir.clone(),
        source,
    };

    if selection.is_empty() {
        if config.image.is_some() {
            tracing::warn!("image request ignored for an empty selection");
        }
        let outputs = write_analysis(
            &config.out_dir,
            &AnalysisOutput {
                summary: &summary,
                table: &selection.table,
                labels: &selection.labels,
                computed: None,
                image: None,
            },
        )
        .map_err(output_err)?;
        summary.outputs = outputs;
        return Ok(summary);
    }

    let stats = compute_statistics(&selection.table, &selection.labels, &present)?;
    let normalized = normalize(&selection.table, &stats)?;
    summary.views = available_views(normalized.n_cols(), present.len());
    summary.features = stats
        .columns
        .iter()
        .map(|c| FeatureSummary {
            name: c.name.clone(),
            mean: c.mean,
            std: c.std,
        })
        .collect();

    let rendered = match &config.image {
        Some(path) => {
            let text =
                fs::read_to_string(path).map_err(|e| InputError::data_source(path, e))?;
            let request = parse_image_request(&text)?;
            let plot = prepare_view(
                &request,
                &ViewInputs {
                    normalized: &normalized,
                    labels: &selection.labels,
                    stats: &stats,
                    counts: &counts,
                },
            )?;
            summary.image = Some(format!("{} / {}", request.kind, request.option));
            Some(JsonRenderer.render(&plot)?)
        }
        None => None,
    };

    let outputs = write_analysis(
        &config.out_dir,
        &AnalysisOutput {
            summary: &summary,
            table: &selection.table,
            labels: &selection.labels,
            computed: Some(ComputedOutput {
                stats: &stats,
                normalized: &normalized,
            }),
            image: rendered.as_deref().map(|bytes| (IMAGE_FILE, bytes)),
        },
    )
    .map_err(output_err)?;
    summary.outputs = outputs;
    Ok(summary)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_report.rs"]
mod tests;
