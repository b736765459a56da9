use crate::model::Cohort;
use crate::pipeline::stage4_stats::StatsFrame;
use crate::pipeline::stage5_views::ViewKind;
use crate::report::{AnalysisSummary, format_f64_6, format_opt_f64_6, join_cohorts};

pub fn render_report_text(summary: &AnalysisSummary, stats: Option<&StatsFrame>) -> String {
    let mut out = String::new();

    out.push_str("PPMI Cohort Analysis Report\n");
    out.push_str("===========================\n\n");

    out.push_str("1. Selection\n");
    out.push_str(&format!("Store: {}\n", summary.store));
    out.push_str(&format!(
        "Cohorts requested: {}\n",
        join_cohorts(&summary.cohorts_requested)
    ));
    out.push_str(&format!("Event/test pairs requested: {}\n", summary.pairs_requested));
    out.push_str(&format!(
        "Subjects with complete data: {} (HC {}, PD {}, SWEDD {})\n",
        summary.counts.subjects, summary.counts.hc, summary.counts.pd, summary.counts.swedd
    ));
    if summary.empty {
        out.push_str("No subject has a value for every selected test; statistics skipped.\n");
        return out;
    }
    out.push('\n');

    out.push_str("2. Feature statistics\n");
    if let Some(stats) = stats {
        let present = &summary.cohorts_present;
        let mut header = vec!["feature".to_string(), "mean".to_string(), "std".to_string()];
        header.extend(present.iter().map(|c| format!("{c} mean")));
        out.push_str(&header.join("\t"));
        out.push('\n');
        for col in &stats.columns {
            let mut fields = vec![
                col.name.clone(),
                format_f64_6(col.mean),
                format_opt_f64_6(col.std),
            ];
            fields.extend(
                present
                    .iter()
                    .map(|&c| format_opt_f64_6(col.cohort_means.get(c))),
            );
            out.push_str(&fields.join("\t"));
            out.push('\n');
        }
    } else {
        out.push_str("Statistics unavailable.\n");
    }
    out.push('\n');

    out.push_str("3. Available views\n");
    let mut any = false;
    for kind in [
        ViewKind::Correlation,
        ViewKind::Profile,
        ViewKind::Projection,
        ViewKind::RocCurve,
    ] {
        let options = summary.views.options(kind);
        if options.is_empty() {
            continue;
        }
        any = true;
        out.push_str(&format!("{kind}: {}\n", options.join(", ")));
    }
    if !any {
        out.push_str("None for this selection.\n");
    }
    if summary.counts.present().len() < Cohort::ALL.len() {
        out.push_str("Center-of-mass projection needs all three cohorts.\n");
    }
    if let Some(image) = &summary.image {
        out.push_str(&format!("Rendered view: {image}\n"));
    }

    out
}
