mod input;
mod logging;
mod model;
mod pipeline;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::input::manifest::load_biomarker_control;
use crate::input::snapshot::read_snapshot;
use crate::model::diagnostics::LogSink;
use crate::pipeline::plink_labels::run_label_plink;
use crate::pipeline::stage1_biomarkers::prepare_biomarkers;
use crate::pipeline::stage2_store::{BuildConfig, run_build};
use crate::pipeline::stage6_report::{AnalyzeConfig, run_analyze};
use crate::report::json::list_available_data;

const DEFAULT_ROSTER: &str = "../PPMI Data/Subject_Characteristics/Patient_Status.csv";

#[derive(Debug, Parser)]
#[command(name = "ppmi-cohortstat", version, about = "PPMI cohort statistics pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the three-axis store from the selection manifest
    Build {
        #[arg(short = 'c', value_name = "SELECTDATA", default_value = "../PPMI Analysis/selectdata.json")]
        control: PathBuf,
        #[arg(short = 's', value_name = "ROSTER", default_value = DEFAULT_ROSTER)]
        roster: PathBuf,
        #[arg(short = 'o', value_name = "STORE", default_value = "../PPMI Analysis/PPMI_data.bin")]
        output: PathBuf,
        #[arg(short = 'l', value_name = "LOG", default_value = "../PPMI Analysis/PPMI_data_structures.log")]
        log: PathBuf,
    },
    /// Clean the raw biospecimen exports into a wide table
    Biomarkers {
        control: PathBuf,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List the tests holding data at each event
    Available {
        #[arg(long)]
        store: PathBuf,
    },
    /// Select, summarise and normalise cohort data
    Analyze {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        employ: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Mark PLINK subjects as affected or unaffected by cohort
    LabelPlink {
        #[arg(default_value = "../PPMI Genetics/prepare_plink.json")]
        control: PathBuf,
        #[arg(default_value = DEFAULT_ROSTER)]
        roster: PathBuf,
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    dispatch(cli.command)
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Build {
            control,
            roster,
            output,
            log,
        } => {
            logging::init_logging(Some(&log)).map_err(|e| e.to_string())?;
            let config = BuildConfig {
                control,
                roster,
                output,
            };
            let mut sink = LogSink;
            let summary = run_build(&config, &mut sink).map_err(|e| e.to_string())?;
            tracing::info!(
                events = summary.store.events.len(),
                subjects = summary.store.subjects.len(),
                tests = summary.store.tests.len(),
                diagnostics = summary.diagnostics,
                path = %config.output.display(),
                "store build complete"
            );
        }
        Command::Biomarkers { control, log } => {
            logging::init_logging(log.as_deref()).map_err(|e| e.to_string())?;
            let control = load_biomarker_control(&control).map_err(|e| e.to_string())?;
            let out = prepare_biomarkers(&control).map_err(|e| e.to_string())?;
            tracing::info!(
                read = out.records_read,
                kept = out.records_kept,
                rows = out.table.keys.len(),
                "biomarker preparation complete"
            );
        }
        Command::Available { store } => {
            logging::init_logging(None).map_err(|e| e.to_string())?;
            let store = read_snapshot(&store).map_err(|e| e.to_string())?;
            let json = list_available_data(&store).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        Command::Analyze {
            store,
            employ,
            out,
            image,
            log,
        } => {
            logging::init_logging(log.as_deref()).map_err(|e| e.to_string())?;
            let config = AnalyzeConfig {
                store,
                employ,
                out_dir: out,
                image,
            };
            let summary = run_analyze(&config).map_err(|e| e.to_string())?;
            tracing::info!(
                subjects = summary.counts.subjects,
                features = summary.features.len(),
                dir = %config.out_dir.display(),
                "analysis complete"
            );
        }
        Command::LabelPlink {
            control,
            roster,
            log,
        } => {
            logging::init_logging(log.as_deref()).map_err(|e| e.to_string())?;
            let summary = run_label_plink(&control, &roster).map_err(|e| e.to_string())?;
            if summary.unknown > 0 {
                tracing::warn!(unknown = summary.unknown, "some PLINK subjects were not in the roster");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
