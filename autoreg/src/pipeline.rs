//! End-to-end pipeline: dataset to finished report.
//!
//! Phases run strictly in order. Everything up to and including the
//! regressions is deterministic and fails hard; the model-driven phases
//! degrade per slot, and document conversion degrades per format.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::analysis::{analyze_tables, combine_tables, design_tables, draw_tables};
use crate::core::design::{TableDesign, select_first, select_positions};
use crate::io::dataset;
use crate::io::document::{FormatOutcome, OutputFormat, assemble_document, emit_documents};
use crate::io::research::load_research_config;
use crate::io::select::prompt_selection;
use crate::io::settings::Settings;
use crate::llm::{ChatModel, PromptEngine};
use crate::regress::{ResearchConfig, run_regressions};

/// Which designed tables to keep for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    /// Keep every designed table.
    All,
    /// Keep the first `k` tables.
    First(usize),
    /// Keep the tables at these zero-based positions, in order.
    Positions(Vec<usize>),
    /// Show the design on stdout and read a selection from stdin.
    Interactive,
}

/// Everything a pipeline run needs beyond the settings file.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub research_path: PathBuf,
    pub dataset_path: PathBuf,
    pub entity_col: String,
    pub time_col: String,
    pub out_dir: PathBuf,
    pub selection: TableSelection,
    /// Overrides the settings file when non-empty.
    pub formats: Vec<OutputFormat>,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct PipelineReport {
    pub regressions: usize,
    pub designed_tables: usize,
    pub kept_tables: usize,
    pub outcomes: Vec<FormatOutcome>,
}

/// Run the whole pipeline.
pub async fn run_pipeline<C: ChatModel>(
    chat: &C,
    settings: &Settings,
    options: &PipelineOptions,
) -> Result<PipelineReport> {
    let config = load_research_config(&options.research_path)?;
    let data = dataset::load_panel_csv(
        &options.dataset_path,
        &options.entity_col,
        &options.time_col,
    )?;
    config.validate_columns(&data)?;

    let specs = config.generate_specs();
    info!(regressions = specs.len(), "regression battery expanded");
    let results = run_regressions(&data, &specs)?;

    let engine = PromptEngine::new();
    let design = design_tables(
        chat,
        &engine,
        &config.research_topic,
        &results,
        settings.max_design_attempts,
    )
    .await?;
    let designed_tables = design.number_of_tables;

    let design = apply_selection(&design, &options.selection)?;
    info!(
        designed = designed_tables,
        kept = design.number_of_tables,
        "table design settled"
    );

    let drawn = draw_tables(chat, &engine, &results, &design, settings.max_render_attempts).await?;
    let analyzed = analyze_tables(
        chat,
        &engine,
        &results,
        drawn,
        &settings.analysis_language,
        settings.max_render_attempts,
    )
    .await?;
    let combined =
        combine_tables(chat, &engine, &analyzed, &design, settings.max_render_attempts).await?;

    let latex = assemble_document(&config.research_topic, &combined);
    let formats = if options.formats.is_empty() {
        &settings.output.formats
    } else {
        &options.formats
    };
    let outcomes = emit_documents(
        &options.out_dir,
        &report_stem(&config),
        &latex,
        formats,
        settings.convert_timeout(),
    )?;

    Ok(PipelineReport {
        regressions: results.len(),
        designed_tables,
        kept_tables: combined.len(),
        outcomes,
    })
}

fn apply_selection(design: &TableDesign, selection: &TableSelection) -> Result<TableDesign> {
    match selection {
        TableSelection::All => Ok(design.clone()),
        TableSelection::First(k) => {
            select_first(design, *k).context("apply --keep-first selection")
        }
        TableSelection::Positions(positions) => {
            select_positions(design, positions).context("apply --tables selection")
        }
        TableSelection::Interactive => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let positions = prompt_selection(design, stdin.lock(), &mut stdout)?;
            stdout.flush().ok();
            select_positions(design, &positions).context("apply interactive selection")
        }
    }
}

/// Output file stem derived from the research topic.
fn report_stem(config: &ResearchConfig) -> String {
    let stem: String = config
        .research_topic
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_').to_string();
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem
    }
}

/// Validate the research config and dataset without touching the model.
pub fn check_inputs(options: &PipelineOptions) -> Result<usize> {
    let config = load_research_config(&options.research_path)?;
    let data = dataset::load_panel_csv(
        &options.dataset_path,
        &options.entity_col,
        &options.time_col,
    )?;
    config.validate_columns(&data)?;
    Ok(config.generate_specs().len())
}

/// One-line human summary of the format outcomes.
pub fn summarize_outcomes(outcomes: &[FormatOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            FormatOutcome::Written { format, path } => {
                format!("{format}: {}", path.display())
            }
            FormatOutcome::Failed { format, reason } => {
                format!("{format}: FAILED ({reason})")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
