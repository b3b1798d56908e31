use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use autoreg::io::document::OutputFormat;
use autoreg::io::select::parse_selection;
use autoreg::io::settings::load_settings;
use autoreg::llm::OpenAiChat;
use autoreg::pipeline::{
    PipelineOptions, TableSelection, check_inputs, run_pipeline, summarize_outcomes,
};

#[derive(Parser)]
#[command(
    name = "autoreg",
    version,
    about = "Automated panel-regression reporting pipeline"
)]
struct Cli {
    /// Path to the settings file.
    #[arg(long, default_value = "autoreg.toml", global = true)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: regressions, table design, rendering, report.
    Run {
        #[command(flatten)]
        inputs: InputArgs,

        /// Directory for the emitted report files.
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,

        /// Keep only the first N designed tables.
        #[arg(long, conflicts_with_all = ["tables", "interactive"])]
        keep_first: Option<usize>,

        /// Keep only these tables (1-based, e.g. "1,3").
        #[arg(long, conflicts_with = "interactive")]
        tables: Option<String>,

        /// Show the table design and pick tables on the terminal.
        #[arg(long)]
        interactive: bool,

        /// Formats to emit, overriding the settings file.
        #[arg(long, value_enum, value_delimiter = ',')]
        format: Vec<OutputFormat>,
    },
    /// Check the research config and dataset without calling the model.
    Validate {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Research configuration (JSON).
    #[arg(long)]
    research: PathBuf,

    /// Panel dataset (CSV).
    #[arg(long)]
    dataset: PathBuf,

    /// Entity index column of the dataset.
    #[arg(long, default_value = "entity")]
    entity_col: String,

    /// Time index column of the dataset.
    #[arg(long, default_value = "time")]
    time_col: String,
}

impl InputArgs {
    fn into_options(self, out_dir: PathBuf) -> PipelineOptions {
        PipelineOptions {
            research_path: self.research,
            dataset_path: self.dataset,
            entity_col: self.entity_col,
            time_col: self.time_col,
            out_dir,
            selection: TableSelection::All,
            formats: Vec::new(),
        }
    }
}

fn main() {
    autoreg::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.settings)?;

    match cli.command {
        Command::Run {
            inputs,
            out_dir,
            keep_first,
            tables,
            interactive,
            format,
        } => {
            let mut options = inputs.into_options(out_dir);
            options.selection = selection_from_flags(keep_first, tables.as_deref(), interactive)?;
            options.formats = format;

            let chat = OpenAiChat::new(settings.chat_settings()?)?;
            let report = run_pipeline(&chat, &settings, &options).await?;
            println!(
                "ran {} regressions into {} tables ({} kept)",
                report.regressions, report.designed_tables, report.kept_tables
            );
            println!("{}", summarize_outcomes(&report.outcomes));
            if report
                .outcomes
                .iter()
                .all(|o| matches!(o, autoreg::io::document::FormatOutcome::Failed { .. }))
            {
                bail!("every requested output format failed");
            }
            Ok(())
        }
        Command::Validate { inputs } => {
            let options = inputs.into_options(PathBuf::new());
            let regressions = check_inputs(&options)?;
            println!("ok: config and dataset are consistent ({regressions} regressions)");
            Ok(())
        }
    }
}

fn selection_from_flags(
    keep_first: Option<usize>,
    tables: Option<&str>,
    interactive: bool,
) -> Result<TableSelection> {
    if let Some(k) = keep_first {
        return Ok(TableSelection::First(k));
    }
    if let Some(spec) = tables {
        return Ok(TableSelection::Positions(parse_selection(spec)?));
    }
    if interactive {
        return Ok(TableSelection::Interactive);
    }
    Ok(TableSelection::All)
}
