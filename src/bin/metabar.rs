//! metabar - metabarcoding survey summary CLI
//!
//! Per-run read thresholds and detection/read summaries by sampler and area.

use clap::{Args, Parser, Subcommand, ValueEnum};
use metabar_summary::data::Dataset;
use metabar_summary::error::{MetabarError, Result};
use metabar_summary::filter::{parse_threshold_percent, RunFilterSummary};
use metabar_summary::partition::{EmptyPartitionPolicy, MatchMode};
use metabar_summary::pipeline::{Pipeline, PipelineConfig};
use metabar_summary::sink::{
    write_pipeline_output, write_report, write_threshold_output, DelimitedSink, OutputNames,
};
use std::path::{Path, PathBuf};

/// CLI-friendly match mode enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMatchMode {
    /// Label occurs anywhere in the sample identifier
    Substring,
    /// Label equals a whole token of the sample identifier
    ExactToken,
}

impl From<CliMatchMode> for MatchMode {
    fn from(mode: CliMatchMode) -> Self {
        match mode {
            CliMatchMode::Substring => MatchMode::Substring,
            CliMatchMode::ExactToken => MatchMode::ExactToken,
        }
    }
}

/// CLI-friendly empty partition policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEmptyPartitions {
    /// Write an empty table for a partition with no records
    Emit,
    /// Drop partitions with no records
    Omit,
}

impl From<CliEmptyPartitions> for EmptyPartitionPolicy {
    fn from(policy: CliEmptyPartitions) -> Self {
        match policy {
            CliEmptyPartitions::Emit => EmptyPartitionPolicy::Emit,
            CliEmptyPartitions::Omit => EmptyPartitionPolicy::Omit,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Tsv,
    Csv,
}

/// Metabarcoding survey summaries
#[derive(Parser)]
#[command(name = "metabar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IoArgs {
    /// Input table (CSV, TSV or TXT)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Input delimiter; detected from the file extension when omitted
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Output file format
    #[arg(long, value_enum, default_value = "tsv")]
    format: OutputFormat,

    /// Print per-run threshold summaries as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SettingsArgs {
    /// Pipeline configuration YAML; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threshold as a percentage of each run's total reads (default 0.05)
    #[arg(short, long)]
    threshold: Option<String>,

    /// Comma-separated sampler labels
    #[arg(short, long, value_delimiter = ',')]
    samplers: Vec<String>,

    /// Split the report by sampler
    #[arg(long)]
    by_sampler: bool,

    /// Split the report by area
    #[arg(long)]
    by_area: bool,

    /// Count each taxon once per point
    #[arg(long)]
    aliquots: bool,

    /// How labels are matched against sample identifiers
    #[arg(long, value_enum)]
    match_mode: Option<CliMatchMode>,

    /// What to do with partitions that match no records
    #[arg(long, value_enum)]
    empty_partitions: Option<CliEmptyPartitions>,

    /// Separator between area and sampler in sample identifiers
    #[arg(long)]
    area_delimiter: Option<char>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the per-run read threshold and write kept, rejected and cutoff tables
    Threshold {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Summarize an already filtered table by sampler and/or area
    Consolidate {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Threshold then summarize
    Run {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "metabar.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Threshold { io, settings } => cmd_threshold(&io, &settings),
        Commands::Consolidate { io, settings } => cmd_consolidate(&io, &settings),
        Commands::Run { io, settings } => cmd_run(&io, &settings),
        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build_pipeline(settings: &SettingsArgs) -> Result<Pipeline> {
    let mut pipeline = match &settings.config {
        Some(path) => {
            eprintln!("Loading pipeline configuration from {:?}...", path);
            let config_str = std::fs::read_to_string(path)?;
            Pipeline::from_config(&PipelineConfig::from_yaml(&config_str)?)
        }
        None => Pipeline::new(),
    };

    if let Some(threshold) = &settings.threshold {
        pipeline = pipeline.threshold_percent(Some(parse_threshold_percent(threshold)?));
    }
    if !settings.samplers.is_empty() {
        pipeline = pipeline.samplers(&settings.samplers);
    }
    if settings.by_sampler {
        pipeline = pipeline.by_sampler(true);
    }
    if settings.by_area {
        pipeline = pipeline.by_area(true);
    }
    if settings.aliquots {
        pipeline = pipeline.aliquots(true);
    }
    if let Some(mode) = settings.match_mode {
        pipeline = pipeline.match_mode(mode.into());
    }
    if let Some(policy) = settings.empty_partitions {
        pipeline = pipeline.empty_partitions(policy.into());
    }
    if let Some(delimiter) = settings.area_delimiter {
        pipeline = pipeline.delimiter(delimiter);
    }

    pipeline.validate()?;
    Ok(pipeline)
}

fn load_dataset(path: &Path, delimiter: Option<char>) -> Result<Dataset> {
    eprintln!("Loading data from {:?}...", path);
    let dataset = match delimiter {
        Some(c) if c.is_ascii() => Dataset::from_path_with_delimiter(path, c as u8)?,
        Some(c) => {
            return Err(MetabarError::InvalidParameter(format!(
                "delimiter must be a single ASCII character, got '{}'",
                c
            )))
        }
        None => Dataset::from_path(path)?,
    };
    eprintln!(
        "Loaded {} records ({} convention)",
        dataset.len(),
        dataset.schema().convention.name()
    );
    Ok(dataset)
}

fn open_sink(io: &IoArgs) -> Result<DelimitedSink> {
    match io.format {
        OutputFormat::Tsv => DelimitedSink::tsv(&io.output),
        OutputFormat::Csv => DelimitedSink::csv(&io.output),
    }
}

fn report_written(sink: &DelimitedSink) {
    eprintln!("Done! {} tables written", sink.written().len());
    for path in sink.written() {
        eprintln!("  {}", path.display());
    }
}

fn print_summaries(summaries: &[RunFilterSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
    } else {
        for summary in summaries {
            eprint!("{}", summary);
        }
    }
    Ok(())
}

fn cmd_threshold(io: &IoArgs, settings: &SettingsArgs) -> Result<()> {
    let pipeline = build_pipeline(settings)?;
    let dataset = load_dataset(&io.input, io.delimiter)?;

    eprintln!("Applying per-run threshold...");
    let output = pipeline.run_threshold(&dataset)?;
    print_summaries(&output.summaries, io.json)?;

    let mut sink = open_sink(io)?;
    write_threshold_output(&mut sink, &output, &OutputNames::default())?;
    report_written(&sink);
    Ok(())
}

fn cmd_consolidate(io: &IoArgs, settings: &SettingsArgs) -> Result<()> {
    let pipeline = build_pipeline(settings)?;
    let dataset = load_dataset(&io.input, io.delimiter)?;

    eprintln!("Consolidating ({:?})...", pipeline.partition_key());
    let consolidation = pipeline.run_consolidation(&dataset)?;
    eprintln!("  {}", consolidation.stats);

    let mut sink = open_sink(io)?;
    write_report(&mut sink, &consolidation.report, &OutputNames::default())?;
    report_written(&sink);
    Ok(())
}

fn cmd_run(io: &IoArgs, settings: &SettingsArgs) -> Result<()> {
    let pipeline = build_pipeline(settings)?;
    let dataset = load_dataset(&io.input, io.delimiter)?;

    eprintln!("Running pipeline '{}'...", pipeline.config().name);
    let output = pipeline.run(&dataset)?;
    if let Some(threshold) = &output.threshold {
        print_summaries(&threshold.summaries, io.json)?;
    }
    eprint!("{}", output);

    let mut sink = open_sink(io)?;
    write_pipeline_output(&mut sink, &output, &OutputNames::default())?;
    report_written(&sink);
    Ok(())
}

fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-survey")
        .threshold_percent(Some(0.05))
        .samplers(&["Trap", "Net", "Water"])
        .by_sampler(true)
        .by_area(true)
        .aliquots(true);

    let yaml = pipeline.to_config().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
