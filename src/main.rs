use anyhow::{Context, Result};
use clap::Parser;
use innostat::cli::{Cli, Command, OutputFormat};
use innostat::config::AnalysisConfig;
use innostat::csv_input::{indicator_metadata, read_raw_table, read_segment_table};
use innostat::json_output::JsonSignificanceReport;
use innostat::{aggregate, cleaner, correlation, csv_output, overview, pipeline};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; stdout stays reserved for results
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_file(path),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Write to a file when given, stdout otherwise
fn emit(output: Option<&PathBuf>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            print!("{}", contents);
            Ok(())
        }
    }
}

fn load_records(
    input: &Path,
    metadata: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<cleaner::CleanOutcome> {
    let raw = read_raw_table(input)?;
    let metadata = match metadata {
        Some(path) => Some(indicator_metadata(&read_raw_table(path)?)?),
        None => None,
    };
    let outcome = cleaner::clean(&raw, &config.cleaning, metadata.as_ref())
        .with_context(|| format!("Failed to clean {}", input.display()))?;
    Ok(outcome)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Clean {
            input,
            metadata,
            output,
        } => {
            let outcome = load_records(&input, metadata.as_deref(), &config)?;
            let stats = &outcome.stats;
            eprintln!(
                "Kept {} of {} rows \
                 ({} outside population, {} excluded, {} missing, {} unparseable)",
                stats.kept,
                stats.input_rows,
                stats.outside_population,
                stats.excluded_indicator,
                stats.missing_numeric,
                stats.unparseable_numeric
            );
            emit(output.as_ref(), &csv_output::records_to_csv(&outcome.records))?;
        }

        Command::Overview {
            input,
            metadata,
            json,
        } => {
            let outcome = load_records(&input, metadata.as_deref(), &config)?;
            let summary = overview::overview(&outcome.records, &config);
            if json {
                let rendered = serde_json::to_string_pretty(&summary)
                    .context("Failed to serialize dataset overview")?;
                println!("{}", rendered);
            } else {
                print!("{}", summary.to_report_string());
            }
        }

        Command::Aggregate {
            input,
            output,
            breakdown,
        } => {
            let outcome = load_records(&input, None, &config)?;
            let table = aggregate::aggregate(&outcome.records, &config);
            if let Some(path) = breakdown {
                let size = aggregate::breakdown(&outcome.records, &config);
                emit(Some(&path), &csv_output::breakdown_to_csv(&size))?;
            }
            emit(output.as_ref(), &csv_output::segment_table_to_csv(&table))?;
        }

        Command::Correlate { input, output } => {
            let table = read_segment_table(&input, &config.cleaning.missing_marker)?;
            let matrix = correlation::correlate(&table, config.correlation.missing);
            emit(output.as_ref(), &csv_output::matrix_to_csv(&matrix))?;
        }

        Command::Significance {
            input,
            output,
            relationships,
            format,
        } => {
            let table = read_segment_table(&input, &config.cleaning.missing_marker)?;
            let matrix = correlation::correlate(&table, config.correlation.missing);
            let outcome = pipeline::test_significance(&matrix, table.num_segments(), &config)?;

            let rendered = match format {
                OutputFormat::Csv => csv_output::significance_to_csv(&outcome.pairs),
                OutputFormat::Json => {
                    JsonSignificanceReport::new(&config, &matrix, &outcome.pairs, &outcome.summary)
                        .to_json()
                        .context("Failed to serialize significance report")?
                }
            };
            if let Some(path) = relationships {
                emit(
                    Some(&path),
                    &csv_output::significance_to_csv(&outcome.relationships),
                )?;
            }
            emit(output.as_ref(), &rendered)?;
            if output.is_some() {
                print!("{}", outcome.summary.to_report_string());
            }
        }

        Command::Run {
            input,
            metadata,
            output_dir,
        } => {
            let raw = read_raw_table(&input)?;
            let metadata = match metadata {
                Some(path) => Some(indicator_metadata(&read_raw_table(path)?)?),
                None => None,
            };
            let run = pipeline::analyze(&raw, metadata.as_ref(), &config)?;
            pipeline::write_outputs(&run, &output_dir, &config)?;

            print!("{}", run.significance.summary.to_report_string());
            println!("\nResults written to {}", output_dir.display());
        }

        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
