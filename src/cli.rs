//! CLI argument parsing for innostat

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for significance results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// CSV format for spreadsheet analysis (default)
    Csv,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "innostat")]
#[command(version)]
#[command(
    about = "Correlation and significance analysis of enterprise survey indicators",
    long_about = None
)]
pub struct Cli {
    /// Analysis configuration file (TOML); built-in defaults when absent
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter a raw survey export down to clean, typed records
    Clean {
        /// Raw survey export (CSV)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Indicator metadata (FieldName, Topic, EnglishName)
        #[arg(short, long, value_name = "FILE")]
        metadata: Option<PathBuf>,

        /// Write cleaned records here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Summarize the records left after cleaning a raw survey export
    Overview {
        /// Raw survey export (CSV)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Indicator metadata (FieldName, Topic, EnglishName)
        #[arg(short, long, value_name = "FILE")]
        metadata: Option<PathBuf>,

        /// Print the overview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the segment × indicator table from cleaned records
    Aggregate {
        /// Cleaned records (CSV)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Write the segment table here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also write the firm-size breakdown table
        #[arg(long, value_name = "FILE")]
        breakdown: Option<PathBuf>,
    },

    /// Compute the Pearson correlation matrix of a segment table
    Correlate {
        /// Segment table (CSV)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Write the matrix here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Test every correlation of a segment table for significance
    Significance {
        /// Segment table (CSV)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Write results here and print the summary to stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write key relationship results here
        #[arg(long, value_name = "FILE")]
        relationships: Option<PathBuf>,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "csv")]
        format: OutputFormat,
    },

    /// Run all four stages and write every table into a directory
    Run {
        /// Raw survey export (CSV)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Indicator metadata (FieldName, Topic, EnglishName)
        #[arg(short, long, value_name = "FILE")]
        metadata: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "innostat-output")]
        output_dir: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}
