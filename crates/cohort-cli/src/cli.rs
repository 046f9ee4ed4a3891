//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort-features",
    version,
    about = "Extract analysis-ready feature matrices from cohort study tables",
    long_about = "Extract analysis-ready feature matrices from cohort study tables.\n\n\
                  Categorical fields are one-hot encoded, numeric fields are split by\n\
                  instance count, and hospital diagnoses are mapped onto a two-level\n\
                  ICD10 hierarchy. Every matrix has one row per cohort participant."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full extraction pipeline and write every output.
    Extract(ExtractArgs),

    /// Count catalog fields per value type.
    Types(TypesArgs),
}

#[derive(Parser)]
pub struct ExtractArgs {
    /// Field catalog TSV (FieldID, Description, Category, ValueType).
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: PathBuf,

    /// Cohort table TSV (f.eid then f.<field>.<visit>.<instance> columns).
    #[arg(long = "source", value_name = "PATH")]
    pub source: PathBuf,

    /// Hospital episode table TSV.
    #[arg(long = "hesin", value_name = "PATH")]
    pub hesin: PathBuf,

    /// Hospital diagnosis table TSV.
    #[arg(long = "hesin-diag", value_name = "PATH")]
    pub hesin_diag: PathBuf,

    /// ICD10 code reference TSV (coding, meaning).
    #[arg(long = "coding", value_name = "PATH")]
    pub coding: PathBuf,

    /// Output directory for generated files.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// TOML file with pipeline options; flags below override it.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Drop categorical fields with at least this many categories (sentinel included).
    #[arg(long = "threshold", value_name = "N")]
    pub threshold: Option<usize>,

    /// What to do with diagnosis codes outside the hierarchy.
    #[arg(long = "unmapped-codes", value_enum)]
    pub unmapped_codes: Option<UnmappedCodesArg>,

    /// Keep only diagnoses admitted before the baseline assessment.
    #[arg(long = "before-baseline")]
    pub before_baseline: bool,

    /// Compute and summarize without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct TypesArgs {
    /// Field catalog TSV.
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum UnmappedCodesArg {
    /// Abort the run.
    Fail,
    /// Exclude the diagnosis and report it.
    Report,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
