use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "hddr CLI - A command-line interface for deriving and rewriting homology-derived distance restraint parameters in comparative protein structure modeling.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare a model's restraint distances against its experimentally
    /// determined target structure, writing one parameter table per template.
    Analyze(AnalyzeArgs),
    /// Rewrite the parameters of a restraint file from per-template
    /// parameter tables.
    Rebuild(RebuildArgs),
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the PIR alignment relating the model and its templates.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub alignment: PathBuf,

    /// Alignment code of the modeled sequence.
    #[arg(short, long, required = true, value_name = "CODE")]
    pub sequence: String,

    /// Alignment codes of the templates, in modeling order.
    #[arg(short, long = "known", required = true, value_name = "CODE", num_args(1..))]
    pub knowns: Vec<String>,

    /// Path to the model structure in PDB format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Path to the restraint file the model was built under.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub restraints: PathBuf,

    /// Path to the experimentally determined target structure.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub target: PathBuf,

    /// Chain of the target corresponding to the model. Required when the
    /// target file has more than one chain.
    #[arg(long, value_name = "CHAIN")]
    pub target_chain: Option<char>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory the per-template tables are written to.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory searched for template structure files.
    /// Can be used multiple times.
    #[arg(long = "atom-dir", value_name = "DIR")]
    pub atom_dirs: Vec<PathBuf>,

    /// Override the minimum model/target sequence identity.
    #[arg(long, value_name = "FLOAT")]
    pub identity_threshold: Option<f64>,

    /// Override the gap-opening penalty of the model/target alignment.
    #[arg(long, value_name = "FLOAT")]
    pub gap_open: Option<f64>,

    /// Override the gap-extension penalty of the model/target alignment.
    #[arg(long, value_name = "FLOAT")]
    pub gap_extend: Option<f64>,

    /// Restraint groups to analyze.
    #[arg(short = 'g', long = "group", value_name = "INT", num_args(1..))]
    pub groups: Vec<u32>,
}

/// Arguments for the `rebuild` subcommand.
#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Path to the restraint file to rewrite.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub restraints: PathBuf,

    /// Path to a restraint-parameter table, one per template.
    /// Can be used multiple times.
    #[arg(short = 'T', long = "table", required = true, value_name = "PATH", num_args(1..))]
    pub tables: Vec<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the rewritten file here instead of replacing the input.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Table column holding the restraint standard deviation.
    #[arg(long, value_name = "NAME")]
    pub sigma_col: Option<String>,

    /// Table column holding the restraint location. When absent, only the
    /// standard deviations are rewritten.
    #[arg(long, value_name = "NAME")]
    pub location_col: Option<String>,

    /// Table column holding the first atom serial of a pair.
    #[arg(long, value_name = "NAME")]
    pub atom_i_col: Option<String>,

    /// Table column holding the second atom serial of a pair.
    #[arg(long, value_name = "NAME")]
    pub atom_j_col: Option<String>,

    /// Restraint group whose parameters are rewritten.
    #[arg(short, long, value_name = "INT")]
    pub group: Option<u32>,

    /// Multi-template weighting scheme ('flat' or 'reliability').
    #[arg(short, long, value_name = "NAME")]
    pub weighting: Option<String>,

    /// Decay constant of the reliability weighting scheme.
    #[arg(long, value_name = "FLOAT")]
    pub decay: Option<f64>,

    /// Remove restraints of the group whose atom pair is in no table.
    #[arg(long)]
    pub drop_unmatched: bool,
}
