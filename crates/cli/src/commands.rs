//! CLI command definitions for chatpulse.
//!
//! Every command reads one plain-text chat export and either prints
//! aggregates, trains sentiment classifiers, or stores training rows.

use chatpulse_analysis::ClassifierKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Main CLI application.
#[derive(Parser, Debug)]
#[command(name = "chatpulse", author, version, about, long_about = None)]
pub struct Cli {
    /// Logging verbosity
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "CHATPULSE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print statistics, timelines, activity maps and word tables
    Analyze(AnalyzeArgs),

    /// List the senders of an export
    Users(UsersArgs),

    /// Train and evaluate sentiment classifiers on heuristic labels
    Train(TrainArgs),

    /// Append labeled training rows to the training data file
    ExportTraining(ExportTrainingArgs),
}

/// Analysis arguments.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Chat export file
    pub export: PathBuf,

    /// Restrict to one sender ("Overall" for everyone)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also train sentiment classifiers and include their scores
    #[arg(long, default_value_t = false)]
    pub train: bool,
}

/// Sender listing arguments.
#[derive(Args, Debug)]
pub struct UsersArgs {
    /// Chat export file
    pub export: PathBuf,

    /// Also print every parsed message
    #[arg(long, default_value_t = false)]
    pub records: bool,

    /// Output format
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Training arguments.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Chat export file
    pub export: PathBuf,

    /// Restrict training data to one sender
    #[arg(short, long)]
    pub user: Option<String>,

    /// Classifier to fit; repeat for several (defaults to configuration)
    #[arg(long = "classifier", value_enum)]
    pub classifiers: Vec<ClassifierArg>,

    /// Also print the labeled training rows
    #[arg(long, default_value_t = false)]
    pub rows: bool,

    /// Output format
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Training data export arguments.
#[derive(Args, Debug)]
pub struct ExportTrainingArgs {
    /// Chat export file
    pub export: PathBuf,

    /// Restrict rows to one sender
    #[arg(short, long)]
    pub user: Option<String>,

    /// Agree to store message text on disk
    #[arg(long, default_value_t = false)]
    pub consent: bool,

    /// Training data file (defaults to configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Classifier family selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierArg {
    /// Multinomial logistic regression
    Logistic,
    /// Multinomial naive Bayes
    NaiveBayes,
}

impl From<ClassifierArg> for ClassifierKind {
    fn from(arg: ClassifierArg) -> Self {
        match arg {
            ClassifierArg::Logistic => ClassifierKind::Logistic,
            ClassifierArg::NaiveBayes => ClassifierKind::NaiveBayes,
        }
    }
}
