//! CLI application entry point and configuration.
//!
//! This module provides the main CLI application logic, including argument parsing,
//! configuration loading, and command dispatch.

use crate::commands::{
    AnalyzeArgs, Cli, Commands, ExportTrainingArgs, OutputFormat, TrainArgs, UsersArgs,
};
use crate::error::{CliError, Result};
use chatpulse_analysis::ml::TrainingSummary;
use chatpulse_analysis::stats::TrainingRow;
use chatpulse_analysis::{
    AnalysisConfig, Analyzer, ChatParser, ChatReport, Consent, Lexicon, TrainingStore,
};
use chatpulse_core::config::LogLevel;
use chatpulse_core::{ChatLog, ChatpulseConfig, MessageRecord, UserFilter};
use clap::Parser;
use serde_json::json;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn, Level};
use tracing_subscriber::fmt;

/// Configuration for the CLI application.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Path to configuration file.
    pub config_path: Option<PathBuf>,
    /// Logging verbosity level.
    pub verbosity: u8,
    /// Resource locations and logging defaults.
    pub settings: ChatpulseConfig,
    /// Aggregate and trainer settings.
    pub analysis: AnalysisConfig,
}

/// Main CLI application.
#[derive(Debug)]
pub struct App {
    /// Application configuration.
    pub config: AppConfig,
    /// Parsed CLI arguments.
    pub cli: Cli,
}

impl App {
    /// Create a new application instance from command line arguments.
    pub fn new() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    /// Create an application from already parsed arguments.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Self::load_config(&cli)?;
        Ok(Self { config, cli })
    }

    /// Load configuration from file and environment.
    fn load_config(cli: &Cli) -> Result<AppConfig> {
        let mut config = AppConfig {
            verbosity: cli.verbose,
            ..AppConfig::default()
        };

        if let Some(config_path) = &cli.config {
            if !config_path.exists() {
                return Err(CliError::Config(format!(
                    "Configuration file not found: {}",
                    config_path.display()
                )));
            }
            let raw = fs::read_to_string(config_path)?;
            config.settings = ChatpulseConfig::from_toml_str(&raw)?;
            config.analysis = AnalysisConfig::from_toml_str(&raw)?;
            config.config_path = Some(config_path.clone());
        }

        // Override with environment variables
        if let Ok(dir) = std::env::var("CHATPULSE_LEXICON_DIR") {
            config.settings = config.settings.with_lexicon_dir(Path::new(&dir));
        }

        Ok(config)
    }

    /// Run the application and print the command output.
    pub fn run(self) -> Result<()> {
        self.setup_logging();
        let output = self.execute()?;
        print!("{}", output);
        Ok(())
    }

    /// Dispatch the command and return what it would print.
    pub fn execute(&self) -> Result<String> {
        match &self.cli.command {
            Commands::Analyze(args) => self.handle_analyze(args),
            Commands::Users(args) => self.handle_users(args),
            Commands::Train(args) => self.handle_train(args),
            Commands::ExportTraining(args) => self.handle_export_training(args),
        }
    }

    /// Set up logging based on the configured level and verbosity.
    fn setup_logging(&self) {
        let logging = &self.config.settings.logging;
        let level = match logging.level.raised_by(self.config.verbosity) {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        };

        fmt()
            .with_max_level(level)
            .with_target(logging.show_target)
            .with_writer(std::io::stderr)
            .try_init()
            .ok(); // Ignore errors if a subscriber is already installed
    }

    fn load_export(&self, path: &Path) -> Result<ChatLog> {
        if !path.exists() {
            return Err(CliError::Argument(format!(
                "export file not found: {}",
                path.display()
            )));
        }
        Ok(ChatParser::new()?.parse_file(path)?)
    }

    fn build_analyzer(&self, analysis: AnalysisConfig) -> Result<Analyzer> {
        let lexicon = Lexicon::load(&self.config.settings.lexicon)?;
        Ok(Analyzer::new(lexicon, analysis))
    }

    fn user_filter(&self, log: &ChatLog, user: Option<&str>) -> UserFilter {
        let filter = UserFilter::from(user);
        if log.filtered(&filter).next().is_none() {
            warn!("'{}' has no messages in this export", filter);
        }
        filter
    }

    fn handle_analyze(&self, args: &AnalyzeArgs) -> Result<String> {
        let log = self.load_export(&args.export)?;
        let analyzer = self.build_analyzer(self.config.analysis.clone())?;
        let filter = self.user_filter(&log, args.user.as_deref());

        let report = analyzer.report(&log, &filter, args.train);
        debug!(
            "cache after report: {} hits, {} misses",
            analyzer.cache().hits(),
            analyzer.cache().misses()
        );
        match args.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)? + "\n"),
            OutputFormat::Text => render(|out| write_report(out, &report)),
        }
    }

    fn handle_users(&self, args: &UsersArgs) -> Result<String> {
        let log = self.load_export(&args.export)?;
        let choices = log.user_choices();
        match args.format {
            OutputFormat::Json => {
                let mut value = json!({
                    "format": log.format(),
                    "messages": log.len(),
                    "users": choices,
                });
                if args.records {
                    value["records"] = serde_json::to_value(log.records())?;
                }
                Ok(serde_json::to_string_pretty(&value)? + "\n")
            }
            OutputFormat::Text => render(|out| {
                for choice in &choices {
                    writeln!(out, "{}", choice)?;
                }
                if args.records {
                    writeln!(out)?;
                    write_records(out, log.records())?;
                }
                Ok(())
            }),
        }
    }

    fn handle_train(&self, args: &TrainArgs) -> Result<String> {
        let log = self.load_export(&args.export)?;
        let mut analysis = self.config.analysis.clone();
        if !args.classifiers.is_empty() {
            analysis.trainer.classifiers = args.classifiers.iter().map(|&c| c.into()).collect();
        }
        let analyzer = self.build_analyzer(analysis)?;
        let filter = self.user_filter(&log, args.user.as_deref());

        let rows = analyzer.training_data(&log, &filter);
        let summary = analyzer.train_rows(&rows)?.summary;
        match args.format {
            OutputFormat::Json if args.rows => Ok(serde_json::to_string_pretty(&json!({
                "rows": rows,
                "summary": summary,
            }))? + "\n"),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&summary)? + "\n"),
            OutputFormat::Text => render(|out| {
                if args.rows {
                    write_training_rows(out, &rows)?;
                    writeln!(out)?;
                }
                write_training_summary(out, &summary)
            }),
        }
    }

    fn handle_export_training(&self, args: &ExportTrainingArgs) -> Result<String> {
        let consent = Consent::from(args.consent);
        if consent == Consent::Denied {
            return Ok("Training data not stored: pass --consent to allow saving message text.\n".to_string());
        }

        let log = self.load_export(&args.export)?;
        let analyzer = self.build_analyzer(self.config.analysis.clone())?;
        let filter = self.user_filter(&log, args.user.as_deref());
        let rows = analyzer.training_data(&log, &filter);

        let path = args
            .output
            .clone()
            .unwrap_or_else(|| self.config.settings.training_data_path.clone());
        let store = TrainingStore::new(path);
        let written = store.append(&rows, consent)?;
        Ok(format!("Stored {} rows in {}\n", written, store.path().display()))
    }
}

/// Collect text written by `write` into a string.
fn render<F>(write: F) -> Result<String>
where
    F: FnOnce(&mut String) -> std::fmt::Result,
{
    let mut out = String::new();
    write(&mut out)?;
    Ok(out)
}

/// Plain-text rendering of a report.
fn write_report(out: &mut String, report: &ChatReport) -> std::fmt::Result {
    let stats = &report.stats;

    writeln!(out, "Top statistics ({})", report.user)?;
    writeln!(out, "  messages: {}", stats.messages)?;
    writeln!(out, "  words:    {}", stats.words)?;
    writeln!(out, "  media:    {}", stats.media)?;
    writeln!(out, "  links:    {}", stats.links)?;

    writeln!(out, "\nMonthly timeline")?;
    for point in &report.monthly_timeline {
        writeln!(out, "  {:<16} {}", point.time, point.messages)?;
    }

    writeln!(out, "\nDaily timeline")?;
    for point in &report.daily_timeline {
        writeln!(out, "  {}  {}", point.date, point.messages)?;
    }

    writeln!(out, "\nMost busy day")?;
    for day in &report.week_activity {
        writeln!(out, "  {:<10} {}", day.label, day.count)?;
    }

    writeln!(out, "\nMost busy month")?;
    for month in &report.month_activity {
        writeln!(out, "  {:<10} {}", month.label, month.count)?;
    }

    let heat = &report.heat_map;
    if !heat.rows.is_empty() {
        writeln!(out, "\nWeekly activity map")?;
        writeln!(out, "  {:<10} {}", "", heat.columns.join(" "))?;
        for (row, values) in heat.rows.iter().zip(&heat.values) {
            write!(out, "  {:<10}", row)?;
            for (value, column) in values.iter().zip(&heat.columns) {
                write!(out, " {:>width$}", value, width = column.len())?;
            }
            writeln!(out)?;
        }
    }

    if let Some(busy) = &report.busy_users {
        writeln!(out, "\nMost busy users")?;
        for user in &busy.top {
            writeln!(out, "  {:<20} {}", user.label, user.count)?;
        }
        writeln!(out, "  share:")?;
        for share in &busy.shares {
            writeln!(out, "  {:<20} {:.2}%", share.name, share.percent)?;
        }
    }

    writeln!(out, "\nMost common words")?;
    for word in &report.common_words {
        writeln!(out, "  {:<20} {}", word.word, word.count)?;
    }

    writeln!(out, "\nEmoji analysis")?;
    for emoji in &report.emojis {
        writeln!(out, "  {} {}", emoji.emoji, emoji.count)?;
    }

    if let Some(summary) = &report.sentiment {
        writeln!(out)?;
        write_training_summary(out, summary)?;
    }

    for error in &report.errors {
        writeln!(out, "\n[{}] {} failed: {}", error.aggregate, error.stage, error.message)?;
    }
    Ok(())
}

/// One line per parsed message.
fn write_records(out: &mut String, records: &[MessageRecord]) -> std::fmt::Result {
    for record in records {
        writeln!(out, "{} | {} | {}", record.timestamp, record.sender, record.body)?;
    }
    Ok(())
}

/// One line per labeled training row.
fn write_training_rows(out: &mut String, rows: &[TrainingRow]) -> std::fmt::Result {
    for row in rows {
        writeln!(out, "{:<8} | {}", row.sentiment, row.message)?;
    }
    Ok(())
}

/// Plain-text rendering of classifier scores.
fn write_training_summary(out: &mut String, summary: &TrainingSummary) -> std::fmt::Result {
    writeln!(
        out,
        "Sentiment training: {} rows ({} train / {} test), vocabulary {}",
        summary.rows, summary.train_rows, summary.test_rows, summary.vocabulary
    )?;
    for result in &summary.results {
        let report = &result.report;
        writeln!(out, "\n{}", result.classifier)?;
        writeln!(out, "  accuracy: {:.3}", report.accuracy)?;
        writeln!(
            out,
            "  agreement with {}: {:.3}",
            summary.reference, result.reference_agreement
        )?;
        writeln!(
            out,
            "  {:<12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1", "support"
        )?;
        for class in &report.classes {
            writeln!(
                out,
                "  {:<12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.sentiment, class.precision, class.recall, class.f1, class.support
            )?;
        }
        for (name, avg) in [("macro avg", report.macro_avg), ("weighted avg", report.weighted_avg)] {
            writeln!(
                out,
                "  {:<12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, report.support
            )?;
        }
    }
    Ok(())
}

/// Parse command line arguments and run the application.
pub fn run() -> Result<()> {
    let app = App::new()?;
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
1/1/24, 10:00 - Messages and calls are end-to-end encrypted.
1/1/24, 10:01 - Alice: good morning 😀
1/1/24, 10:02 - Bob: bad news
1/1/24, 10:05 - Bob: <Media omitted>
";

    struct Fixture {
        dir: tempfile::TempDir,
        export: PathBuf,
        config: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let lexicon_dir = dir.path().join("lexicon");
        fs::create_dir_all(&lexicon_dir).expect("lexicon dir");
        fs::write(lexicon_dir.join("positive-words.txt"), "good\n").expect("positive words");
        fs::write(lexicon_dir.join("negative-words.txt"), "bad\n").expect("negative words");
        fs::write(lexicon_dir.join("stop_hinglish.txt"), "the\n").expect("stopwords");

        let export = dir.path().join("chat.txt");
        fs::write(&export, EXPORT).expect("export");

        let config = dir.path().join("chatpulse.toml");
        let toml = format!(
            "training_data_path = '{}'\n\n[lexicon]\npositive_words = '{}'\nnegative_words = '{}'\nstopwords = '{}'\n\n[analysis]\ntop_words = 3\n",
            dir.path().join("training.csv").display(),
            lexicon_dir.join("positive-words.txt").display(),
            lexicon_dir.join("negative-words.txt").display(),
            lexicon_dir.join("stop_hinglish.txt").display(),
        );
        fs::write(&config, toml).expect("config");

        Fixture { dir, export, config }
    }

    fn app(fixture: &Fixture, args: &[&str]) -> App {
        let mut argv = vec![
            "chatpulse".to_string(),
            "--config".to_string(),
            fixture.config.display().to_string(),
        ];
        for arg in args {
            argv.push(arg.replace("{export}", &fixture.export.display().to_string()));
        }
        App::from_cli(Cli::try_parse_from(argv).expect("arguments parse")).expect("app builds")
    }

    #[test]
    fn config_file_feeds_both_layers() {
        let fixture = fixture();
        let app = app(&fixture, &["users", "{export}"]);
        assert_eq!(app.config.analysis.top_words, 3);
        assert_eq!(
            app.config.settings.training_data_path,
            fixture.dir.path().join("training.csv")
        );
        assert_eq!(app.config.config_path.as_deref(), Some(fixture.config.as_path()));
    }

    #[test]
    fn missing_config_file_is_rejected() {
        let cli = Cli::try_parse_from(["chatpulse", "--config", "/nonexistent/chatpulse.toml", "users", "x.txt"])
            .expect("arguments parse");
        let err = App::from_cli(cli).expect_err("config must exist");
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn users_lists_overall_first() {
        let fixture = fixture();
        let output = app(&fixture, &["users", "{export}"]).execute().expect("users runs");
        assert_eq!(output, "Overall\nAlice\nBob\n");
    }

    #[test]
    fn users_can_dump_parsed_records() {
        let fixture = fixture();
        let output = app(&fixture, &["users", "{export}", "--records"])
            .execute()
            .expect("users runs");
        assert!(output.starts_with("Overall\nAlice\nBob\n\n"));
        assert!(output.contains("2024-01-01 10:01:00 | Alice | good morning 😀\n"));
        assert!(output.contains("| group notification | Messages and calls are end-to-end encrypted.\n"));

        let output = app(&fixture, &["users", "{export}", "--records", "--format", "json"])
            .execute()
            .expect("users runs");
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["records"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["records"][2]["sender"], "Bob");
        assert_eq!(value["records"][2]["body"], "bad news");
    }

    #[test]
    fn train_can_dump_labeled_rows() {
        let fixture = fixture();
        let output = app(&fixture, &["train", "{export}", "--rows", "--format", "json"])
            .execute()
            .expect("three classes are enough to train");
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["rows"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["rows"][1]["sentiment"], "positive");
        assert_eq!(value["rows"][2]["message"], "bad news");
        assert_eq!(value["rows"][2]["sentiment"], "negative");
        assert_eq!(value["summary"]["rows"], 3);

        let output = app(&fixture, &["train", "{export}", "--rows"])
            .execute()
            .expect("three classes are enough to train");
        assert!(output.starts_with("neutral  | Messages and calls are end-to-end encrypted.\n"));
        assert!(output.contains("negative | bad news\n"));
        assert!(output.contains("Sentiment training: 3 rows"));
    }

    #[test]
    fn analyze_text_shows_stats_and_busy_users() {
        let fixture = fixture();
        let output = app(&fixture, &["analyze", "{export}"]).execute().expect("analyze runs");
        assert!(output.contains("messages: 4"));
        assert!(output.contains("media:    1"));
        assert!(output.contains("Most busy users"));
        assert!(output.contains("Bob"));
    }

    #[test]
    fn analyze_json_for_one_user() {
        let fixture = fixture();
        let output = app(&fixture, &["analyze", "{export}", "--user", "Alice", "--format", "json"])
            .execute()
            .expect("analyze runs");
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["user"], "Alice");
        assert_eq!(value["stats"]["messages"], 1);
        assert_eq!(value["emojis"][0]["emoji"], "😀");
        assert!(value["busy_users"].is_null());
    }

    #[test]
    fn analyze_with_train_reports_insufficient_data_inline() {
        let fixture = fixture();
        let output = app(&fixture, &["analyze", "{export}", "--user", "Alice", "--train"])
            .execute()
            .expect("analyze still succeeds");
        assert!(output.contains("train failed"));
    }

    #[test]
    fn train_command_fails_with_stage_on_single_class() {
        let fixture = fixture();
        let err = app(&fixture, &["train", "{export}", "--user", "Alice"])
            .execute()
            .expect_err("a single labeled row cannot be trained on");
        assert!(err.to_string().starts_with("train failed"));
    }

    #[test]
    fn export_training_requires_consent() {
        let fixture = fixture();
        let output = app(&fixture, &["export-training", "{export}"])
            .execute()
            .expect("command runs");
        assert!(output.contains("--consent"));
        assert!(!fixture.dir.path().join("training.csv").exists());

        let output = app(&fixture, &["export-training", "{export}", "--consent"])
            .execute()
            .expect("command runs");
        assert!(output.starts_with("Stored 3 rows"));
        let stored = fs::read_to_string(fixture.dir.path().join("training.csv")).expect("store written");
        assert!(stored.starts_with("message,sentiment\n"));
        assert!(stored.contains("bad news,negative"));
    }

    #[test]
    fn missing_export_is_an_argument_error() {
        let fixture = fixture();
        let err = app(&fixture, &["users", "/nonexistent/chat.txt"])
            .execute()
            .expect_err("export must exist");
        assert!(matches!(err, CliError::Argument(_)));
    }

    #[test]
    fn unreadable_export_reports_parse_stage() {
        let fixture = fixture();
        fs::write(&fixture.export, "no timestamps here\n").expect("overwrite export");
        let err = app(&fixture, &["users", "{export}"])
            .execute()
            .expect_err("format error");
        assert!(err.to_string().starts_with("parse failed"));
    }
}
