use chatpulse_core::constants::NOTIFICATION_SENDER;
use chatpulse_core::{ChatLog, Error, MessageRecord};
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AnalysisError, AnalysisResult};

/// A recognized export layout: the line-start timestamp prefix and the
/// date formats its timestamps are written in.
#[derive(Debug, Clone)]
pub struct ExportFormat {
    name: String,
    prefix: Regex,
    date_formats: Vec<String>,
}

impl ExportFormat {
    /// Creates a format from a prefix pattern and chrono date formats,
    /// tried in order for every timestamp.
    pub fn new(name: &str, prefix_pattern: &str, date_formats: &[&str]) -> AnalysisResult<Self> {
        let prefix = Regex::new(prefix_pattern).map_err(|e| {
            AnalysisError::InvalidInput(format!("invalid prefix pattern for {}: {}", name, e))
        })?;
        Ok(Self {
            name: name.to_string(),
            prefix,
            date_formats: date_formats.iter().map(|f| f.to_string()).collect(),
        })
    }

    /// `D/M/YY, H:MM - ` as written by Android exports.
    pub fn dash_24h() -> AnalysisResult<Self> {
        Self::new(
            "24h-dash",
            r"(?m)^[\u{200E}\u{FEFF}]?\d{1,2}/\d{1,2}/\d{2,4},\s\d{1,2}:\d{2}\s-\s",
            &["%d/%m/%y, %H:%M", "%d/%m/%Y, %H:%M"],
        )
    }

    /// `[D/M/YY, H:MM:SS AM] ` as written by iOS exports.
    pub fn bracketed_12h() -> AnalysisResult<Self> {
        Self::new(
            "12h-bracketed",
            r"(?m)^[\u{200E}\u{FEFF}]?\[\d{1,2}/\d{1,2}/\d{2,4},\s\d{1,2}:\d{2}:\d{2}\s[AP]M\]\s",
            &["%d/%m/%y, %I:%M:%S %p", "%d/%m/%Y, %I:%M:%S %p"],
        )
    }

    /// Format name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn parse_timestamp(&self, prefix: &str) -> AnalysisResult<NaiveDateTime> {
        let cleaned = normalize_timestamp(prefix);
        self.date_formats
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
            .ok_or_else(|| {
                Error::format(format!(
                    "'{}' matches the {} layout but is not a valid date",
                    prefix.trim(),
                    self.name
                ))
                .into()
            })
    }
}

/// Strip brackets, the trailing dash and exotic spaces from a matched prefix.
fn normalize_timestamp(prefix: &str) -> String {
    let is_noise = |c: char| c == '[' || c == ']' || c == '\u{200E}' || c == '\u{FEFF}' || c.is_whitespace();
    prefix
        .trim_matches(is_noise)
        .trim_end_matches('-')
        .trim_matches(is_noise)
        .replace(['\u{202F}', '\u{00A0}'], " ")
}

/// Parser for plain-text chat exports.
///
/// Formats are tried in registration order; the first one with at least one
/// match is applied to the whole export.
pub struct ChatParser {
    formats: Vec<ExportFormat>,
}

impl ChatParser {
    /// Creates a parser with the two built-in export layouts.
    pub fn new() -> AnalysisResult<Self> {
        Ok(Self {
            formats: vec![ExportFormat::dash_24h()?, ExportFormat::bracketed_12h()?],
        })
    }

    /// Register an additional layout, tried after the existing ones.
    pub fn register(&mut self, format: ExportFormat) {
        self.formats.push(format);
    }

    /// Returns all registered format names.
    pub fn format_names(&self) -> Vec<String> {
        self.formats.iter().map(|f| f.name().to_string()).collect()
    }

    /// Read and parse an export file.
    pub fn parse_file(&self, path: &Path) -> AnalysisResult<ChatLog> {
        let content = std::fs::read_to_string(path)?;
        debug!("Read {} bytes from {}", content.len(), path.display());
        self.parse(&content)
    }

    /// Parse export text into records, one per timestamp prefix.
    ///
    /// Fails with a format error when no registered layout matches
    /// anywhere, or when a matched timestamp is not a real date.
    pub fn parse(&self, raw: &str) -> AnalysisResult<ChatLog> {
        let Some(format) = self.formats.iter().find(|f| f.prefix.is_match(raw)) else {
            return Err(Error::format(format!(
                "no known timestamp pattern found (tried {})",
                self.format_names().join(", ")
            ))
            .into());
        };

        let prefixes: Vec<regex::Match<'_>> = format.prefix.find_iter(raw).collect();
        let mut records = Vec::with_capacity(prefixes.len());

        for (idx, prefix) in prefixes.iter().enumerate() {
            let chunk_end = prefixes
                .get(idx + 1)
                .map(|next| next.start())
                .unwrap_or(raw.len());
            let chunk = &raw[prefix.end()..chunk_end];
            let timestamp = format.parse_timestamp(prefix.as_str())?;
            let (sender, body) = split_sender(chunk);
            records.push(MessageRecord::new(timestamp, sender, body));
        }

        info!(
            "Parsed {} messages using the {} layout",
            records.len(),
            format.name()
        );
        Ok(ChatLog::new(format.name(), records))
    }
}

/// Split `"name: body"` at the first colon followed by whitespace.
///
/// Chunks without such a prefix are system notifications and keep their
/// whole text as body.
pub fn split_sender(chunk: &str) -> (&str, &str) {
    let split = chunk.char_indices().find_map(|(idx, c)| {
        if c != ':' || idx == 0 {
            return None;
        }
        let rest = &chunk[idx + 1..];
        let ws = rest.chars().next().filter(|c| c.is_whitespace())?;
        Some((&chunk[..idx], trim_line_end(&rest[ws.len_utf8()..])))
    });
    split.unwrap_or((NOTIFICATION_SENDER, trim_line_end(chunk)))
}

fn trim_line_end(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// Parse export text with the built-in layouts.
pub fn parse(raw: &str) -> AnalysisResult<ChatLog> {
    ChatParser::new()?.parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpulse_core::constants::MEDIA_PLACEHOLDER;

    const DASH_EXPORT: &str = "\
12/10/2023, 18:47 - Messages and calls are end-to-end encrypted.
12/10/2023, 18:48 - Alice: hello world
12/10/2023, 18:50 - Bob: <Media omitted>
13/10/2023, 23:05 - Alice: first line
second line
14/10/2023, 00:10 - Bob: see https://example.com
";

    #[test]
    fn dash_export_yields_one_record_per_prefix() {
        let log = parse(DASH_EXPORT).expect("export parses");
        assert_eq!(log.len(), 5);
        assert_eq!(log.format(), "24h-dash");

        let bodies: Vec<&str> = log.records().iter().map(|r| r.body.as_str()).collect();
        assert_eq!(
            bodies,
            vec![
                "Messages and calls are end-to-end encrypted.",
                "hello world",
                MEDIA_PLACEHOLDER,
                "first line\nsecond line",
                "see https://example.com",
            ]
        );
    }

    #[test]
    fn lines_without_name_prefix_are_notifications() {
        let log = parse(DASH_EXPORT).expect("export parses");
        let records = log.records();
        assert_eq!(records[0].sender, NOTIFICATION_SENDER);
        assert!(records[0].is_notification());
        assert_eq!(records[1].sender, "Alice");
        assert!(records[2].is_media());
    }

    #[test]
    fn dash_timestamps_are_day_first() {
        let log = parse(DASH_EXPORT).expect("export parses");
        let first = &log.records()[0];
        assert_eq!(first.day, 12);
        assert_eq!(first.month, "October");
        assert_eq!(first.year, 2023);
        assert_eq!(first.period, "18-19");
        assert_eq!(log.records()[3].period, "23-00");
        assert_eq!(log.records()[4].period, "00-1");
    }

    #[test]
    fn two_digit_years_parse() {
        let log = parse("1/1/24, 10:00 - Alice: hello world\n1/1/24, 10:05 - Bob: <Media omitted>\n")
            .expect("export parses");
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].year, 2024);
        assert_eq!(log.records()[1].minute, 5);
    }

    #[test]
    fn bracketed_export_falls_back_to_second_layout() {
        let raw = "[20/01/24, 5:08:18\u{202F}PM] Alice: evening\n[21/01/24, 12:01:00 AM] Bob: late\n";
        let log = parse(raw).expect("export parses");
        assert_eq!(log.format(), "12h-bracketed");
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].hour, 17);
        assert_eq!(log.records()[0].body, "evening");
        assert_eq!(log.records()[1].hour, 0);
        assert_eq!(log.records()[1].day_name, "Sunday");
    }

    #[test]
    fn text_without_timestamps_is_a_format_error() {
        let err = parse("just some text\nwith no dates\n").expect_err("must fail");
        assert!(err.is_format());
        assert_eq!(err.stage(), "parse");
    }

    #[test]
    fn impossible_dates_are_format_errors() {
        let err = parse("31/2/24, 10:00 - Alice: hi\n").expect_err("must fail");
        assert!(err.is_format());
    }

    #[test]
    fn sender_split_uses_first_colon_space() {
        assert_eq!(split_sender("Alice: note: hello\n"), ("Alice", "note: hello"));
        assert_eq!(split_sender("Alice added Bob\n"), (NOTIFICATION_SENDER, "Alice added Bob"));
        assert_eq!(split_sender("time 10:30 now"), (NOTIFICATION_SENDER, "time 10:30 now"));
        assert_eq!(split_sender("Dr. A: B: hi"), ("Dr. A", "B: hi"));
    }

    #[test]
    fn empty_named_messages_keep_their_sender() {
        assert_eq!(split_sender("Alice:\n"), ("Alice", ""));
        assert_eq!(split_sender("Alice:\r\n"), ("Alice", ""));
        assert_eq!(split_sender("Alice: \n"), ("Alice", ""));
        assert_eq!(split_sender("Alice added Bob\r\n"), (NOTIFICATION_SENDER, "Alice added Bob"));

        let log = parse("1/1/24, 10:00 - Alice:\n1/1/24, 10:01 - Bob: hi\n").expect("export parses");
        assert_eq!(log.records()[0].sender, "Alice");
        assert_eq!(log.records()[0].body, "");
        assert!(!log.records()[0].is_notification());
    }

    #[test]
    fn custom_formats_are_tried_after_builtins() {
        let mut parser = ChatParser::new().expect("builtin formats compile");
        parser.register(
            ExportFormat::new("iso", r"(?m)^\d{4}-\d{2}-\d{2} \d{2}:\d{2} \| ", &["%Y-%m-%d %H:%M |"])
                .expect("pattern compiles"),
        );
        assert_eq!(parser.format_names(), vec!["24h-dash", "12h-bracketed", "iso"]);

        let log = parser.parse("2024-03-01 09:15 | Carol: morning\n").expect("export parses");
        assert_eq!(log.format(), "iso");
        assert_eq!(log.records()[0].sender, "Carol");
    }
}
