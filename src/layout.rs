//! Template rendering for label values and message lines
//!
//! A layout mixes literal text with `${renderer}` or `${renderer:option}` tokens:
//!
//! | Token | Output |
//! |-------|--------|
//! | `${message}` | the record message |
//! | `${logger}` | the logger name |
//! | `${level}` | the level name, `Info` style |
//! | `${longdate}` | `2021-12-27 09:48:26.0000` (UTC) |
//! | `${date}` | RFC 3339 with milliseconds |
//! | `${exception}` | the attached exception text, or nothing |
//! | `${event-property:NAME}` | a record property, or nothing |
//! | `${environment:VAR}` | an environment variable, or nothing |
//!
//! `message`, `logger` and `level` accept `lowercase=true` or `uppercase=true`.

use chrono::SecondsFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::record::LogRecord;

/// Default message layout
pub const DEFAULT_LAYOUT: &str = "${longdate}|${level:uppercase=true}|${logger}|${message}";

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").expect("token pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Unterminated '${{' in layout '{0}'")]
    Unterminated(String),

    #[error("Unknown layout renderer '{0}'")]
    UnknownRenderer(String),

    #[error("Invalid option '{option}' for layout renderer '{renderer}'")]
    InvalidOption { renderer: String, option: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    AsIs,
    Lower,
    Upper,
}

impl Case {
    fn apply(self, text: &str) -> String {
        match self {
            Case::AsIs => text.to_string(),
            Case::Lower => text.to_lowercase(),
            Case::Upper => text.to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Message(Case),
    Logger(Case),
    Level(Case),
    LongDate,
    Date,
    Exception,
    Property(String),
    Environment(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    tokens: Vec<Token>,
}

impl Layout {
    pub fn parse(template: &str) -> Result<Self, LayoutError> {
        let mut tokens = Vec::new();
        let mut last = 0;

        for caps in TOKEN.captures_iter(template) {
            let whole = caps.get(0).expect("group 0 always matches");
            push_literal(&mut tokens, &template[last..whole.start()], template)?;
            tokens.push(parse_renderer(&caps[1])?);
            last = whole.end();
        }
        push_literal(&mut tokens, &template[last..], template)?;

        Ok(Self { tokens })
    }

    pub fn render(&self, record: &LogRecord) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Message(case) => out.push_str(&case.apply(&record.message)),
                Token::Logger(case) => out.push_str(&case.apply(&record.logger)),
                Token::Level(case) => out.push_str(&case.apply(level_name(record.level))),
                Token::LongDate => {
                    let ts = record.timestamp;
                    let ten_thousandths = (ts.timestamp_subsec_nanos() / 100_000).min(9_999);
                    out.push_str(&format!("{}.{:04}", ts.format("%Y-%m-%d %H:%M:%S"), ten_thousandths));
                }
                Token::Date => out.push_str(&record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
                Token::Exception => out.push_str(record.exception.as_deref().unwrap_or_default()),
                Token::Property(name) => {
                    if let Some(value) = record.properties.get(name) {
                        out.push_str(value);
                    }
                }
                Token::Environment(var) => {
                    if let Ok(value) = std::env::var(var) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

impl std::str::FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn push_literal(tokens: &mut Vec<Token>, text: &str, template: &str) -> Result<(), LayoutError> {
    if text.contains("${") {
        return Err(LayoutError::Unterminated(template.to_string()));
    }
    if !text.is_empty() {
        tokens.push(Token::Literal(text.to_string()));
    }
    Ok(())
}

fn parse_renderer(inner: &str) -> Result<Token, LayoutError> {
    let (name, option) = match inner.split_once(':') {
        Some((name, option)) => (name.trim(), Some(option.trim())),
        None => (inner.trim(), None),
    };

    let case = |option: Option<&str>| match option {
        None => Ok(Case::AsIs),
        Some("lowercase=true") => Ok(Case::Lower),
        Some("uppercase=true") => Ok(Case::Upper),
        Some("lowercase=false") | Some("uppercase=false") => Ok(Case::AsIs),
        Some(other) => Err(LayoutError::InvalidOption {
            renderer: name.to_string(),
            option: other.to_string(),
        }),
    };

    let required = |option: Option<&str>| match option {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(LayoutError::InvalidOption {
            renderer: name.to_string(),
            option: String::new(),
        }),
    };

    match name.to_lowercase().as_str() {
        "message" => Ok(Token::Message(case(option)?)),
        "logger" => Ok(Token::Logger(case(option)?)),
        "level" => Ok(Token::Level(case(option)?)),
        "longdate" => Ok(Token::LongDate),
        "date" => Ok(Token::Date),
        "exception" => Ok(Token::Exception),
        "event-property" => Ok(Token::Property(required(option)?)),
        "environment" => Ok(Token::Environment(required(option)?)),
        _ => Err(LayoutError::UnknownRenderer(name.to_string())),
    }
}

fn level_name(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "Error",
        log::Level::Warn => "Warn",
        log::Level::Info => "Info",
        log::Level::Debug => "Debug",
        log::Level::Trace => "Trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record() -> LogRecord {
        LogRecord::new(log::Level::Info, "app::worker", "Receive message from A")
            .at(Utc.with_ymd_and_hms(2021, 12, 27, 9, 48, 26).unwrap())
            .with_property("user", "alice")
    }

    fn render(template: &str) -> String {
        Layout::parse(template).unwrap().render(&record())
    }

    #[test]
    fn test_literal_only() {
        let layout: Layout = "plain text".parse().unwrap();
        assert_eq!(layout.render(&record()), "plain text");
        assert!("plain ${nope}".parse::<Layout>().is_err());
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_level_and_message() {
        assert_eq!(render("${level}|${message}"), "Info|Receive message from A");
        assert_eq!(render("${level:lowercase=true}"), "info");
        assert_eq!(render("${level:uppercase=true}"), "INFO");
        assert_eq!(render("${logger}"), "app::worker");
    }

    #[test]
    fn test_default_layout() {
        assert_eq!(
            render(DEFAULT_LAYOUT),
            "2021-12-27 09:48:26.0000|INFO|app::worker|Receive message from A"
        );
    }

    #[test]
    fn test_date() {
        assert_eq!(render("${date}"), "2021-12-27T09:48:26.000Z");
    }

    #[test]
    fn test_event_property_and_missing_values() {
        assert_eq!(render("[${event-property:user}]"), "[alice]");
        assert_eq!(render("[${event-property:nope}]"), "[]");
        assert_eq!(render("[${exception}]"), "[]");
    }

    #[test]
    fn test_exception() {
        let rec = record().with_exception("boom");
        assert_eq!(Layout::parse("${message}: ${exception}").unwrap().render(&rec), "Receive message from A: boom");
    }

    #[test]
    fn test_environment() {
        // SAFETY: Test runs single-threaded, env var is test-specific
        unsafe {
            std::env::set_var("LOKISHIP_LAYOUT_TEST_HOST", "loki.lvh.me");
        }
        assert_eq!(render("https://${environment:LOKISHIP_LAYOUT_TEST_HOST}:3100/"), "https://loki.lvh.me:3100/");
        unsafe {
            std::env::remove_var("LOKISHIP_LAYOUT_TEST_HOST");
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Layout::parse("${nope}"), Err(LayoutError::UnknownRenderer(_))));
        assert!(matches!(Layout::parse("abc ${level"), Err(LayoutError::Unterminated(_))));
        assert!(matches!(
            Layout::parse("${level:shout=true}"),
            Err(LayoutError::InvalidOption { .. })
        ));
        assert!(matches!(
            Layout::parse("${environment}"),
            Err(LayoutError::InvalidOption { .. })
        ));
    }
}
