use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "CODEPAL_LOG_FORMAT";

/// How log events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read [`LOG_FORMAT_ENV`], defaulting to [`LogFormat::Text`] when unset
    /// or blank.
    pub fn from_env() -> Result<Self, String> {
        Self::from_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Result<Self, String> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse(),
            None => Ok(Self::default()),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("{LOG_FORMAT_ENV} must be 'text' or 'json', got '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Filter from `RUST_LOG`, falling back to `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install logging for `service_name` in the given format.
///
/// Only the first call in a process has an effect.
pub fn init_logging(service_name: &str, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = Ok(());
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter());
        result = match format {
            LogFormat::Text => registry
                .with(layer_fmt::layer().with_target(true).with_thread_ids(false).with_line_number(true))
                .try_init(),
            LogFormat::Json => {
                registry.with(layer_fmt::layer().json().with_current_span(true).with_span_list(false)).try_init()
            }
        }
        .map_err(|e| e.into());
        tracing::info!(service.name = service_name, %format, "telemetry initialized");
    });
    result
}

/// Install human-readable logging for `service_name`.
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(service_name, LogFormat::Text)
}

/// Install JSON-lines logging, one object per event.
pub fn init_json_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(service_name, LogFormat::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_text() {
        assert_eq!(LogFormat::from_value(None), Ok(LogFormat::Text));
        assert_eq!(LogFormat::from_value(Some("  ")), Ok(LogFormat::Text));
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!(LogFormat::from_value(Some("JSON")), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_value(Some(" text ")), Ok(LogFormat::Text));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Text));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = LogFormat::from_value(Some("xml")).unwrap_err();
        assert!(err.contains("CODEPAL_LOG_FORMAT"));
        assert!(err.contains("xml"));
    }

    #[test]
    fn only_first_init_takes_effect() {
        assert!(init_logging("test", LogFormat::Json).is_ok());
        assert!(init_telemetry("test").is_ok());
    }
}
