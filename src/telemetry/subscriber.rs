use std::env;

use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub format: LogFormat,
    pub level: Level,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::parse(
            env::var("LOG_FORMAT").ok().as_deref(),
            env::var("LOG_LEVEL").ok().as_deref(),
        )
    }

    fn parse(format: Option<&str>, level: Option<&str>) -> Self {
        let format = match format {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let level = match level {
            Some("trace") => Level::TRACE,
            Some("debug") => Level::DEBUG,
            Some("warn") => Level::WARN,
            Some("error") => Level::ERROR,
            _ => Level::INFO,
        };

        Self { format, level }
    }

    fn default_filter(&self) -> String {
        let level = self.level.as_str().to_lowercase();
        format!("{level},tower_http=info,sqlx=warn,business_events=info,audit=info")
    }
}

pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = LogSettings::from_env();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, LogSettings};
    use tracing::Level;

    #[test]
    fn defaults_to_pretty_info() {
        let settings = LogSettings::parse(None, None);
        assert_eq!(settings.format, LogFormat::Pretty);
        assert_eq!(settings.level, Level::INFO);
    }

    #[test]
    fn default_filter_keeps_audit_targets() {
        let settings = LogSettings::parse(Some("json"), Some("warn"));
        assert_eq!(settings.format, LogFormat::Json);
        let filter = settings.default_filter();
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("business_events=info"));
    }
}
