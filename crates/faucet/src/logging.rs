use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log format types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize the global subscriber. `RUST_LOG` directives are appended to `level`.
pub fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let env_filter = build_env_filter(level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }

    tracing::info!("Logging initialized with level: {}", level);
    Ok(())
}

fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut filter_string = level.to_string();

    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        if !rust_log.is_empty() {
            filter_string.push(',');
            filter_string.push_str(&rust_log);
        }
    }

    Ok(EnvFilter::try_new(filter_string)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_conversion() {
        assert_eq!(LogFormat::from("json"), LogFormat::Json);
        assert_eq!(LogFormat::from("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from("invalid"), LogFormat::Pretty);
    }

    #[test]
    fn test_env_filter_building() {
        let filter = build_env_filter("debug").unwrap();
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        assert!(build_env_filter("faucet=loud").is_err());
    }
}
