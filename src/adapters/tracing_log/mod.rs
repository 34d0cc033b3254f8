// Tracing log adapter - Structured logging using the tracing crate

use tracing_subscriber::EnvFilter;

use crate::config_initialization::{parse_level, LoggingConfig};
use crate::domain::errors::*;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, DomainError> {
    let level = parse_level(&config.level)?;
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase())))
}

/// Install the global subscriber, writing to stderr. Calling it again is a no-op.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), DomainError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            format: "pretty".to_string(),
        };
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}
