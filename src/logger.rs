use lambda_runtime::tracing;
use lambda_runtime::tracing::Level;
use std::str::FromStr;

const DEFAULT_LEVEL: Level = Level::INFO;

/// Install the global subscriber at the level named by `log_level`.
///
/// CloudWatch timestamps every line and doesn't render colours, so neither is written.
pub fn init_logging(log_level: Option<String>) {
    let level: Result<Level, String> = parse_level(log_level.as_deref());

    tracing_subscriber::fmt()
        .with_max_level(*level.as_ref().unwrap_or(&DEFAULT_LEVEL))
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .init();

    if let Err(invalid) = level {
        tracing::warn!(log_level = invalid.as_str(), "Unknown log level, using info");
    }
}

/// The configured level, or the rejected value.
fn parse_level(value: Option<&str>) -> Result<Level, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(DEFAULT_LEVEL),
        Some(value) => Level::from_str(value).map_err(|_| value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_ignore_case() {
        assert_eq!(Ok(Level::DEBUG), parse_level(Some("DEBUG")));
        assert_eq!(Ok(Level::WARN), parse_level(Some(" warn ")));
    }

    #[test]
    fn missing_level_is_info() {
        assert_eq!(Ok(Level::INFO), parse_level(None));
        assert_eq!(Ok(Level::INFO), parse_level(Some("")));
    }

    #[test]
    fn unknown_level_is_returned() {
        assert_eq!(Err("verbose".to_string()), parse_level(Some("verbose")));
    }
}
