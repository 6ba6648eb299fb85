use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Retry, polling and timeout values are usable
/// - Image and audio extension lists are non-empty and disjoint
/// - API base URL and output names are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let orchestrator = &config.orchestrator;

    if orchestrator.max_attempts == 0 {
        return Err(invalid("orchestrator.max_attempts must be at least 1"));
    }
    if orchestrator.poll_interval_ms == 0 {
        return Err(invalid("orchestrator.poll_interval_ms cannot be 0"));
    }
    if orchestrator.job_timeout_secs == 0 {
        return Err(invalid("orchestrator.job_timeout_secs cannot be 0"));
    }
    if orchestrator.backoff_base_ms > orchestrator.backoff_cap_ms {
        return Err(invalid(
            "orchestrator.backoff_base_ms cannot exceed orchestrator.backoff_cap_ms",
        ));
    }

    if config.api.base_url.trim().is_empty() {
        return Err(invalid("api.base_url cannot be empty"));
    }

    let input = &config.input;
    if input.image_extensions.is_empty() {
        return Err(invalid("input.image_extensions cannot be empty"));
    }
    if input.audio_extensions.is_empty() {
        return Err(invalid("input.audio_extensions cannot be empty"));
    }
    if let Some(ext) = input.image_extensions.iter().find(|image| {
        input
            .audio_extensions
            .iter()
            .any(|audio| audio.eq_ignore_ascii_case(image))
    }) {
        return Err(ConfigError::ValidationError(format!(
            "extension '{}' is listed as both image and audio",
            ext
        )));
    }

    if config.output.video_extension.trim().is_empty() {
        return Err(invalid("output.video_extension cannot be empty"));
    }
    if config.output.log_file.trim().is_empty() {
        return Err(invalid("output.log_file cannot be empty"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = Config::default();
        config.orchestrator.max_attempts = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_backoff_base_above_cap_fails() {
        let mut config = Config::default();
        config.orchestrator.backoff_base_ms = 60_000;
        config.orchestrator.backoff_cap_ms = 30_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_overlapping_extensions_fails() {
        let mut config = Config::default();
        config.input.audio_extensions.push("PNG".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("png"));
    }

    #[test]
    fn test_validate_empty_base_url_fails() {
        let mut config = Config::default();
        config.api.base_url = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
