use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Download concurrency and poll interval are positive
/// - At least one search-term variant is allowed
/// - Jackett has an API key when enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.downloads.max_concurrent_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.max_concurrent_downloads must be at least 1".to_string(),
        ));
    }

    if config.downloads.progress_poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.progress_poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.search.max_query_variants == 0 {
        return Err(ConfigError::ValidationError(
            "search.max_query_variants must be at least 1".to_string(),
        ));
    }

    let jackett = &config.search.jackett;
    if jackett.enabled && jackett.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "search.jackett.api_key is required when Jackett is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &Config, needle: &str) {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_invalid(&config, "server.port");
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.downloads.max_concurrent_downloads = 0;
        assert_invalid(&config, "max_concurrent_downloads");
    }

    #[test]
    fn test_validate_zero_poll_interval_fails() {
        let mut config = Config::default();
        config.downloads.progress_poll_interval_ms = 0;
        assert_invalid(&config, "progress_poll_interval_ms");
    }

    #[test]
    fn test_validate_zero_query_variants_fails() {
        let mut config = Config::default();
        config.search.max_query_variants = 0;
        assert_invalid(&config, "max_query_variants");
    }

    #[test]
    fn test_validate_jackett_requires_api_key() {
        let mut config = Config::default();
        config.search.jackett.enabled = true;
        assert_invalid(&config, "api_key");

        config.search.jackett.api_key = "key".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
