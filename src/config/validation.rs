use crate::config::types::MirrorConfig;
use crate::ConfigError;
use regex::Regex;
use url::Url;

const MAX_CONCURRENCY: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_root_url(&config.root_url)?;
    validate_required_prefix(config.effective_required_prefix())?;
    validate_output_dir(config)?;
    validate_concurrency("download_concurrency", config.download_concurrency)?;
    validate_concurrency("parse_concurrency", config.parse_concurrency)?;
    compile_ignore_patterns(&config.ignore_patterns)?;
    Ok(())
}

/// Compiles the configured ignore patterns
///
/// # Returns
///
/// * `Ok(Vec<Regex>)` - One compiled expression per pattern, in order
/// * `Err(ConfigError::InvalidPattern)` - The first pattern that fails to compile
pub fn compile_ignore_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn validate_root_url(root_url: &str) -> Result<(), ConfigError> {
    if root_url.trim().is_empty() {
        return Err(ConfigError::Validation("Missing root url".to_string()));
    }
    validate_http_url("root_url", root_url)
}

fn validate_required_prefix(prefix: &str) -> Result<(), ConfigError> {
    validate_http_url("required_prefix", prefix)
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

fn validate_output_dir(config: &MirrorConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("Missing output dir".to_string()));
    }
    Ok(())
}

fn validate_concurrency(field: &str, value: usize) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            field, MAX_CONCURRENCY, value
        )));
    }
    Ok(())
}
