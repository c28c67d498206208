use crate::config::types::{ConfigOverrides, MirrorConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(MirrorConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_mirror::config::load_config;
///
/// let config = load_config(Path::new("mirror.toml")).unwrap();
/// println!("Max depth: {}", config.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<MirrorConfig, ConfigError> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Parses a configuration file without validating it
///
/// Used when command-line overrides still have to be applied before validation.
pub fn read_config(path: &Path) -> Result<MirrorConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: MirrorConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Builds the final configuration from an optional file and command-line overrides
///
/// Defaults are replaced by the file (when given), which is replaced by the overrides.
/// The merged result is validated as a whole.
///
/// # Returns
///
/// * `Ok((MirrorConfig, Option<String>))` - The configuration and the file hash, if a file was read
/// * `Err(ConfigError)` - Reading, parsing, or validation failed
pub fn build_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<(MirrorConfig, Option<String>), ConfigError> {
    let (base, hash) = match path {
        Some(path) => (read_config(path)?, Some(compute_config_hash(path)?)),
        None => (MirrorConfig::default(), None),
    };

    let config = overrides.apply(base);
    validate(&config)?;
    Ok((config, hash))
}
