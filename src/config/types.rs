use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_MAX_DEPTH: u32 = 20;
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
pub const DEFAULT_PARSE_CONCURRENCY: usize = 2;
pub const DEFAULT_OUTPUT_DIR: &str = "./scrapes";

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MirrorConfig {
    /// Page the crawl starts from
    #[serde(default)]
    pub root_url: String,

    /// Directory the mirrored tree is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum number of navigation hops from the root page
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Prefix every followed page must start with (defaults to the root URL)
    #[serde(default)]
    pub required_prefix: Option<String>,

    /// Number of concurrent download workers
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// Number of concurrent parse workers
    #[serde(default = "default_parse_concurrency")]
    pub parse_concurrency: usize,

    /// Regular expressions; matching pages are never downloaded
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Runtime environment, controls log formatting
    #[serde(default)]
    pub environment: Environment,
}

impl MirrorConfig {
    /// Creates a configuration with defaults for everything but the root URL
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            ..Self::default()
        }
    }

    /// The prefix links must start with to be followed
    pub fn effective_required_prefix(&self) -> &str {
        match self.required_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => &self.root_url,
        }
    }

    /// Capacity of the bounded parse queue
    pub fn parse_queue_capacity(&self) -> usize {
        self.parse_concurrency.max(1) * 4
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            output_dir: default_output_dir(),
            max_depth: DEFAULT_MAX_DEPTH,
            required_prefix: None,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            parse_concurrency: DEFAULT_PARSE_CONCURRENCY,
            ignore_patterns: Vec::new(),
            environment: Environment::default(),
        }
    }
}

/// Values given on the command line or through environment variables
///
/// Every field that is set replaces the value loaded from the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub max_depth: Option<u32>,
    pub required_prefix: Option<String>,
    pub download_concurrency: Option<usize>,
    pub parse_concurrency: Option<usize>,
    pub ignore_patterns: Vec<String>,
    pub environment: Option<Environment>,
}

impl ConfigOverrides {
    /// Applies the overrides on top of `config`
    ///
    /// Ignore patterns are appended rather than replaced.
    pub fn apply(self, mut config: MirrorConfig) -> MirrorConfig {
        if let Some(root_url) = self.root_url {
            config.root_url = root_url;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(prefix) = self.required_prefix {
            config.required_prefix = Some(prefix);
        }
        if let Some(n) = self.download_concurrency {
            config.download_concurrency = n;
        }
        if let Some(n) = self.parse_concurrency {
            config.parse_concurrency = n;
        }
        if let Some(environment) = self.environment {
            config.environment = environment;
        }
        config.ignore_patterns.extend(self.ignore_patterns);
        config
    }
}

/// Runtime environment selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_download_concurrency() -> usize {
    DEFAULT_DOWNLOAD_CONCURRENCY
}

fn default_parse_concurrency() -> usize {
    DEFAULT_PARSE_CONCURRENCY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_prefix_defaults_to_root() {
        let config = MirrorConfig::new("https://example.com/docs/");
        assert_eq!(
            config.effective_required_prefix(),
            "https://example.com/docs/"
        );
    }

    #[test]
    fn test_empty_required_prefix_falls_back_to_root() {
        let mut config = MirrorConfig::new("https://example.com/");
        config.required_prefix = Some(String::new());
        assert_eq!(config.effective_required_prefix(), "https://example.com/");
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut config = MirrorConfig::new("https://example.com/");
        config.ignore_patterns = vec!["\\.pdf$".to_string()];

        let overrides = ConfigOverrides {
            max_depth: Some(3),
            download_concurrency: Some(8),
            ignore_patterns: vec!["/private/".to_string()],
            ..Default::default()
        };
        let merged = overrides.apply(config);

        assert_eq!(merged.root_url, "https://example.com/");
        assert_eq!(merged.max_depth, 3);
        assert_eq!(merged.download_concurrency, 8);
        assert_eq!(merged.parse_concurrency, DEFAULT_PARSE_CONCURRENCY);
        assert_eq!(merged.ignore_patterns.len(), 2);
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!(
            "development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert_eq!(
            "PRODUCTION".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_parse_queue_capacity() {
        let mut config = MirrorConfig::new("https://example.com/");
        config.parse_concurrency = 3;
        assert_eq!(config.parse_queue_capacity(), 12);
    }
}
