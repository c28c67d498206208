use crate::config::{compile_ignore_patterns, MirrorConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Why a link was not admitted for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The URL does not start with the required prefix
    OutsidePrefix,
    /// The URL matches the ignore pattern with this source text
    Ignored(String),
}

/// Decides which discovered pages are followed
///
/// A page is followed when its canonical URL starts with the required prefix and
/// matches none of the ignore patterns.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    required_prefix: String,
    ignore: Vec<Regex>,
}

impl LinkFilter {
    /// Creates a filter from an already compiled pattern list
    pub fn new(required_prefix: impl Into<String>, ignore: Vec<Regex>) -> Self {
        Self {
            required_prefix: required_prefix.into(),
            ignore,
        }
    }

    /// Builds the filter described by the configuration
    pub fn from_config(config: &MirrorConfig) -> Result<Self, ConfigError> {
        let ignore = compile_ignore_patterns(&config.ignore_patterns)?;
        Ok(Self::new(config.effective_required_prefix(), ignore))
    }

    /// The prefix followed pages must start with
    pub fn required_prefix(&self) -> &str {
        &self.required_prefix
    }

    /// Checks a canonical URL against the prefix and the ignore patterns
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL may be downloaded
    /// * `Err(Rejection)` - The first rule that excluded it
    pub fn check(&self, url: &Url) -> Result<(), Rejection> {
        let url = url.as_str();
        if !url.starts_with(&self.required_prefix) {
            return Err(Rejection::OutsidePrefix);
        }

        match self.ignore.iter().find(|pattern| pattern.is_match(url)) {
            Some(pattern) => Err(Rejection::Ignored(pattern.as_str().to_string())),
            None => Ok(()),
        }
    }

    /// Returns true if the URL may be downloaded
    pub fn admits(&self, url: &Url) -> bool {
        self.check(url).is_ok()
    }
}
