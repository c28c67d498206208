//! Sumi-Mirror: an offline website mirror
//!
//! This crate crawls a website from one root URL, downloads every reachable page and
//! resource within a depth and URL-prefix boundary, and rewrites references so the saved
//! tree can be browsed from disk.

pub mod config;
pub mod crawler;
pub mod output;
pub mod parser;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sumi-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Cannot write {}: {source}", path.display())]
    FatalIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Required resource {url} failed: {reason}")]
    RequiredTaskFailed { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid environment '{0}', expected 'development' or 'production'")]
    InvalidEnvironment(String),
}

/// Errors returned by a fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },
}

/// Errors raised while parsing fetched content
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No parser for content type '{0}'")]
    UnsupportedContentType(String),

    #[error("Could not prepare html rules: {0}")]
    Html(String),
}

/// Errors raised while resolving a single link
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Failed to parse link '{link}': {source}")]
    Parse {
        link: String,
        source: ::url::ParseError,
    },

    #[error("Empty link")]
    Empty,

    #[error("Unsupported URL scheme '{scheme}' in {link}")]
    UnsupportedScheme { link: String, scheme: String },
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for link resolution
pub type LinkResult<T> = std::result::Result<T, LinkError>;

// Re-export commonly used types
pub use config::MirrorConfig;
pub use crawler::{CrawlScheduler, CrawlTask};
pub use url::{PathResolver, ResolvedPath};
