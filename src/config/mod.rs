//! Configuration module for Sumi-Mirror
//!
//! Configuration comes from three layers: built-in defaults, an optional TOML file,
//! and command-line flags (which may also be given as `SUMI_MIRROR_*` environment
//! variables). The merged result is validated once before the crawl starts.
//!
//! # Example
//!
//! ```no_run
//! use sumi_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring {} up to depth {}", config.root_url, config.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ConfigOverrides, Environment, MirrorConfig, DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_MAX_DEPTH,
    DEFAULT_OUTPUT_DIR, DEFAULT_PARSE_CONCURRENCY,
};

pub use parser::{build_config, compute_config_hash, load_config, read_config};
pub use validation::{compile_ignore_patterns, validate};
