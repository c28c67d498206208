//! URL handling module for Sumi-Mirror
//!
//! This module maps URLs to files of the mirror and decides which discovered pages are
//! followed.

mod filename;
mod filter;
mod resolver;

pub use filename::{candidate_name, join_category, with_suffix};
pub use filter::{LinkFilter, Rejection};
pub use resolver::{PathResolver, ResolvedPath};

use url::Url;

/// Category directory for pages (kept at the top level of the mirror)
pub const PAGES: &str = ".";
/// Category directory for stylesheets
pub const STYLES: &str = "styles";
/// Category directory for images
pub const IMAGES: &str = "img";
/// Category directory for scripts
pub const SCRIPTS: &str = "js";
/// Category directory for video posters and sources
pub const VIDEO: &str = "video";
/// Category directory for resources referenced from stylesheets
pub const IN_CSS: &str = "in-css";

/// Returns the canonical form of a URL: the same URL without its fragment
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::canonical;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/page#section").unwrap();
/// assert_eq!(canonical(&url).as_str(), "https://example.com/page");
/// ```
pub fn canonical(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    canonical
}
