//! Stylesheet rewriting
//!
//! Each `url(...)` reference is resolved against the stylesheet's own URL and rewritten
//! to point into the `in-css` directory. Stylesheets live one level below the mirror
//! root, hence the `../` prefix on every rewritten reference.

use super::css_lexer::scan;
use super::ParseOutput;
use crate::crawler::CrawlTask;
use crate::url::{PathResolver, IN_CSS};
use url::Url;

/// Rewrites stylesheets
pub struct CssParser<'a> {
    resolver: &'a PathResolver,
}

impl<'a> CssParser<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        Self { resolver }
    }

    /// Rewrites every `url(...)` of the stylesheet fetched for `task`
    ///
    /// References are resolved against `base`, the URL the stylesheet was served from.
    /// Tokenizer errors are not fatal: the stylesheet is then stored exactly as fetched
    /// and nothing is discovered from it.
    pub fn process(&self, content: &[u8], base: &Url, task: &CrawlTask) -> ParseOutput {
        let urls = match scan(content) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!("Error parsing css {}: {}", task.url, e);
                return ParseOutput::unchanged(content);
            }
        };

        let mut rewritten = Vec::with_capacity(content.len());
        let mut discovered = Vec::new();
        let mut copied = 0;

        for url in urls {
            rewritten.extend_from_slice(&content[copied..url.span.start]);
            match self.rewrite_url(&url.value, base, task) {
                Some((reference, found)) => {
                    rewritten.extend_from_slice(format!("url(\"../{}\")", reference).as_bytes());
                    discovered.push(found);
                }
                None => rewritten.extend_from_slice(&content[url.span.clone()]),
            }
            copied = url.span.end;
        }
        rewritten.extend_from_slice(&content[copied..]);

        tracing::debug!(
            "Stylesheet {} references {} resources",
            task.url,
            discovered.len()
        );

        ParseOutput {
            content: rewritten,
            discovered,
        }
    }

    fn rewrite_url(&self, value: &str, base: &Url, task: &CrawlTask) -> Option<(String, CrawlTask)> {
        if value.trim_start().starts_with("data:") {
            return None;
        }

        match self.resolver.resolve(value, base, IN_CSS) {
            Ok(resolved) => {
                tracing::debug!("Found css resource {} -> {}", resolved.url, resolved.local_path);
                let found = CrawlTask::new(resolved.url, resolved.local_path, task.depth);
                Some((resolved.reference, found))
            }
            Err(e) => {
                tracing::warn!("Skipping css reference '{}' in {}: {}", value, task.url, e);
                None
            }
        }
    }
}
