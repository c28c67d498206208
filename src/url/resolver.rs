//! URL to local file mapping
//!
//! The [`PathResolver`] decides where every resource of the mirror is stored. It keeps a
//! bijection between canonical URLs (absolute, fragment removed) and local paths:
//! a URL is assigned exactly one path the first time it is seen, and that path is
//! never reused for another URL. Entries are never changed or removed.

use crate::url::canonical;
use crate::url::filename::{candidate_name, join_category, with_suffix};
use crate::{LinkError, LinkResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Canonical URL (absolute, without fragment)
    pub url: Url,

    /// Fragment of the link as written, if it had one
    pub fragment: Option<String>,

    /// Path of the local file, relative to the output directory
    pub local_path: String,

    /// Reference to write back into the document (local path plus fragment)
    pub reference: String,
}

#[derive(Debug, Default)]
struct PathTable {
    url_to_file: HashMap<String, String>,
    file_to_url: HashMap<String, String>,
}

impl PathTable {
    fn claim(&mut self, canonical: &str, candidate: String) -> String {
        let mut file_name = candidate.clone();
        let mut counter = 0;
        while self.file_to_url.contains_key(&file_name) {
            counter += 1;
            file_name = with_suffix(&candidate, counter);
        }

        self.file_to_url
            .insert(file_name.clone(), canonical.to_string());
        self.url_to_file
            .insert(canonical.to_string(), file_name.clone());
        file_name
    }
}

/// Owns the URL ↔ local file bijection shared by every parser
///
/// All resolution goes through one mutex, so concurrent callers always observe a
/// consistent mapping and the first caller for a URL decides its file name.
#[derive(Debug)]
pub struct PathResolver {
    root_path: String,
    table: Mutex<PathTable>,
}

impl PathResolver {
    /// Creates a resolver for a crawl rooted at `root`
    ///
    /// The path of `root` is stripped from every URL before a file name is derived.
    pub fn new(root: &Url) -> Self {
        Self {
            root_path: root.path().to_string(),
            table: Mutex::new(PathTable::default()),
        }
    }

    /// Resolves a link found in a document into a canonical URL and a local path
    ///
    /// # Arguments
    ///
    /// * `raw_link` - The link as written in the document
    /// * `base` - URL of the document containing the link
    /// * `local_prefix` - Category directory for new files (`"."` for pages)
    ///
    /// # Returns
    ///
    /// * `Ok(ResolvedPath)` - The mapping for this URL, created if it did not exist
    /// * `Err(LinkError)` - The link is empty, unparsable, or not http(s)
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_mirror::url::PathResolver;
    /// use url::Url;
    ///
    /// let root = Url::parse("http://a.test/index.html").unwrap();
    /// let resolver = PathResolver::new(&root);
    ///
    /// let css = resolver.resolve("/s.css", &root, "styles").unwrap();
    /// assert_eq!(css.local_path, "styles/s.css");
    ///
    /// let again = resolver.resolve("s.css#x", &root, "js").unwrap();
    /// assert_eq!(again.local_path, "styles/s.css");
    /// assert_eq!(again.reference, "styles/s.css#x");
    /// ```
    pub fn resolve(&self, raw_link: &str, base: &Url, local_prefix: &str) -> LinkResult<ResolvedPath> {
        let link = raw_link.trim();
        if link.is_empty() {
            return Err(LinkError::Empty);
        }

        let mut url = base.join(link).map_err(|source| LinkError::Parse {
            link: link.to_string(),
            source,
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LinkError::UnsupportedScheme {
                link: link.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let fragment = url.fragment().map(str::to_string);
        url.set_fragment(None);

        let local_path = {
            let mut table = self.lock();
            match table.url_to_file.get(url.as_str()) {
                Some(existing) => existing.clone(),
                None => {
                    let name = candidate_name(url.path(), &self.root_path);
                    let candidate = join_category(local_prefix, &name);
                    let assigned = table.claim(url.as_str(), candidate);
                    tracing::trace!("Assigned {} to {}", assigned, url);
                    assigned
                }
            }
        };

        let reference = match &fragment {
            Some(fragment) => format!("{}#{}", local_path, fragment),
            None => local_path.clone(),
        };

        Ok(ResolvedPath {
            url,
            fragment,
            local_path,
            reference,
        })
    }

    /// Returns the local path already assigned to `url`, ignoring its fragment
    pub fn lookup(&self, url: &Url) -> Option<String> {
        let canonical = canonical(url);
        self.lock().url_to_file.get(canonical.as_str()).cloned()
    }

    /// Number of URLs with an assigned path
    pub fn len(&self) -> usize {
        self.lock().url_to_file.len()
    }

    /// Returns true if no URL has been assigned a path yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, PathTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
