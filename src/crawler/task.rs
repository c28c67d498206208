use url::Url;

/// A document waiting to be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Canonical URL to fetch
    pub url: Url,

    /// Failure of a required task aborts the whole run (only the root is required)
    pub required: bool,

    /// Where the document is stored, relative to the output directory
    pub local_path: String,

    /// Number of anchor hops from the root page
    pub depth: u32,
}

impl CrawlTask {
    /// Creates an optional task
    pub fn new(url: Url, local_path: impl Into<String>, depth: u32) -> Self {
        Self {
            url,
            required: false,
            local_path: local_path.into(),
            depth,
        }
    }

    /// Creates the required root task at depth 0
    pub fn root(url: Url, local_path: impl Into<String>) -> Self {
        Self {
            required: true,
            ..Self::new(url, local_path, 0)
        }
    }
}

/// A downloaded document waiting to be parsed
#[derive(Debug)]
pub struct ParseTask {
    pub task: CrawlTask,
    /// URL the document was served from; differs from `task.url` after a redirect
    pub base: Url,
    pub body: Vec<u8>,
    pub content_type: String,
}
