//! Content parsers for the mirror
//!
//! Every fetched document is handed to exactly one parser, chosen from its
//! `Content-Type`:
//! - HTML pages are rewritten and scanned for pages and resources
//! - Stylesheets are rewritten and scanned for `url(...)` references
//! - Scripts, images, fonts and video are stored unchanged
//!
//! Parsers are synchronous. They resolve links through the shared [`PathResolver`] and
//! return the rewritten bytes together with the tasks they discovered.

mod css;
pub mod css_lexer;
mod html;
mod passthrough;

pub use css::CssParser;
pub use css_lexer::{LexError, UrlRef};
pub use html::{HtmlParser, HtmlRules};
pub use passthrough::PassthroughParser;

use crate::crawler::{CrawlTask, ParseTask};
use crate::url::{LinkFilter, PathResolver};
use crate::ParseError;
use url::Url;

/// Broad family of a fetched document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    Script,
    Media,
}

impl ContentKind {
    /// Classifies a `Content-Type` header value
    ///
    /// Returns `None` for types the mirror does not store.
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_mirror::parser::ContentKind;
    ///
    /// assert_eq!(ContentKind::classify("text/html; charset=utf-8"), Some(ContentKind::Html));
    /// assert_eq!(ContentKind::classify("image/png"), Some(ContentKind::Media));
    /// assert_eq!(ContentKind::classify("application/json"), None);
    /// ```
    pub fn classify(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();

        if content_type.contains("text/html") {
            Some(Self::Html)
        } else if content_type.contains("text/css") {
            Some(Self::Css)
        } else if content_type.contains("javascript") {
            Some(Self::Script)
        } else if ["image/", "font/", "video/"]
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
        {
            Some(Self::Media)
        } else {
            None
        }
    }
}

/// Rewritten content of a document plus the resources it references
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub content: Vec<u8>,
    pub discovered: Vec<CrawlTask>,
}

impl ParseOutput {
    /// Output that stores `content` as-is and discovers nothing
    pub fn unchanged(content: &[u8]) -> Self {
        Self {
            content: content.to_vec(),
            discovered: Vec::new(),
        }
    }
}

/// Shared state every parser needs: the path mapping, the page filter, and the
/// precompiled HTML rules
#[derive(Debug)]
pub struct ParseContext {
    resolver: PathResolver,
    filter: LinkFilter,
    html: HtmlRules,
}

impl ParseContext {
    pub fn new(resolver: PathResolver, filter: LinkFilter) -> Result<Self, ParseError> {
        Ok(Self {
            resolver,
            filter,
            html: HtmlRules::new()?,
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn filter(&self) -> &LinkFilter {
        &self.filter
    }
}

/// The parser selected for one document
pub enum Parser<'a> {
    Html(HtmlParser<'a>),
    Css(CssParser<'a>),
    Passthrough(PassthroughParser),
}

impl<'a> Parser<'a> {
    /// Selects the parser for a `Content-Type`, or `None` when the type is unsupported
    pub fn for_content_type(content_type: &str, context: &'a ParseContext) -> Option<Self> {
        let parser = match ContentKind::classify(content_type)? {
            ContentKind::Html => Self::Html(HtmlParser::new(
                &context.resolver,
                &context.filter,
                &context.html,
            )),
            ContentKind::Css => Self::Css(CssParser::new(&context.resolver)),
            ContentKind::Script | ContentKind::Media => Self::Passthrough(PassthroughParser),
        };
        Some(parser)
    }

    /// Parses one fetched document belonging to `task`, served from `base`
    pub fn process(&self, content: &[u8], base: &Url, task: &CrawlTask) -> ParseOutput {
        match self {
            Self::Html(parser) => parser.process(content, base, task),
            Self::Css(parser) => parser.process(content, base, task),
            Self::Passthrough(parser) => parser.process(content),
        }
    }
}

/// Parses a fetched document with the parser matching its content type
///
/// Relative links are resolved against the URL the document was served from.
///
/// # Returns
///
/// * `Ok(ParseOutput)` - Rewritten content and discovered tasks
/// * `Err(ParseError::UnsupportedContentType)` - No parser handles this type
pub fn parse_document(context: &ParseContext, document: &ParseTask) -> Result<ParseOutput, ParseError> {
    let parser = Parser::for_content_type(&document.content_type, context)
        .ok_or_else(|| ParseError::UnsupportedContentType(document.content_type.clone()))?;
    Ok(parser.process(&document.body, &document.base, &document.task))
}
