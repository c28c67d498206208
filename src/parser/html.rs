//! HTML page rewriting
//!
//! This module rewrites a fetched page so that it can be browsed from disk:
//! - Stylesheets, images, scripts and video resources are pointed at their local copies
//! - Anchors to pages inside the mirror boundary are pointed at the local page files
//! - Subresource integrity attributes are dropped from rewritten elements
//!
//! Every rewritten reference is also returned as a new [`CrawlTask`].

use super::ParseOutput;
use crate::crawler::CrawlTask;
use crate::url::{LinkFilter, PathResolver, IMAGES, PAGES, SCRIPTS, STYLES, VIDEO};
use crate::ParseError;
use ego_tree::{NodeMut, NodeRef};
use scraper::{Html, Node, Selector};
use url::Url;

/// Attributes that no longer hold once a resource is served from the mirror
const ORIGIN_BOUND_ATTRIBUTES: &[&str] = &["integrity", "crossorigin"];

/// Selectors used by [`HtmlParser`], compiled once per crawl
#[derive(Debug)]
pub struct HtmlRules {
    stylesheet: Selector,
    image: Selector,
    script: Selector,
    anchor: Selector,
    poster: Selector,
    source: Selector,
    noscript: Selector,
}

impl HtmlRules {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            stylesheet: selector(r#"link[rel~="stylesheet"][href]"#)?,
            image: selector("img[src]")?,
            script: selector("script[src]")?,
            anchor: selector("a[href]")?,
            poster: selector("video[poster]")?,
            source: selector("source[src]")?,
            noscript: selector("noscript")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Html(format!("invalid selector '{}'", css)))
}

/// Rewrites HTML pages
pub struct HtmlParser<'a> {
    resolver: &'a PathResolver,
    filter: &'a LinkFilter,
    rules: &'a HtmlRules,
}

impl<'a> HtmlParser<'a> {
    pub fn new(resolver: &'a PathResolver, filter: &'a LinkFilter, rules: &'a HtmlRules) -> Self {
        Self {
            resolver,
            filter,
            rules,
        }
    }

    /// Rewrites the page fetched for `task`, resolving relative links against `base`
    ///
    /// # Link Rewriting Rules
    ///
    /// | Element | Attribute | Directory | Depth |
    /// |---------|-----------|-----------|-------|
    /// | `<link rel="stylesheet">` | `href` | `styles/` | page depth |
    /// | `<img>` (not `data:`) | `src` | `img/` | page depth |
    /// | `<script>` (external only) | `src` | `js/` | page depth |
    /// | `<a>` (not `#...`) | `href` | top level | page depth + 1 |
    /// | `<video>` | `poster` | `video/` | page depth |
    /// | `<source>` | `src` | `video/` | page depth |
    ///
    /// Anchors are only rewritten when the target passes the [`LinkFilter`]; all other
    /// anchors keep pointing at the live site. Links that cannot be resolved are left
    /// as they are.
    ///
    /// # Arguments
    ///
    /// * `content` - The page body; invalid UTF-8 sequences are replaced
    /// * `base` - The URL the page was actually served from, after redirects
    /// * `task` - The task the page was fetched for
    pub fn process(&self, content: &[u8], base: &Url, task: &CrawlTask) -> ParseOutput {
        let text = String::from_utf8_lossy(content);
        let mut document = Html::parse_document(&text);
        unwrap_noscript(&mut document, &self.rules.noscript);
        let mut discovered = Vec::new();

        let resources = [
            (&self.rules.stylesheet, "href", STYLES, ORIGIN_BOUND_ATTRIBUTES),
            (&self.rules.image, "src", IMAGES, &[][..]),
            (&self.rules.script, "src", SCRIPTS, ORIGIN_BOUND_ATTRIBUTES),
        ];
        for (selector, attribute, category, strip) in resources {
            rewrite_attribute(&mut document, selector, attribute, strip, |link| {
                self.resource(link, category, base, task, &mut discovered)
            });
        }

        rewrite_attribute(
            &mut document,
            &self.rules.anchor,
            "href",
            ORIGIN_BOUND_ATTRIBUTES,
            |link| self.anchor(link, base, task, &mut discovered),
        );

        for (selector, attribute) in [(&self.rules.poster, "poster"), (&self.rules.source, "src")] {
            rewrite_attribute(&mut document, selector, attribute, &[], |link| {
                self.resource(link, VIDEO, base, task, &mut discovered)
            });
        }

        tracing::debug!("Page {} references {} documents", task.url, discovered.len());

        ParseOutput {
            content: document.html().into_bytes(),
            discovered,
        }
    }

    /// Resolves a resource link; resources inherit the depth of the page
    fn resource(
        &self,
        link: &str,
        category: &str,
        base: &Url,
        task: &CrawlTask,
        discovered: &mut Vec<CrawlTask>,
    ) -> Option<String> {
        if link.trim_start().starts_with("data:") {
            return None;
        }

        match self.resolver.resolve(link, base, category) {
            Ok(resolved) => {
                tracing::debug!("Found {} resource {}", category, resolved.url);
                discovered.push(CrawlTask::new(resolved.url, resolved.local_path, task.depth));
                Some(resolved.reference)
            }
            Err(e) => {
                tracing::warn!("Skipping link '{}' in {}: {}", link, task.url, e);
                None
            }
        }
    }

    /// Resolves an anchor; admitted pages are one level deeper than the current page
    fn anchor(
        &self,
        link: &str,
        base: &Url,
        task: &CrawlTask,
        discovered: &mut Vec<CrawlTask>,
    ) -> Option<String> {
        if link.trim_start().starts_with('#') {
            return None;
        }

        let resolved = match self.resolver.resolve(link, base, PAGES) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("Skipping anchor '{}' in {}: {}", link, task.url, e);
                return None;
            }
        };

        if let Err(rejection) = self.filter.check(&resolved.url) {
            tracing::debug!("Not following {}: {:?}", resolved.url, rejection);
            return None;
        }

        tracing::debug!("Found page {}", resolved.url);
        discovered.push(CrawlTask::new(resolved.url, resolved.local_path, task.depth + 1));
        Some(resolved.reference)
    }
}

/// Replaces every `<noscript>` element with the markup it contains
///
/// With scripting enabled the HTML parser keeps `<noscript>` content as a single text
/// node, which would hide the resources it references. That text is parsed as a fragment
/// and its nodes take the place of the element.
fn unwrap_noscript(document: &mut Html, selector: &Selector) {
    let targets: Vec<_> = document
        .select(selector)
        .map(|element| (element.id(), element.text().collect::<String>()))
        .collect();

    for (id, markup) in targets {
        let fragment = Html::parse_fragment(&markup);
        let Some(mut noscript) = document.tree.get_mut(id) else {
            continue;
        };

        for child in fragment.root_element().children() {
            let mut copy = noscript.insert_before(child.value().clone());
            copy_children(child, &mut copy);
        }
        noscript.detach();
    }
}

fn copy_children(source: NodeRef<'_, Node>, target: &mut NodeMut<'_, Node>) {
    for child in source.children() {
        let mut copy = target.append(child.value().clone());
        copy_children(child, &mut copy);
    }
}

/// Rewrites `attribute` on every element matched by `selector`
///
/// `rewrite` receives the current value and returns the replacement, or `None` to leave
/// the element untouched. The `strip` attributes are removed from rewritten elements.
fn rewrite_attribute<F>(
    document: &mut Html,
    selector: &Selector,
    attribute: &str,
    strip: &[&str],
    mut rewrite: F,
) where
    F: FnMut(&str) -> Option<String>,
{
    let targets: Vec<_> = document
        .select(selector)
        .filter_map(|element| {
            element
                .value()
                .attr(attribute)
                .filter(|value| !value.trim().is_empty())
                .map(|value| (element.id(), value.to_string()))
        })
        .collect();

    for (id, value) in targets {
        let Some(replacement) = rewrite(&value) else {
            continue;
        };
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };

        if let Node::Element(element) = node.value() {
            for (name, current) in element.attrs.iter_mut() {
                if &*name.local == attribute {
                    *current = replacement.as_str().into();
                }
            }

            if !strip.is_empty() {
                let attrs = std::mem::take(&mut element.attrs);
                element.attrs = attrs
                    .into_iter()
                    .filter(|(name, _)| !strip.contains(&&*name.local))
                    .collect();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    struct Fixture {
        resolver: PathResolver,
        filter: LinkFilter,
        rules: HtmlRules,
    }

    impl Fixture {
        fn new(filter: LinkFilter) -> Self {
            let root = Url::parse("http://a.test/index.html").unwrap();
            Self {
                resolver: PathResolver::new(&root),
                filter,
                rules: HtmlRules::new().unwrap(),
            }
        }

        fn parser(&self) -> HtmlParser<'_> {
            HtmlParser::new(&self.resolver, &self.filter, &self.rules)
        }
    }

    fn page(url: &str, local_path: &str, depth: u32) -> CrawlTask {
        CrawlTask::new(Url::parse(url).unwrap(), local_path, depth)
    }

    fn render(output: &ParseOutput) -> String {
        String::from_utf8(output.content.clone()).unwrap()
    }

    #[test]
    fn test_stylesheet_and_anchor() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let root = fixture.resolver.resolve("http://a.test/index.html", &Url::parse("http://a.test/").unwrap(), PAGES).unwrap();
        let task = page("http://a.test/index.html", &root.local_path, 0);

        let html = r#"<html><head><link rel="stylesheet" href="/s.css" integrity="sha384-abc" crossorigin="anonymous"></head>
            <body><a href="/p.html">P</a></body></html>"#;
        let output = fixture.parser().process(html.as_bytes(), &task.url, &task);
        let rendered = render(&output);

        assert_eq!(root.local_path, "index.html");
        assert!(rendered.contains(r#"href="styles/s.css""#));
        assert!(rendered.contains(r#"href="p.html""#));
        assert!(!rendered.contains("integrity"));
        assert!(!rendered.contains("crossorigin"));

        assert_eq!(output.discovered.len(), 2);
        let css = &output.discovered[0];
        assert_eq!(css.url.as_str(), "http://a.test/s.css");
        assert_eq!(css.local_path, "styles/s.css");
        assert_eq!(css.depth, 0);
        let p = &output.discovered[1];
        assert_eq!(p.url.as_str(), "http://a.test/p.html");
        assert_eq!(p.local_path, "p.html");
        assert_eq!(p.depth, 1);
    }

    #[test]
    fn test_images_scripts_and_video() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/index.html", "index.html", 3);
        let html = r#"<body>
            <img src="/img/logo.png"><img src="data:image/gif;base64,R0lGOD">
            <script src="/app.js" integrity="x"></script><script>var inline = 1;</script>
            <video poster="/poster.jpg"><source src="/movie.mp4" type="video/mp4"></video>
        </body>"#;
        let output = fixture.parser().process(html.as_bytes(), &task.url, &task);
        let rendered = render(&output);

        assert!(rendered.contains(r#"src="img/logo.png""#));
        assert!(rendered.contains(r#"src="data:image/gif;base64,R0lGOD""#));
        assert!(rendered.contains(r#"src="js/app.js""#));
        assert!(rendered.contains("var inline = 1;"));
        assert!(rendered.contains(r#"poster="video/poster.jpg""#));
        assert!(rendered.contains(r#"src="video/movie.mp4""#));

        let paths: Vec<_> = output.discovered.iter().map(|t| t.local_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["img/logo.png", "js/app.js", "video/poster.jpg", "video/movie.mp4"]
        );
        assert!(output.discovered.iter().all(|t| t.depth == 3));
    }

    #[test]
    fn test_anchor_filtering() {
        let fixture = Fixture::new(LinkFilter::new(
            "http://a.test/docs/",
            vec![Regex::new("logout").unwrap()],
        ));
        let task = page("http://a.test/docs/index.html", "index.html", 0);
        let html = r##"<body>
            <a href="intro.html">in</a>
            <a href="http://other.test/x">out</a>
            <a href="/docs/logout">ignored</a>
            <a href="#top">frag</a>
            <a href="mailto:me@a.test">mail</a>
        </body>"##;
        let output = fixture.parser().process(html.as_bytes(), &task.url, &task);
        let rendered = render(&output);

        assert!(rendered.contains(r#"href="intro.html""#));
        assert!(rendered.contains(r#"href="http://other.test/x""#));
        assert!(rendered.contains(r#"href="/docs/logout""#));
        assert!(rendered.contains("href=\"#top\""));
        assert!(rendered.contains(r#"href="mailto:me@a.test""#));

        assert_eq!(output.discovered.len(), 1);
        assert_eq!(output.discovered[0].url.as_str(), "http://a.test/docs/intro.html");
    }

    #[test]
    fn test_anchor_fragment_is_kept() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/index.html", "index.html", 0);
        let output = fixture
            .parser()
            .process(br#"<a href="/guide#install">g</a>"#, &task.url, &task);

        assert!(render(&output).contains(r#"href="guide.html#install""#));
        assert_eq!(output.discovered[0].url.as_str(), "http://a.test/guide");
    }

    #[test]
    fn test_noscript_content_is_discovered() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/index.html", "index.html", 0);
        let html = r#"<body><NOSCRIPT><img src="/pixel.gif"></NOSCRIPT></body>"#;
        let output = fixture.parser().process(html.as_bytes(), &task.url, &task);

        assert!(!render(&output).to_lowercase().contains("noscript"));
        assert_eq!(output.discovered.len(), 1);
        assert_eq!(output.discovered[0].local_path, "img/pixel.gif");
    }

    #[test]
    fn test_noscript_text_in_scripts_and_comments_is_kept() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/index.html", "index.html", 0);
        let html = r#"<head><script>var banner = "<noscript>enable js</noscript>";</script></head>
            <body><!-- <noscript><img src="/hidden.gif"></noscript> --><p>text</p></body>"#;
        let output = fixture.parser().process(html.as_bytes(), &task.url, &task);
        let rendered = render(&output);

        assert!(rendered.contains(r#"var banner = "<noscript>enable js</noscript>";"#));
        assert!(rendered.contains(r#"<!-- <noscript><img src="/hidden.gif"></noscript> -->"#));
        assert!(output.discovered.is_empty());
    }

    #[test]
    fn test_noscript_keeps_surrounding_order() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/index.html", "index.html", 0);
        let html = r#"<body><p>before</p><noscript><div><a href="/plain">x</a></div></noscript><p>after</p></body>"#;
        let output = fixture.parser().process(html.as_bytes(), &task.url, &task);
        let rendered = render(&output);

        let before = rendered.find("before").unwrap();
        let link = rendered.find(r#"<div><a href="plain.html">x</a></div>"#).unwrap();
        let after = rendered.find("after").unwrap();
        assert!(before < link && link < after);
        assert_eq!(output.discovered.len(), 1);
    }

    #[test]
    fn test_links_resolve_against_base() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/docs", "docs.html", 0);
        let base = Url::parse("http://a.test/docs/").unwrap();
        let html = br#"<img src="logo.png"><a href="intro">intro</a>"#;
        let output = fixture.parser().process(html, &base, &task);

        let urls: Vec<_> = output.discovered.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.test/docs/logo.png", "http://a.test/docs/intro"]);
    }

    #[test]
    fn test_shared_resource_gets_same_reference() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let html = br#"<img src="/logo.png">"#;

        let a = page("http://a.test/a.html", "a.html", 1);
        let c = page("http://a.test/b/c.html", "c.html", 1);
        let first = fixture.parser().process(html, &a.url, &a);
        let second = fixture.parser().process(html, &c.url, &c);

        assert!(render(&first).contains(r#"src="img/logo.png""#));
        assert!(render(&second).contains(r#"src="img/logo.png""#));
        assert_eq!(first.discovered[0].url, second.discovered[0].url);
        assert_eq!(fixture.resolver.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let fixture = Fixture::new(LinkFilter::new("http://a.test/", vec![]));
        let task = page("http://a.test/index.html", "index.html", 0);
        let mut html = b"<p>caf".to_vec();
        html.push(0xe9);
        html.extend_from_slice(br#"</p><img src="/a.png">"#);

        let output = fixture.parser().process(&html, &task.url, &task);
        assert_eq!(output.discovered.len(), 1);
    }
}
