//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! download/parse/write cycle end-to-end into a temporary directory.

use std::path::Path;
use sumi_mirror::config::{validate, MirrorConfig};
use sumi_mirror::crawler::mirror;
use sumi_mirror::MirrorError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a validated test configuration rooted at the mock server
fn create_test_config(root_url: &str, output: &Path) -> MirrorConfig {
    let mut config = MirrorConfig::new(root_url);
    config.output_dir = output.to_path_buf();
    config.download_concurrency = 3;
    config.parse_concurrency = 2;
    validate(&config).expect("test config should be valid");
    config
}

/// Mounts a GET mock answering with `body` and `content_type`
async fn serve(server: &MockServer, route: &str, content_type: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), content_type))
        .mount(server)
        .await;
}

/// Mounts a GET mock that must never be requested
async fn forbid(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw("forbidden", "text/html"))
        .expect(0)
        .mount(server)
        .await;
}

fn read(dir: &TempDir, file: &str) -> String {
    std::fs::read_to_string(dir.path().join(file))
        .unwrap_or_else(|e| panic!("{} should have been written: {}", file, e))
}

#[tokio::test]
async fn test_full_mirror() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(
        &mock_server,
        "/",
        "text/html; charset=utf-8",
        r##"<!DOCTYPE html><html><head>
            <link rel="stylesheet" href="/s.css">
            <script src="/app.js" integrity="sha384-xyz" crossorigin="anonymous"></script>
        </head><body>
            <img src="/logo.png">
            <a href="/p.html">Page</a>
            <a href="#content">Skip</a>
        </body></html>"##,
    )
    .await;
    serve(
        &mock_server,
        "/s.css",
        "text/css",
        "@font-face { src: url('/fonts/f.woff2') }",
    )
    .await;
    serve(&mock_server, "/fonts/f.woff2", "font/woff2", "FONT").await;
    serve(&mock_server, "/app.js", "application/javascript", "console.log(1);").await;
    serve(&mock_server, "/logo.png", "image/png", "PNG").await;
    serve(&mock_server, "/p.html", "text/html", "<p>Second page</p>").await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    let summary = mirror(config, None).await.expect("mirror should succeed");

    let index = read(&output, "index.html");
    assert!(index.contains(r#"href="styles/s.css""#));
    assert!(index.contains(r#"src="js/app.js""#));
    assert!(index.contains(r#"src="img/logo.png""#));
    assert!(index.contains(r#"href="p.html""#));
    assert!(index.contains("href=\"#content\""));
    assert!(!index.contains("integrity"));

    assert_eq!(
        read(&output, "styles/s.css"),
        r#"@font-face { src: url("../in-css/f.woff2") }"#
    );
    assert_eq!(read(&output, "in-css/f.woff2"), "FONT");
    assert_eq!(read(&output, "js/app.js"), "console.log(1);");
    assert_eq!(read(&output, "img/logo.png"), "PNG");
    assert!(read(&output, "p.html").contains("Second page"));

    assert!(summary.completed);
    assert_eq!(summary.fetched, 6);
    assert_eq!(summary.written, 6);
}

#[tokio::test]
async fn test_shared_resource_downloaded_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<a href="/a.html">A</a><a href="/b.html">B</a><img src="/logo.png">"#,
    )
    .await;
    serve(&mock_server, "/a.html", "text/html", r#"<img src="/logo.png">"#).await;
    serve(&mock_server, "/b.html", "text/html", r#"<img src="logo.png">"#).await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("LOGO", "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    mirror(config, None).await.unwrap();

    assert_eq!(read(&output, "img/logo.png"), "LOGO");
    assert!(read(&output, "a.html").contains(r#"src="img/logo.png""#));
    assert!(read(&output, "b.html").contains(r#"src="img/logo.png""#));
    assert!(!output.path().join("img/logo_1.png").exists());
}

#[tokio::test]
async fn test_prefix_and_ignore_patterns() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(
        &mock_server,
        "/docs/",
        "text/html",
        r#"<a href="guide">Guide</a>
           <a href="/blog/">Blog</a>
           <a href="/docs/private/keys">Keys</a>
           <a href="/docs/manual.pdf">PDF</a>"#,
    )
    .await;
    serve(&mock_server, "/docs/guide", "text/html", "<p>Guide</p>").await;
    forbid(&mock_server, "/blog/").await;
    forbid(&mock_server, "/docs/private/keys").await;
    forbid(&mock_server, "/docs/manual.pdf").await;

    let mut config = create_test_config(&format!("{}/docs/", base_url), output.path());
    config.ignore_patterns = vec!["/private/".to_string(), r"\.pdf$".to_string()];
    validate(&config).unwrap();

    mirror(config, None).await.unwrap();

    let index = read(&output, "index.html");
    assert!(index.contains(r#"href="guide.html""#));
    assert!(index.contains(r#"href="/blog/""#));
    assert!(index.contains(r#"href="/docs/private/keys""#));
    assert!(read(&output, "guide.html").contains("Guide"));
}

#[tokio::test]
async fn test_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<a href="/next">Next</a><img src="/pic.gif">"#,
    )
    .await;
    serve(&mock_server, "/pic.gif", "image/gif", "GIF").await;
    forbid(&mock_server, "/next").await;

    let mut config = create_test_config(&format!("{}/", base_url), output.path());
    config.max_depth = 0;

    let summary = mirror(config, None).await.unwrap();

    assert_eq!(read(&output, "img/pic.gif"), "GIF");
    assert!(!output.path().join("next.html").exists());
    assert_eq!(summary.dropped_depth, 1);
}

#[tokio::test]
async fn test_cyclic_links_terminate() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(&mock_server, "/", "text/html", r#"<a href="/loop">Loop</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"<a href="/">Home</a><a href="/loop#again">Again</a>"#, "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    let summary = mirror(config, None).await.unwrap();

    assert!(summary.completed);
    let page = read(&output, "loop.html");
    assert!(page.contains(r#"href="index.html""#));
    assert!(page.contains(r##"href="loop.html#again""##));
}

#[tokio::test]
async fn test_root_not_found_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    let err = mirror(config, None).await.unwrap_err();

    assert!(matches!(err, MirrorError::RequiredTaskFailed { .. }));
    assert!(!output.path().join("index.html").exists());
}

#[tokio::test]
async fn test_broken_stylesheet_kept_verbatim() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    let broken = "body { background: url(bg.png) }\n/* comment never closed";
    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<link rel="stylesheet" href="/broken.css">"#,
    )
    .await;
    serve(&mock_server, "/broken.css", "text/css", broken).await;
    forbid(&mock_server, "/bg.png").await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    mirror(config, None).await.unwrap();

    assert_eq!(read(&output, "styles/broken.css"), broken);
}

#[tokio::test]
async fn test_unsupported_and_failed_resources_are_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(
        &mock_server,
        "/",
        "text/html",
        r#"<img src="/gone.png"><a href="/data.json">Data</a><a href="/ok">Ok</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    serve(&mock_server, "/data.json", "application/json", "{}").await;
    serve(&mock_server, "/ok", "text/html", "ok").await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    let summary = mirror(config, None).await.unwrap();

    assert!(summary.completed);
    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(summary.unsupported, 1);
    assert!(output.path().join("ok.html").exists());
    assert!(!output.path().join("data.json").exists());
    assert!(!output.path().join("img/gone.png").exists());
}

#[tokio::test]
async fn test_redirected_page_links_resolve_against_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output = TempDir::new().unwrap();

    serve(&mock_server, "/", "text/html", r#"<a href="/docs">Docs</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/docs/"))
        .mount(&mock_server)
        .await;
    serve(&mock_server, "/docs/", "text/html", r#"<img src="logo.png">"#).await;
    serve(&mock_server, "/docs/logo.png", "image/png", "LOGO").await;
    forbid(&mock_server, "/logo.png").await;

    let config = create_test_config(&format!("{}/", base_url), output.path());
    mirror(config, None).await.unwrap();

    assert_eq!(read(&output, "img/logo.png"), "LOGO");
    assert!(read(&output, "docs.html").contains(r#"src="img/logo.png""#));
}
