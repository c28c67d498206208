/// Derives the local file name for a URL path
///
/// The crawl root's path is stripped first, then a trailing `/index.html` and any
/// trailing slashes are collapsed. The terminal segment that remains is the file name;
/// `index.html` is used when nothing remains, and `.html` is appended to segments
/// without an extension.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::candidate_name;
///
/// assert_eq!(candidate_name("/index.html", "/index.html"), "index.html");
/// assert_eq!(candidate_name("/docs/guide/", "/"), "guide.html");
/// assert_eq!(candidate_name("/assets/site.css", "/"), "site.css");
/// ```
pub fn candidate_name(url_path: &str, root_path: &str) -> String {
    let mut relative = url_path.strip_prefix(root_path).unwrap_or(url_path);

    if let Some(stripped) = relative.strip_suffix("/index.html") {
        relative = stripped;
    }
    let relative = relative.trim_end_matches('/');

    let segment = relative.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return "index.html".to_string();
    }

    if has_extension(segment) {
        segment.to_string()
    } else {
        format!("{}.html", segment)
    }
}

/// Joins a category directory and a file name
///
/// The page category `"."` (or an empty category) keeps files at the top level.
pub fn join_category(category: &str, name: &str) -> String {
    let category = category.trim_end_matches('/');
    if category.is_empty() || category == "." {
        name.to_string()
    } else {
        format!("{}/{}", category, name)
    }
}

/// Inserts a numeric suffix before the extension: `logo.png` becomes `logo_2.png`
pub fn with_suffix(name: &str, counter: u32) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}_{}{}", &name[..dot], counter, &name[dot..]),
        None => format!("{}_{}", name, counter),
    }
}

fn has_extension(segment: &str) -> bool {
    segment.contains('.')
}
