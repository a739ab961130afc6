use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    Always,
    Never,
    #[default]
    Ignore,
}

impl fmt::Display for TrailingSlash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrailingSlash::Always => "always",
            TrailingSlash::Never => "never",
            TrailingSlash::Ignore => "ignore",
        };
        formatter.write_str(name)
    }
}

fn collapse_separators(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for character in path.chars() {
        if character == '/' {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        collapsed.push(character);
    }
    collapsed
}

/// Normalizes a route path under the given trailing-slash policy.
///
/// Duplicate separators are always collapsed. The empty path is treated as the
/// root for `always` and `never`. Applying `normalize` twice gives the same
/// result as applying it once.
pub fn normalize(path: &str, policy: TrailingSlash) -> String {
    let collapsed = collapse_separators(path);
    match policy {
        TrailingSlash::Ignore => collapsed,
        TrailingSlash::Always => {
            let trimmed = collapsed.trim_end_matches('/');
            format!("{}/", trimmed)
        }
        TrailingSlash::Never => {
            let trimmed = collapsed.trim_end_matches('/');
            if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Joins the site base URL with a route, normalizing the route first.
///
/// The base URL may carry a path prefix (`https://example.com/portfolio/`);
/// the route is appended below it. Characters outside the URL path set,
/// such as non-ASCII letters, are percent-encoded.
pub fn canonical_url(base_url: &str, path: &str, policy: TrailingSlash) -> String {
    let base = base_url.trim_end_matches('/');
    let normalized = normalize(path, policy);
    let joined = if normalized.starts_with('/') {
        format!("{}{}", base, normalized)
    } else {
        format!("{}/{}", base, normalized)
    };
    match Url::parse(&joined) {
        Ok(url) => url.into(),
        Err(_) => joined,
    }
}

/// Output file for a route, relative to the output directory.
pub fn output_file(path: &str) -> PathBuf {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return PathBuf::from("index.html");
    }
    if trimmed == "404" {
        return PathBuf::from("404.html");
    }
    let mut output = PathBuf::new();
    for segment in trimmed.split('/').filter(|segment| !segment.is_empty()) {
        output.push(segment);
    }
    output.join("index.html")
}

/// Checks that a declared route can be served as a path below the base URL.
pub fn validate_route(path: &str) -> std::result::Result<(), String> {
    if !path.starts_with('/') {
        return Err("route must start with '/'".to_string());
    }
    if path.contains(['?', '#', '\\', '"', '<', '>']) {
        return Err("route must not contain '?', '#', '\\', quotes or angle brackets".to_string());
    }
    if path.bytes().any(|byte| byte < 0x20 || byte == b' ') {
        return Err("route must not contain whitespace or control characters".to_string());
    }
    if path.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err("route must not contain '.' or '..' segments".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub path: String,
    pub url: String,
    pub lastmod: Option<NaiveDate>,
    pub in_sitemap: bool,
}

/// Every composed route, in page declaration order. Derived once per build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const POLICIES: [TrailingSlash; 3] = [
        TrailingSlash::Always,
        TrailingSlash::Never,
        TrailingSlash::Ignore,
    ];

    #[test]
    fn test_always_appends_single_separator() {
        assert_eq!(normalize("/about", TrailingSlash::Always), "/about/");
        assert_eq!(normalize("/about///", TrailingSlash::Always), "/about/");
        assert_eq!(normalize("/", TrailingSlash::Always), "/");
        assert_eq!(normalize("", TrailingSlash::Always), "/");
    }

    #[test]
    fn test_never_strips_except_root() {
        assert_eq!(normalize("/about/", TrailingSlash::Never), "/about");
        assert_eq!(normalize("/about//", TrailingSlash::Never), "/about");
        assert_eq!(normalize("/", TrailingSlash::Never), "/");
        assert_eq!(normalize("///", TrailingSlash::Never), "/");
    }

    #[test]
    fn test_ignore_only_collapses_duplicates() {
        assert_eq!(normalize("/about", TrailingSlash::Ignore), "/about");
        assert_eq!(normalize("/about/", TrailingSlash::Ignore), "/about/");
        assert_eq!(
            normalize("//projects//rust/", TrailingSlash::Ignore),
            "/projects/rust/"
        );
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            canonical_url("https://example.com/", "/", TrailingSlash::Always),
            "https://example.com/"
        );
        assert_eq!(
            canonical_url("https://example.com/", "/about", TrailingSlash::Always),
            "https://example.com/about/"
        );
        assert_eq!(
            canonical_url("https://example.com", "/about/", TrailingSlash::Never),
            "https://example.com/about"
        );
        assert_eq!(
            canonical_url("https://example.com/me/", "/work", TrailingSlash::Always),
            "https://example.com/me/work/"
        );
    }

    #[test]
    fn test_canonical_url_percent_encodes_segments() {
        assert_eq!(
            canonical_url("https://example.com/", "/über", TrailingSlash::Always),
            "https://example.com/%C3%BCber/"
        );
        assert_eq!(
            canonical_url("https://example.com/", "/blog/日本", TrailingSlash::Never),
            "https://example.com/blog/%E6%97%A5%E6%9C%AC"
        );
    }

    #[test]
    fn test_output_file() {
        assert_eq!(output_file("/"), PathBuf::from("index.html"));
        assert_eq!(output_file("/about/"), PathBuf::from("about/index.html"));
        assert_eq!(output_file("/a/b"), PathBuf::from("a/b/index.html"));
        assert_eq!(output_file("/404"), PathBuf::from("404.html"));
    }

    #[test]
    fn test_validate_route() {
        assert!(validate_route("/about").is_ok());
        assert!(validate_route("about").is_err());
        assert!(validate_route("/../etc").is_err());
        assert!(validate_route("/a?b").is_err());
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(path in "[/a-z.]{0,24}") {
            for policy in POLICIES {
                let once = normalize(&path, policy);
                let twice = normalize(&once, policy);
                prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn normalize_never_leaves_double_separators(path in "[/a-z]{0,24}") {
            for policy in POLICIES {
                prop_assert!(!normalize(&path, policy).contains("//"));
            }
        }
    }
}
