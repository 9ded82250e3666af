//! Path and URL derivation for pages.
//!
//! This module handles conversions between:
//! - Source file paths (page sources under the pages root)
//! - Relative output paths (always ending in `index.html`)
//! - Public paths and URLs (where the page is served)

use std::path::{Path, PathBuf};

/// Source suffixes stripped before deriving the output path.
const SOURCE_SUFFIXES: &[&str] = &[".tera", ".markdown", ".md"];

/// Output location and public address of a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute {
    /// Output path relative to the build output root (e.g. `about/index.html`)
    pub relative_output_path: String,
    /// URL path without trailing slash (e.g. `/about`, or `""` for the root)
    pub public_path: String,
    /// `site_base_url + public_path`
    pub public_url: String,
}

/// Derive the route of a page source.
///
/// # Examples
/// ```ignore
/// derive("pages/about/index.tera", "pages", "http://example.com")
///     => about/index.html, /about, http://example.com/about
/// derive("pages/index.md", "pages", "http://example.com")
///     => index.html, "", http://example.com
/// derive("pages/blog/post.md", "pages", "http://example.com")
///     => blog/post/index.html, /blog/post, http://example.com/blog/post
/// ```
pub fn derive(source_path: &Path, pages_root: &Path, site_base_url: &str) -> PageRoute {
    let relative = source_path.strip_prefix(pages_root).unwrap_or(source_path);
    let relative = strip_source_extension(relative);

    let relative_output_path = relative_output_path(&relative);
    let public_path = public_path(&relative_output_path);
    let public_url = join_url(site_base_url, &public_path);

    PageRoute {
        relative_output_path,
        public_path,
        public_url,
    }
}

/// Remove the page format suffix and normalize separators to `/`.
///
/// Suffixes match case-insensitively, like content kinds. Only the first
/// recognised suffix is removed; `notes.md.tera` becomes `notes.md`.
pub fn strip_source_extension(relative: &Path) -> String {
    let mut path_str = relative.to_string_lossy().replace('\\', "/");
    let lowercase = path_str.to_ascii_lowercase();

    if let Some(suffix) = SOURCE_SUFFIXES.iter().find(|s| lowercase.ends_with(*s)) {
        path_str.truncate(path_str.len() - suffix.len());
    }

    path_str
}

/// Map an extension-less relative page path to its output path.
fn relative_output_path(relative: &str) -> String {
    if relative == "index" || relative == "index/index" {
        return "index.html".to_string();
    }

    let filename = relative.rsplit('/').next().unwrap_or(relative);
    if filename == "index" {
        format!("{relative}.html")
    } else {
        format!("{relative}/index.html")
    }
}

/// Turn an output path into the public URL path.
///
/// `about/index.html` -> `/about`, `index.html` -> `""`
fn public_path(relative_output_path: &str) -> String {
    let with_slash = format!("/{relative_output_path}");
    let without_index = with_slash.strip_suffix("index.html").unwrap_or(&with_slash);
    without_index
        .strip_suffix('/')
        .unwrap_or(without_index)
        .to_string()
}

/// Concatenate a base URL and a public path.
///
/// No separator is inserted: public paths already carry their leading slash,
/// and the root page (empty path) maps to exactly the base URL.
pub fn join_url(base: &str, public_path: &str) -> String {
    format!("{base}{public_path}")
}

/// Resolve a relative output path against the output directory.
pub fn output_file_path(output_dir: &Path, relative_output_path: &str) -> PathBuf {
    relative_output_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(output_dir.to_path_buf(), |path, segment| path.join(segment))
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const BASE: &str = "http://example.com";

    fn route(source: &str) -> PageRoute {
        derive(Path::new(source), Path::new("pages"), BASE)
    }

    #[test]
    fn test_nested_index_template() {
        let r = route("pages/about/index.tera");
        assert_eq!(r.relative_output_path, "about/index.html");
        assert_eq!(r.public_path, "/about");
        assert_eq!(r.public_url, "http://example.com/about");
    }

    #[test]
    fn test_root_index_markdown() {
        let r = route("pages/index.md");
        assert_eq!(r.relative_output_path, "index.html");
        assert_eq!(r.public_path, "");
        assert_eq!(r.public_url, "http://example.com");
    }

    #[test]
    fn test_index_directory_index() {
        let r = route("pages/index/index.tera");
        assert_eq!(r.relative_output_path, "index.html");
        assert_eq!(r.public_path, "");
        assert_eq!(r.public_url, BASE);
    }

    #[test]
    fn test_non_index_page_gets_directory() {
        let r = route("pages/blog/first-post.md");
        assert_eq!(r.relative_output_path, "blog/first-post/index.html");
        assert_eq!(r.public_path, "/blog/first-post");
        assert_eq!(r.public_url, "http://example.com/blog/first-post");

        let r = route("pages/contact.tera");
        assert_eq!(r.relative_output_path, "contact/index.html");
        assert_eq!(r.public_path, "/contact");
    }

    #[test]
    fn test_deep_index() {
        let r = route("pages/docs/guides/index.markdown");
        assert_eq!(r.relative_output_path, "docs/guides/index.html");
        assert_eq!(r.public_path, "/docs/guides");
        assert!(!r.public_path.ends_with('/'));
    }

    #[test]
    fn test_public_url_is_base_plus_path() {
        for source in [
            "pages/index.md",
            "pages/about/index.tera",
            "pages/a/b/c.md",
            "pages/index/index.md",
        ] {
            let r = route(source);
            assert_eq!(r.public_url, format!("{}{}", BASE, r.public_path));
            assert!(!r.public_url.ends_with('/'));
        }
    }

    #[test]
    fn test_source_outside_pages_root_is_deterministic() {
        let r = derive(Path::new("elsewhere/page.md"), Path::new("pages"), BASE);
        assert_eq!(r.relative_output_path, "elsewhere/page/index.html");
        assert_eq!(r.public_path, "/elsewhere/page");
    }

    #[test]
    fn test_strip_source_extension() {
        assert_eq!(strip_source_extension(Path::new("about/index.tera")), "about/index");
        assert_eq!(strip_source_extension(Path::new("post.md")), "post");
        assert_eq!(strip_source_extension(Path::new("post.markdown")), "post");
        assert_eq!(strip_source_extension(Path::new("notes.md.tera")), "notes.md");
        assert_eq!(strip_source_extension(Path::new("plain")), "plain");
        assert_eq!(strip_source_extension(Path::new("blog/POST.MD")), "blog/POST");
        assert_eq!(strip_source_extension(Path::new("About.Tera")), "About");
    }

    #[test]
    fn test_output_file_path() {
        let output = Path::new("/site");
        assert_eq!(
            output_file_path(output, "about/index.html"),
            PathBuf::from("/site/about/index.html")
        );
        assert_eq!(
            output_file_path(output, "index.html"),
            PathBuf::from("/site/index.html")
        );
    }

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/project/pagemill.yaml")),
            PathBuf::from("/project")
        );
        assert_eq!(
            base_path_from_config(Path::new("pagemill.yaml")),
            PathBuf::from("")
        );
    }
}
