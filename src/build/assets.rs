//! Static assets stored next to page sources.
//!
//! Every non-page file under the pages root is copied to the same relative
//! path in the output directory. Rendered pages refer to those files through
//! the public asset prefix: relative `img` sources and `url(...)` references
//! in `style` attributes are resolved against the page's source directory
//! (or the pages root, for references starting with `/`) and rewritten to
//! `public_path + asset path`. References that do not resolve to a known
//! asset are left alone.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::paths::output_file_path;

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\sstyle\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(&quot;|&#39;|&#x27;|"|')?([^"'()\s&]+)(&quot;|&#39;|&#x27;|"|')?\s*\)"#)
        .unwrap()
});

/// The assets found under the pages root.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    pages_root: PathBuf,
    /// `/`-separated paths relative to the pages root
    assets: BTreeSet<String>,
}

impl AssetSet {
    pub fn new(pages_root: &Path, sources: &[PathBuf]) -> Self {
        let assets = sources
            .iter()
            .filter_map(|source| relative_to(pages_root, source))
            .collect();
        Self {
            pages_root: pages_root.to_path_buf(),
            assets,
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.assets.contains(relative)
    }

    /// Asset paths relative to the pages root, in order.
    pub fn relative_paths(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(String::as_str)
    }

    /// Absolute source path of an asset.
    pub fn source_path(&self, relative: &str) -> PathBuf {
        output_file_path(&self.pages_root, relative)
    }

    /// The relative path of a known asset source.
    pub fn relative_path(&self, source: &Path) -> Option<String> {
        relative_to(&self.pages_root, source).filter(|relative| self.assets.contains(relative))
    }

    /// Directory of a page source relative to the pages root (`""` at the root).
    pub fn page_dir(&self, page_source: &Path) -> String {
        page_source
            .parent()
            .and_then(|dir| relative_to(&self.pages_root, dir))
            .unwrap_or_default()
    }

    /// Copy one asset to the same relative path under `output_dir`.
    pub fn copy(&self, relative: &str, output_dir: &Path) -> std::io::Result<PathBuf> {
        let output_path = output_file_path(output_dir, relative);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(self.source_path(relative), &output_path)?;
        Ok(output_path)
    }

    /// Resolve a reference made from a page in `page_dir` to a known asset.
    ///
    /// Returns the asset path with the reference's query and fragment kept.
    pub fn resolve(&self, reference: &str, page_dir: &str) -> Option<String> {
        if reference.is_empty()
            || reference.starts_with("//")
            || reference.starts_with('#')
            || has_scheme(reference)
        {
            return None;
        }

        let end = reference.find(['?', '#']).unwrap_or(reference.len());
        let (path, suffix) = reference.split_at(end);
        let joined = match path.strip_prefix('/') {
            Some(rooted) => rooted.to_string(),
            None if page_dir.is_empty() => path.to_string(),
            None => format!("{page_dir}/{path}"),
        };

        let asset = normalize(&joined)?;
        self.assets
            .contains(&asset)
            .then(|| format!("{asset}{suffix}"))
    }
}

/// Rewrite asset references in a rendered page.
pub fn rewrite_asset_urls(
    html: &str,
    assets: &AssetSet,
    page_dir: &str,
    public_path: &str,
) -> String {
    if assets.is_empty() {
        return html.to_string();
    }

    let public_url = |reference: &str| {
        assets
            .resolve(reference, page_dir)
            .map(|asset| format!("{public_path}{asset}"))
            .unwrap_or_else(|| reference.to_string())
    };

    let html = IMG_SRC.replace_all(html, |caps: &Captures| {
        let (value, quote) = quoted_value(caps);
        format!("{}{quote}{}{quote}", &caps[1], public_url(value))
    });

    let html = STYLE_ATTR.replace_all(&html, |caps: &Captures| {
        let (value, quote) = quoted_value(caps);
        let style = CSS_URL.replace_all(value, |url: &Captures| {
            let open = url.get(1).map_or("", |m| m.as_str());
            let close = url.get(3).map_or("", |m| m.as_str());
            format!("url({open}{}{close})", public_url(&url[2]))
        });
        format!("{}{quote}{style}{quote}", &caps[1])
    });

    html.into_owned()
}

/// The attribute value of a match and the quote it was written with.
fn quoted_value<'h>(caps: &Captures<'h>) -> (&'h str, char) {
    match (caps.get(2), caps.get(3)) {
        (Some(value), _) => (value.as_str(), '"'),
        (None, Some(value)) => (value.as_str(), '\''),
        (None, None) => ("", '"'),
    }
}

/// Whether a reference starts with a URL scheme such as `https:`.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Collapse `.` and `..` segments. `None` if the path leaves the root.
fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            _ => segments.push(segment),
        }
    }
    Some(segments.join("/"))
}

fn relative_to(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|relative| relative.to_string_lossy().replace('\\', "/"))
}
