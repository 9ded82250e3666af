use std::path::{Path, PathBuf};

use super::paths::{PageRoute, derive};
use super::transform::{TransformChain, TransformId};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum DiscoverError {
    #[error("pages root does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("pages root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory entry in {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        source: std::io::Error,
    },
}

// =============================================================================
// Content kinds
// =============================================================================

/// How a page source is turned into a template document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A template body (Markdown re-interpreted by the template engine)
    Template,
    /// A Markdown body rendered to HTML before templating
    Markdown,
}

impl ContentKind {
    /// File extensions of this kind (lowercase, without dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ContentKind::Template => &["tera"],
            ContentKind::Markdown => &["md", "markdown"],
        }
    }

    /// Determine the kind of a page source from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        [ContentKind::Template, ContentKind::Markdown]
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }

    /// The transforms a page of this kind runs through.
    pub fn transforms(&self) -> TransformChain {
        let primary = match self {
            ContentKind::Template => TransformId::Template,
            ContentKind::Markdown => TransformId::Markdown,
        };
        TransformChain {
            primary,
            auxiliary: Some(TransformId::FrontMatter),
        }
    }
}

// =============================================================================
// Page descriptors
// =============================================================================

/// Routing and output metadata computed once per page source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Absolute path of the source file
    pub source_path: PathBuf,
    /// Source path relative to the project root (exposed as `page.filename`)
    pub filename: String,
    /// Output path relative to the output root, ending in `index.html`
    pub relative_output_path: String,
    /// URL path, no trailing slash; empty for the root page
    pub public_path: String,
    /// Canonical URL
    pub public_url: String,
    pub content_kind: ContentKind,
}

impl PageDescriptor {
    /// Compute the descriptor of a discovered page source.
    ///
    /// Returns `None` if the file is not a page source.
    pub fn new(
        source_path: &Path,
        pages_root: &Path,
        project_root: &Path,
        site_url: &str,
    ) -> Option<Self> {
        let content_kind = ContentKind::from_path(source_path)?;
        let PageRoute {
            relative_output_path,
            public_path,
            public_url,
        } = derive(source_path, pages_root, site_url);

        let filename = source_path
            .strip_prefix(project_root)
            .unwrap_or(source_path)
            .to_string_lossy()
            .replace('\\', "/");

        Some(Self {
            source_path: source_path.to_path_buf(),
            filename,
            relative_output_path,
            public_path,
            public_url,
            content_kind,
        })
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Discover all page sources under the pages root.
///
/// Template sources come first, then Markdown sources; each group is in
/// lexicographic path order.
pub fn discover_pages(pages_root: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut templates: Vec<PathBuf> = Vec::new();
    let mut markdown: Vec<PathBuf> = Vec::new();
    for path in files_under(pages_root)? {
        match ContentKind::from_path(&path) {
            Some(ContentKind::Template) => templates.push(path),
            Some(ContentKind::Markdown) => markdown.push(path),
            None => {}
        }
    }
    templates.sort();
    markdown.sort();

    templates.extend(markdown);
    Ok(templates)
}

/// Discover the non-page files under the pages root, in path order.
pub fn discover_assets(pages_root: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut assets: Vec<PathBuf> = files_under(pages_root)?
        .into_iter()
        .filter(|path| ContentKind::from_path(path).is_none())
        .collect();
    assets.sort();
    Ok(assets)
}

fn files_under(pages_root: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    if !pages_root.exists() {
        return Err(DiscoverError::PathNotFound(pages_root.to_path_buf()));
    }
    if !pages_root.is_dir() {
        return Err(DiscoverError::NotADirectory(pages_root.to_path_buf()));
    }

    let mut found = Vec::new();
    walk_directory(pages_root, &mut found)?;
    Ok(found)
}

/// Recursively collect files, skipping hidden entries.
fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DiscoverError> {
    let entries = std::fs::read_dir(dir).map_err(|e| DiscoverError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| DiscoverError::ReadEntry {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }

        if path.is_dir() {
            walk_directory(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}
