//! Dependency tracking for incremental rebuilds.
//!
//! Records which templates each built page depends on, so a change to a
//! single file only re-renders the pages it can affect. Copied assets are
//! tracked too, since adding or removing one changes how pages link to it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::page::ContentKind;

// =============================================================================
// Change detection types
// =============================================================================

/// What kind of change was detected in the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A page source was added, modified, or deleted.
    Page { path: PathBuf, deleted: bool },
    /// A template changed. `name` is the path relative to the templates
    /// directory, as templates refer to each other.
    Template { name: String },
    /// A non-page file under the pages root was added, modified, or deleted.
    Asset { path: PathBuf, deleted: bool },
    /// The config file changed.
    Config,
}

/// What scope of rebuild is needed based on the changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Rebuild only these page sources.
    Pages(Vec<PathBuf>),
    /// Rebuild every page.
    Full,
}

// =============================================================================
// Dependency index
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedPage {
    content_kind: ContentKind,
    templates: Vec<String>,
}

/// Which templates every built page depends on, keyed by source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    pages: BTreeMap<PathBuf, IndexedPage>,
    assets: BTreeSet<PathBuf>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the dependencies of a built page.
    pub fn record(&mut self, source: PathBuf, content_kind: ContentKind, templates: Vec<String>) {
        self.pages.insert(
            source,
            IndexedPage {
                content_kind,
                templates,
            },
        );
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.pages.contains_key(source)
    }

    /// Record an asset copied by a build.
    pub fn record_asset(&mut self, source: PathBuf) {
        self.assets.insert(source);
    }

    pub fn contains_asset(&self, source: &Path) -> bool {
        self.assets.contains(source)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Templates a page depends on.
    #[cfg(test)]
    pub fn templates_of(&self, source: &Path) -> Option<&[String]> {
        self.pages.get(source).map(|p| p.templates.as_slice())
    }

    /// Pages that declared a dependency on the named template.
    pub fn dependents(&self, template: &str) -> Vec<PathBuf> {
        self.pages
            .iter()
            .filter(|(_, page)| page.templates.iter().any(|t| t == template))
            .map(|(source, _)| source.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Merge the entries of a newer index into this one.
    pub fn merge(&mut self, newer: DependencyIndex) {
        self.pages.extend(newer.pages);
        self.assets.extend(newer.assets);
    }

    /// Determine the invalidation scope based on a list of changes.
    ///
    /// Template-kind pages declare no dependencies, so they are rebuilt for
    /// every template change. A template no page depends on (a partial, or
    /// a layout nothing uses yet) forces a full rebuild. A modified asset
    /// rebuilds no pages; it only needs copying again.
    pub fn invalidation_scope(&self, changes: &[ChangeKind]) -> InvalidationScope {
        let mut pages: BTreeSet<PathBuf> = BTreeSet::new();

        for change in changes {
            match change {
                ChangeKind::Config => return InvalidationScope::Full,
                ChangeKind::Page { path, deleted } => {
                    if *deleted || !self.contains(path) {
                        // The set of routes changed
                        return InvalidationScope::Full;
                    }
                    pages.insert(path.clone());
                }
                ChangeKind::Asset { path, deleted } => {
                    if *deleted || !self.contains_asset(path) {
                        // Asset references may resolve differently now
                        return InvalidationScope::Full;
                    }
                }
                ChangeKind::Template { name } => {
                    let dependents = self.dependents(name);
                    if dependents.is_empty() {
                        return InvalidationScope::Full;
                    }
                    pages.extend(dependents);
                    pages.extend(
                        self.pages
                            .iter()
                            .filter(|(_, page)| page.content_kind == ContentKind::Template)
                            .map(|(source, _)| source.clone()),
                    );
                }
            }
        }

        InvalidationScope::Pages(pages.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DependencyIndex {
        let mut index = DependencyIndex::new();
        index.record(
            PathBuf::from("/p/pages/about/index.tera"),
            ContentKind::Template,
            vec![],
        );
        index.record(
            PathBuf::from("/p/pages/index.md"),
            ContentKind::Markdown,
            vec!["layout.html".to_string(), "base.html".to_string()],
        );
        index.record(
            PathBuf::from("/p/pages/blog/post.md"),
            ContentKind::Markdown,
            vec!["post.html".to_string(), "base.html".to_string()],
        );
        index
    }

    fn template(name: &str) -> ChangeKind {
        ChangeKind::Template {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_modified_page() {
        let scope = index().invalidation_scope(&[ChangeKind::Page {
            path: PathBuf::from("/p/pages/index.md"),
            deleted: false,
        }]);
        assert_eq!(
            scope,
            InvalidationScope::Pages(vec![PathBuf::from("/p/pages/index.md")])
        );
    }

    #[test]
    fn test_added_or_deleted_page_is_full() {
        let index = index();
        assert_eq!(
            index.invalidation_scope(&[ChangeKind::Page {
                path: PathBuf::from("/p/pages/new.md"),
                deleted: false,
            }]),
            InvalidationScope::Full
        );
        assert_eq!(
            index.invalidation_scope(&[ChangeKind::Page {
                path: PathBuf::from("/p/pages/index.md"),
                deleted: true,
            }]),
            InvalidationScope::Full
        );
    }

    #[test]
    fn test_template_change_rebuilds_dependents_and_template_pages() {
        let scope = index().invalidation_scope(&[template("layout.html")]);
        assert_eq!(
            scope,
            InvalidationScope::Pages(vec![
                PathBuf::from("/p/pages/about/index.tera"),
                PathBuf::from("/p/pages/index.md"),
            ])
        );
    }

    #[test]
    fn test_ancestor_template_change() {
        let scope = index().invalidation_scope(&[template("base.html")]);
        let InvalidationScope::Pages(pages) = scope else {
            panic!("expected a page rebuild");
        };
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_unreferenced_template_is_full() {
        assert_eq!(
            index().invalidation_scope(&[template("partials/nav.html")]),
            InvalidationScope::Full
        );
    }

    #[test]
    fn test_asset_changes() {
        let mut index = index();
        index.record_asset(PathBuf::from("/p/pages/images/logo.png"));

        assert_eq!(
            index.invalidation_scope(&[ChangeKind::Asset {
                path: PathBuf::from("/p/pages/images/logo.png"),
                deleted: false,
            }]),
            InvalidationScope::Pages(vec![])
        );
        assert_eq!(
            index.invalidation_scope(&[ChangeKind::Asset {
                path: PathBuf::from("/p/pages/images/logo.png"),
                deleted: true,
            }]),
            InvalidationScope::Full
        );
        assert_eq!(
            index.invalidation_scope(&[ChangeKind::Asset {
                path: PathBuf::from("/p/pages/images/new.png"),
                deleted: false,
            }]),
            InvalidationScope::Full
        );
        assert_eq!(index.asset_count(), 1);
    }

    #[test]
    fn test_config_change_is_full() {
        assert_eq!(
            index().invalidation_scope(&[ChangeKind::Config]),
            InvalidationScope::Full
        );
    }

    #[test]
    fn test_no_changes() {
        assert_eq!(
            index().invalidation_scope(&[]),
            InvalidationScope::Pages(vec![])
        );
    }

    #[test]
    fn test_dependents_and_merge() {
        let mut index = index();
        assert_eq!(
            index.dependents("post.html"),
            vec![PathBuf::from("/p/pages/blog/post.md")]
        );

        let mut newer = DependencyIndex::new();
        newer.record(
            PathBuf::from("/p/pages/blog/post.md"),
            ContentKind::Markdown,
            vec!["layout.html".to_string()],
        );
        index.merge(newer);

        assert!(index.dependents("post.html").is_empty());
        assert_eq!(
            index.templates_of(Path::new("/p/pages/blog/post.md")),
            Some(&["layout.html".to_string()][..])
        );
        assert_eq!(index.len(), 3);
    }
}
