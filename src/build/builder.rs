use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::config::SiteConfig;

use super::assets::AssetSet;
use super::cache::{ChangeKind, DependencyIndex, InvalidationScope};
use super::front_matter::EnvelopeDefaults;
use super::highlight::SyntaxHighlighter;
use super::page::{DiscoverError, PageDescriptor, discover_assets, discover_pages};
use super::paths::output_file_path;
use super::pipeline::{
    AssetCopyStage, AssetUrlStage, Pipeline, PipelineContext, PipelineError, ProcessingPage,
};
use super::plan::{BuildPlan, PlanError, Registration};
use super::render::{RenderError, Renderer, SiteContext};
use super::transform::TransformRegistry;

/// Highlighting theme used for the generated stylesheet.
const HIGHLIGHT_THEME: &str = "github_dark";

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("page discovery failed: {0}")]
    Discover(#[from] DiscoverError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("build failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("failed to read {path}: {source}")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A page written by a build.
#[derive(Debug, Clone)]
pub struct BuiltPage {
    pub descriptor: PageDescriptor,
    /// Absolute path of the written file
    pub output_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Pages written by this build
    pub pages: Vec<BuiltPage>,
    /// Asset copies written by this build
    pub assets: Vec<PathBuf>,
    /// Template dependencies of every page in the site, and the known assets
    pub dependencies: DependencyIndex,
}

/// Everything one pipeline run produced.
struct RunOutput {
    pages: Vec<BuiltPage>,
    assets: Vec<PathBuf>,
    dependencies: DependencyIndex,
}

pub struct Builder {
    config: SiteConfig,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
}

impl Builder {
    pub fn new(config: SiteConfig, base_path: PathBuf) -> Self {
        Self { config, base_path }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Discover the page sources and compute the validated build plan.
    pub fn plan(&self) -> Result<BuildPlan, BuildError> {
        let pages_dir = self.pages_dir();
        let sources = discover_pages(&pages_dir)?;
        debug!("discovered {} page source(s) in {}", sources.len(), pages_dir.display());

        let descriptors = sources.iter().filter_map(|source| {
            PageDescriptor::new(source, &pages_dir, &self.base_path, &self.config.site.url)
        });

        Ok(BuildPlan::from_pages(
            descriptors,
            self.config.site.cdn_url.clone(),
        )?)
    }

    /// Discover the assets stored next to the page sources.
    pub fn assets(&self) -> Result<AssetSet, BuildError> {
        let pages_dir = self.pages_dir();
        let sources = discover_assets(&pages_dir)?;
        Ok(AssetSet::new(&pages_dir, &sources))
    }

    /// Build every page of the site and copy its assets.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let plan = self.plan()?;
        let assets = Arc::new(self.assets()?);
        plan.validate_assets(&assets)?;
        info!("building {} page(s), {} asset(s)", plan.len(), assets.len());

        let selection = assets.relative_paths().map(str::to_string).collect();
        let output = self.run(plan.registrations(), &plan, &assets, selection)?;

        let output_dir = self.output_dir();
        info!("wrote {} page(s) to {}", output.pages.len(), output_dir.display());

        Ok(BuildResult {
            output_dir,
            templates_dir: self.templates_dir(),
            pages: output.pages,
            assets: output.assets,
            dependencies: output.dependencies,
        })
    }

    /// Rebuild only the pages affected by `changes`, and copy modified assets.
    ///
    /// Falls back to a full build when the changes alter the set of pages,
    /// the set of assets, or the configuration.
    pub fn rebuild(
        &self,
        previous: &BuildResult,
        changes: &[ChangeKind],
    ) -> Result<BuildResult, BuildError> {
        if previous.dependencies.is_empty() {
            return self.build();
        }

        let sources = match previous.dependencies.invalidation_scope(changes) {
            InvalidationScope::Full => return self.build(),
            InvalidationScope::Pages(sources) => sources,
        };

        let plan = self.plan()?;
        let assets = Arc::new(self.assets()?);

        // Files may have appeared or vanished without a matching event
        let unchanged_routes = plan.len() == previous.dependencies.len()
            && plan
                .entries()
                .iter()
                .all(|source| previous.dependencies.contains(source));
        let unchanged_assets = assets.len() == previous.dependencies.asset_count()
            && assets
                .relative_paths()
                .all(|relative| previous.dependencies.contains_asset(&assets.source_path(relative)));
        if !unchanged_routes || !unchanged_assets {
            return self.build();
        }

        let registrations: Vec<Registration> = sources
            .iter()
            .filter_map(|source| plan.find(source).cloned())
            .collect();
        let selection: Vec<String> = changes
            .iter()
            .filter_map(|change| match change {
                ChangeKind::Asset {
                    path,
                    deleted: false,
                } => assets.relative_path(path),
                _ => None,
            })
            .collect();
        info!(
            "rebuilding {} page(s), copying {} asset(s)",
            registrations.len(),
            selection.len()
        );

        let output = self.run(&registrations, &plan, &assets, selection)?;
        let mut dependencies = previous.dependencies.clone();
        dependencies.merge(output.dependencies);

        Ok(BuildResult {
            output_dir: self.output_dir(),
            templates_dir: self.templates_dir(),
            pages: output.pages,
            assets: output.assets,
            dependencies,
        })
    }

    /// Run the page pipeline over a set of registrations.
    ///
    /// `selection` names the assets to copy, relative to the pages root.
    fn run(
        &self,
        registrations: &[Registration],
        plan: &BuildPlan,
        assets: &Arc<AssetSet>,
        selection: Vec<String>,
    ) -> Result<RunOutput, BuildError> {
        let output_dir = self.output_dir();
        let highlighter = Arc::new(SyntaxHighlighter::new(
            HIGHLIGHT_THEME,
            &self.config.markdown.class_prefix,
        ));
        let mut renderer = Renderer::new(&self.templates_dir(), Arc::clone(&highlighter))?;
        let transforms = TransformRegistry::with_defaults();

        let site = SiteContext {
            name: self.config.site.name.clone(),
            url: self.config.site.url.clone(),
            cdn_url: self.config.site.cdn_url.clone(),
        };
        let defaults = EnvelopeDefaults {
            layout: self.config.layout.clone(),
            block: self.config.markdown.block.clone(),
        };

        let mut pages = registrations
            .iter()
            .map(|registration| {
                let path = &registration.descriptor.source_path;
                let raw = std::fs::read_to_string(path).map_err(|source| {
                    BuildError::ReadSource {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(ProcessingPage::new(registration.clone(), raw))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let copied: Vec<PathBuf> = selection
            .iter()
            .map(|relative| output_file_path(&output_dir, relative))
            .collect();

        let mut pipeline = Pipeline::default_pipeline();
        pipeline.insert_after(
            "template",
            AssetUrlStage::new(Arc::clone(assets), plan.public_path()),
        );
        pipeline.add_finalize_stage(AssetCopyStage::new(Arc::clone(assets), selection));
        debug!("pipeline stages: {}", pipeline.stage_names().join(" -> "));

        let mut ctx = PipelineContext::new(
            &output_dir,
            &site,
            &defaults,
            &highlighter,
            &mut renderer,
            &transforms,
        );
        pipeline.run(&mut pages, &mut ctx)?;

        let mut dependencies = DependencyIndex::new();
        for relative in assets.relative_paths() {
            dependencies.record_asset(assets.source_path(relative));
        }
        let built = pages
            .into_iter()
            .map(|page| {
                let descriptor = page.registration.descriptor;
                dependencies.record(
                    descriptor.source_path.clone(),
                    descriptor.content_kind,
                    page.dependencies,
                );
                BuiltPage {
                    output_path: output_file_path(&output_dir, &descriptor.relative_output_path),
                    descriptor,
                }
            })
            .collect();

        Ok(RunOutput {
            pages: built,
            assets: copied,
            dependencies,
        })
    }

    /// Get the pages root, resolved against base_path.
    pub fn pages_dir(&self) -> PathBuf {
        self.resolve(&self.config.pages)
    }

    /// Get the templates directory, resolved against base_path.
    pub fn templates_dir(&self) -> PathBuf {
        self.resolve(&self.config.templates)
    }

    /// Get the output directory path, resolved against base_path.
    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.config.site.output)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_path.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::pipeline::HIGHLIGHT_CSS;

    const LAYOUT: &str = "<html><head>{% block locals %}{% endblock locals %}<title>{% if title %}{{ title }}{% endif %}</title><link rel=\"canonical\" href=\"{{ url | safe }}\"></head><body>{% block main %}{% endblock main %}</body></html>";

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn project() -> (tempfile::TempDir, Builder) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "templates/layout.html", LAYOUT);

        let mut config = SiteConfig::default();
        config.site.url = "http://example.com".to_string();
        let builder = Builder::new(config, dir.path().to_path_buf());
        (dir, builder)
    }

    fn read(dir: &Path, relative: &str) -> String {
        std::fs::read_to_string(dir.join("_site").join(relative)).unwrap()
    }

    #[test]
    fn test_build_routes_pages() {
        let (dir, builder) = project();
        write(
            dir.path(),
            "src/modules/pages/about/index.tera",
            "---\nlocals:\n  title: About\n---\n# About us\n",
        );
        write(
            dir.path(),
            "src/modules/pages/index.md",
            "---\nlocals:\n  title: Home\n---\nWelcome\n",
        );

        let result = builder.build().unwrap();
        assert_eq!(result.pages.len(), 2);

        let about = read(dir.path(), "about/index.html");
        assert!(about.contains("<title>About</title>"));
        assert!(about.contains("href=\"http://example.com/about\""));
        assert!(about.contains("<h1 id=\"about-us\">About us</h1>"));

        let index = read(dir.path(), "index.html");
        assert!(index.contains("<title>Home</title>"));
        assert!(index.contains("href=\"http://example.com\""));
        assert!(index.contains("<p>Welcome</p>"));

        assert!(dir.path().join("_site").join(HIGHLIGHT_CSS).exists());
    }

    #[test]
    fn test_build_records_dependencies() {
        let (dir, builder) = project();
        write(
            dir.path(),
            "templates/post.html",
            "{% extends \"layout.html\" %}{% block main %}<article>{{ super() }}</article>{% endblock main %}",
        );
        write(dir.path(), "src/modules/pages/about.tera", "About");
        write(
            dir.path(),
            "src/modules/pages/blog/post.md",
            "---\nextends: post.html\n---\nPost body\n",
        );

        let result = builder.build().unwrap();
        let post = dir.path().join("src/modules/pages/blog/post.md");
        assert_eq!(
            result.dependencies.templates_of(&post),
            Some(&["post.html".to_string(), "layout.html".to_string()][..])
        );
        let about = dir.path().join("src/modules/pages/about.tera");
        assert_eq!(result.dependencies.templates_of(&about), Some(&[][..]));
    }

    #[test]
    fn test_collision_is_error() {
        let (dir, builder) = project();
        write(dir.path(), "src/modules/pages/about.md", "a");
        write(dir.path(), "src/modules/pages/about/index.tera", "b");

        let result = builder.build();
        assert!(matches!(result, Err(BuildError::Plan(_))));
        assert!(!dir.path().join("_site").exists());
    }

    #[test]
    fn test_missing_parent_template_fails() {
        let (dir, builder) = project();
        write(
            dir.path(),
            "src/modules/pages/index.md",
            "---\nextends: nope.html\n---\nx",
        );

        let err = builder.build().unwrap_err();
        assert!(matches!(err, BuildError::Pipeline(PipelineError::Render { .. })));
        assert!(err.to_string().contains("src/modules/pages/index.md"));
    }

    #[test]
    fn test_rebuild_only_changed_page() {
        let (dir, builder) = project();
        write(dir.path(), "src/modules/pages/a.md", "first a");
        write(dir.path(), "src/modules/pages/b.md", "first b");
        let result = builder.build().unwrap();

        write(dir.path(), "src/modules/pages/a.md", "second a");
        write(dir.path(), "src/modules/pages/b.md", "second b");
        let a = dir.path().join("src/modules/pages/a.md");
        let rebuilt = builder
            .rebuild(
                &result,
                &[ChangeKind::Page {
                    path: a.clone(),
                    deleted: false,
                }],
            )
            .unwrap();

        assert_eq!(rebuilt.pages.len(), 1);
        assert_eq!(rebuilt.pages[0].descriptor.source_path, a);
        assert_eq!(rebuilt.dependencies.len(), 2);
        assert!(read(dir.path(), "a/index.html").contains("second a"));
        assert!(read(dir.path(), "b/index.html").contains("first b"));
    }

    #[test]
    fn test_rebuild_added_page_is_full() {
        let (dir, builder) = project();
        write(dir.path(), "src/modules/pages/a.md", "a");
        let result = builder.build().unwrap();

        write(dir.path(), "src/modules/pages/b.md", "b");
        let rebuilt = builder
            .rebuild(
                &result,
                &[ChangeKind::Page {
                    path: dir.path().join("src/modules/pages/b.md"),
                    deleted: false,
                }],
            )
            .unwrap();

        assert_eq!(rebuilt.pages.len(), 2);
        assert!(read(dir.path(), "b/index.html").contains("<p>b</p>"));
    }

    #[test]
    fn test_template_page_keeps_tag_openers() {
        let (dir, builder) = project();
        write(
            dir.path(),
            "src/modules/pages/doc.tera",
            "Use `{% if x %}` and `{% endraw %}` in templates\n",
        );

        builder.build().unwrap();
        let doc = read(dir.path(), "doc/index.html");
        assert!(doc.contains("<code>{% if x %}</code>"));
        assert!(doc.contains("<code>{% endraw %}</code>"));
        assert!(!doc.contains("&#123;"));
    }

    #[test]
    fn test_build_copies_and_links_assets() {
        let (dir, mut builder) = project();
        builder.config.site.cdn_url = "https://cdn.example.com/".to_string();
        write(dir.path(), "src/modules/pages/images/logo.png", "png");
        write(dir.path(), "src/modules/pages/.hidden/x.png", "x");
        write(
            dir.path(),
            "src/modules/pages/blog/post.md",
            "![logo](../images/logo.png) ![remote](https://example.com/a.png)\n",
        );
        write(
            dir.path(),
            "src/modules/pages/index.tera",
            "![logo](images/logo.png)\n",
        );

        let result = builder.build().unwrap();
        let copied = dir.path().join("_site/images/logo.png");
        assert_eq!(result.assets, vec![copied.clone()]);
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "png");
        assert!(!dir.path().join("_site/.hidden").exists());

        let post = read(dir.path(), "blog/post/index.html");
        assert!(post.contains("<img src=\"https://cdn.example.com/images/logo.png\" alt=\"logo\" />"));
        assert!(post.contains("<img src=\"https://example.com/a.png\""));
        let index = read(dir.path(), "index.html");
        assert!(index.contains("src=\"https://cdn.example.com/images/logo.png\""));
    }

    #[test]
    fn test_rebuild_copies_modified_asset() {
        let (dir, builder) = project();
        write(dir.path(), "src/modules/pages/logo.png", "first");
        write(dir.path(), "src/modules/pages/index.md", "home");
        let result = builder.build().unwrap();

        write(dir.path(), "src/modules/pages/logo.png", "second");
        let rebuilt = builder
            .rebuild(
                &result,
                &[ChangeKind::Asset {
                    path: dir.path().join("src/modules/pages/logo.png"),
                    deleted: false,
                }],
            )
            .unwrap();

        assert!(rebuilt.pages.is_empty());
        assert_eq!(rebuilt.assets.len(), 1);
        assert_eq!(read(dir.path(), "logo.png"), "second");
    }

    #[test]
    fn test_asset_colliding_with_page_is_error() {
        let (dir, builder) = project();
        write(dir.path(), "src/modules/pages/about.md", "about");
        write(dir.path(), "src/modules/pages/about/index.html", "<p>static</p>");

        assert!(matches!(builder.build(), Err(BuildError::Plan(_))));
    }

    #[test]
    fn test_paths_resolve_against_base() {
        let mut config = SiteConfig::default();
        config.site.output = PathBuf::from("/abs/out");
        let builder = Builder::new(config, PathBuf::from("/project"));

        assert_eq!(builder.pages_dir(), PathBuf::from("/project/src/modules/pages"));
        assert_eq!(builder.templates_dir(), PathBuf::from("/project/templates"));
        assert_eq!(builder.output_dir(), PathBuf::from("/abs/out"));
    }
}
