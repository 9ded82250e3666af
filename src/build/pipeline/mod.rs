//! Build pipeline for page processing.
//!
//! The pipeline transforms pages through a series of stages:
//! 1. Front matter extraction (source -> JSON envelope)
//! 2. Content transform (envelope -> template document)
//! 3. Template rendering (document + layouts -> HTML)
//! 4. File writing (output to disk)
//!
//! Custom stages can be inserted after any named stage.
//! Every stage processes all pages before the next one starts, and the
//! first error aborts the run.

mod context;
mod document;
mod error;
mod stages;

pub use context::PipelineContext;
pub use document::ProcessingPage;
pub use error::PipelineError;
pub use stages::{AssetCopyStage, AssetUrlStage};

use stages::{FrontMatterStage, TemplateStage, TransformStage, WriteStage};

/// A stage in the page processing pipeline.
///
/// Stages transform pages sequentially. Each stage receives all pages
/// and can modify them in place before passing to the next stage.
pub trait Stage: Send + Sync {
    /// Unique name for this stage (used for insertion points).
    fn name(&self) -> &'static str;

    /// Process pages through this stage.
    ///
    /// Pages are passed by mutable reference so stages can transform
    /// their content in place. The `ctx` provides access to shared resources
    /// like the renderer and the transform registry.
    fn process(
        &self,
        pages: &mut [ProcessingPage],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError>;
}

/// A stage that runs once after all pages are processed.
///
/// Use this for build-wide operations such as writing stylesheets.
pub trait FinalizeStage: Send + Sync {
    /// Unique name for this stage.
    fn name(&self) -> &'static str;

    /// Run finalization after all pages are processed and written.
    fn finalize(&self, ctx: &PipelineContext) -> Result<(), PipelineError>;
}

/// The page processing pipeline.
///
/// The default pipeline includes: front_matter → transform → template → write,
/// followed by the highlight stylesheet.
///
/// # Extension Points
///
/// Insert custom stages using `insert_after`:
///
/// ```ignore
/// pipeline.insert_after("template", AssetUrlStage::new(assets, "/"));
/// ```
pub struct Pipeline {
    /// Page processing stages (run for each page batch)
    stages: Vec<Box<dyn Stage>>,
    /// Build-wide stages (run once after all pages)
    finalize_stages: Vec<Box<dyn FinalizeStage>>,
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            finalize_stages: Vec::new(),
        }
    }

    /// Create the default pipeline with standard stages.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_stage(FrontMatterStage);
        pipeline.add_stage(TransformStage);
        pipeline.add_stage(TemplateStage);
        pipeline.add_stage(WriteStage);
        pipeline.add_finalize_stage(HighlightCssStage);
        pipeline
    }

    /// Add a stage to the end of the pipeline.
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Insert a stage after the named stage.
    ///
    /// # Panics
    ///
    /// Panics if no stage with the given name exists.
    pub fn insert_after<S: Stage + 'static>(&mut self, name: &str, stage: S) -> &mut Self {
        let pos = self
            .stages
            .iter()
            .position(|s| s.name() == name)
            .unwrap_or_else(|| panic!("stage '{}' not found in pipeline", name));
        self.stages.insert(pos + 1, Box::new(stage));
        self
    }

    /// Add a finalize stage (runs after all pages are processed).
    pub fn add_finalize_stage<S: FinalizeStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.finalize_stages.push(Box::new(stage));
        self
    }

    /// Run the pipeline on a set of pages.
    pub fn run(
        &self,
        pages: &mut [ProcessingPage],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for stage in &self.stages {
            stage.process(pages, ctx)?;
        }

        for stage in &self.finalize_stages {
            log::debug!("running finalize stage {}", stage.name());
            stage.finalize(ctx)?;
        }

        Ok(())
    }

    /// Get the names of all stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}

/// Writes the syntax highlighting stylesheet next to the pages.
pub struct HighlightCssStage;

/// File name of the highlighting stylesheet in the output directory.
pub const HIGHLIGHT_CSS: &str = "highlight.css";

impl FinalizeStage for HighlightCssStage {
    fn name(&self) -> &'static str {
        "highlight_css"
    }

    fn finalize(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        let css = ctx.highlighter.generate_css().ok_or_else(|| {
            PipelineError::stage(
                self.name(),
                format!("unknown highlight theme '{}'", ctx.highlighter.theme_name()),
            )
        })?;
        std::fs::create_dir_all(ctx.output_dir)?;
        std::fs::write(ctx.output_dir.join(HIGHLIGHT_CSS), css)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStage;

    impl Stage for NoopStage {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn process(
            &self,
            _pages: &mut [ProcessingPage],
            _ctx: &mut PipelineContext,
        ) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_stage_order() {
        let pipeline = Pipeline::default_pipeline();
        assert_eq!(
            pipeline.stage_names(),
            vec!["front_matter", "transform", "template", "write"]
        );
    }

    #[test]
    fn test_insert_stages() {
        let mut pipeline = Pipeline::default_pipeline();
        pipeline.insert_after("transform", NoopStage);
        assert_eq!(
            pipeline.stage_names(),
            vec!["front_matter", "transform", "noop", "template", "write"]
        );

        pipeline.insert_after("write", NoopStage);
        assert_eq!(pipeline.stage_names().last(), Some(&"noop"));
    }

    #[test]
    fn test_unknown_highlight_theme_fails() {
        use std::sync::Arc;

        use crate::build::front_matter::EnvelopeDefaults;
        use crate::build::highlight::SyntaxHighlighter;
        use crate::build::render::{Renderer, SiteContext};
        use crate::build::transform::TransformRegistry;

        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        let output = dir.path().join("_site");

        let highlighter = Arc::new(SyntaxHighlighter::new("no-such-theme", "lang-"));
        let mut renderer = Renderer::new(&templates, Arc::clone(&highlighter)).unwrap();
        let transforms = TransformRegistry::with_defaults();
        let site = SiteContext {
            name: None,
            url: String::new(),
            cdn_url: "/".to_string(),
        };
        let defaults = EnvelopeDefaults {
            layout: "layout.html".to_string(),
            block: "main".to_string(),
        };
        let mut ctx = PipelineContext::new(
            &output,
            &site,
            &defaults,
            &highlighter,
            &mut renderer,
            &transforms,
        );

        let err = Pipeline::default_pipeline().run(&mut [], &mut ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Stage { ref stage, .. } if stage == "highlight_css"));
        assert!(!output.join(HIGHLIGHT_CSS).exists());
    }

    #[test]
    #[should_panic(expected = "stage 'missing' not found")]
    fn test_insert_unknown_stage_panics() {
        Pipeline::default_pipeline().insert_after("missing", NoopStage);
    }
}
