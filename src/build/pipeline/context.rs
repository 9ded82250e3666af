//! Pipeline context for sharing state across stages.

use std::path::Path;

use crate::build::front_matter::EnvelopeDefaults;
use crate::build::highlight::SyntaxHighlighter;
use crate::build::render::{Renderer, SiteContext};
use crate::build::transform::{TransformContext, TransformRegistry};

/// Shared context for pipeline stages.
///
/// Contains all resources and configuration needed by stages during processing.
pub struct PipelineContext<'a> {
    // === Output configuration ===
    /// Directory where output files are written
    pub output_dir: &'a Path,

    // === Site-level data ===
    /// Site metadata (name, URL, CDN prefix)
    pub site: &'a SiteContext,

    /// Values filled in when a page's front matter omits them
    pub defaults: &'a EnvelopeDefaults,

    // === Services ===
    /// Syntax highlighter for code blocks
    pub highlighter: &'a SyntaxHighlighter,

    /// Template renderer (needs mutable access for temporary templates)
    pub renderer: &'a mut Renderer,

    /// Content transforms by id
    pub transforms: &'a TransformRegistry,
}

impl<'a> PipelineContext<'a> {
    /// Create a new pipeline context.
    pub fn new(
        output_dir: &'a Path,
        site: &'a SiteContext,
        defaults: &'a EnvelopeDefaults,
        highlighter: &'a SyntaxHighlighter,
        renderer: &'a mut Renderer,
        transforms: &'a TransformRegistry,
    ) -> Self {
        Self {
            output_dir,
            site,
            defaults,
            highlighter,
            renderer,
            transforms,
        }
    }

    /// Context handed to content transforms.
    pub fn transform_context(&self) -> TransformContext<'_> {
        TransformContext {
            highlighter: self.highlighter,
            defaults: self.defaults,
        }
    }
}
