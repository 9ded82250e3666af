//! Asset stages.
//!
//! `AssetUrlStage` points rendered pages at the public copies of the assets
//! they reference; `AssetCopyStage` copies those assets into the output.

use std::sync::Arc;

use log::debug;

use crate::build::assets::{AssetSet, rewrite_asset_urls};
use crate::build::pipeline::{FinalizeStage, PipelineContext, PipelineError, ProcessingPage, Stage};

/// Stage that rewrites asset references in `page.output_html`.
pub struct AssetUrlStage {
    assets: Arc<AssetSet>,
    public_path: String,
}

impl AssetUrlStage {
    pub fn new(assets: Arc<AssetSet>, public_path: impl Into<String>) -> Self {
        Self {
            assets,
            public_path: public_path.into(),
        }
    }
}

impl Stage for AssetUrlStage {
    fn name(&self) -> &'static str {
        "asset_urls"
    }

    fn process(
        &self,
        pages: &mut [ProcessingPage],
        _ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for page in pages {
            let page_dir = self.assets.page_dir(&page.descriptor().source_path);
            let html = page.output_html.as_deref().ok_or_else(|| {
                PipelineError::stage(
                    self.name(),
                    format!("page '{}' has no output HTML", page.filename()),
                )
            })?;

            let rewritten = rewrite_asset_urls(html, &self.assets, &page_dir, &self.public_path);
            page.output_html = Some(rewritten);
        }

        Ok(())
    }
}

/// Copies assets to the same relative path in the output directory.
pub struct AssetCopyStage {
    assets: Arc<AssetSet>,
    /// Relative paths of the assets to copy
    selection: Vec<String>,
}

impl AssetCopyStage {
    pub fn new(assets: Arc<AssetSet>, selection: Vec<String>) -> Self {
        Self { assets, selection }
    }
}

impl FinalizeStage for AssetCopyStage {
    fn name(&self) -> &'static str {
        "copy_assets"
    }

    fn finalize(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        for relative in &self.selection {
            let output_path = self.assets.copy(relative, ctx.output_dir)?;
            debug!("{} -> {}", relative, output_path.display());
        }
        Ok(())
    }
}
