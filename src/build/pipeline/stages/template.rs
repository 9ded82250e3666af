//! Page template rendering stage.
//!
//! Renders each generated document against the loaded layouts, with the
//! page's URL, path and filename in scope. Declared template dependencies
//! are widened to their full inheritance chain.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};
use crate::build::render::{PageContext, PageInfo};

/// Stage that renders generated documents to HTML.
///
/// After this stage, `page.output_html` contains the complete HTML page.
pub struct TemplateStage;

impl Stage for TemplateStage {
    fn name(&self) -> &'static str {
        "template"
    }

    fn process(
        &self,
        pages: &mut [ProcessingPage],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for page in pages {
            let descriptor = page.descriptor();
            let page_context = PageContext {
                site: ctx.site.clone(),
                page: PageInfo {
                    url: descriptor.public_url.clone(),
                    path: descriptor.public_path.clone(),
                    filename: descriptor.filename.clone(),
                },
            };

            let html = ctx
                .renderer
                .render_page(page.filename(), &page.content, &page_context)
                .map_err(|source| PipelineError::Render {
                    filename: page.filename().to_string(),
                    source,
                })?;

            // Changes to any ancestor layout affect the page too
            let ancestors: Vec<String> = page
                .dependencies
                .iter()
                .flat_map(|name| ctx.renderer.ancestors(name))
                .collect();
            for ancestor in ancestors {
                if !page.dependencies.contains(&ancestor) {
                    page.dependencies.push(ancestor);
                }
            }

            page.output_html = Some(html);
        }

        Ok(())
    }
}
