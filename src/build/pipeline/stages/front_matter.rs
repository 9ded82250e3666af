//! Auxiliary transform stage.
//!
//! Turns the raw page source into the JSON envelope the content transforms
//! consume.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};

/// Stage that runs each page's auxiliary transform, if it has one.
pub struct FrontMatterStage;

impl Stage for FrontMatterStage {
    fn name(&self) -> &'static str {
        "front_matter"
    }

    fn process(
        &self,
        pages: &mut [ProcessingPage],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        let transform_ctx = ctx.transform_context();

        for page in pages {
            let Some(id) = page.registration.transforms.auxiliary else {
                continue;
            };

            let transform = ctx.transforms.get(id).ok_or_else(|| {
                PipelineError::stage("front_matter", format!("no transform registered for '{id}'"))
            })?;

            let output = transform
                .transform(&page.content, &transform_ctx)
                .map_err(|source| PipelineError::Transform {
                    filename: page.filename().to_string(),
                    source,
                })?;

            page.content = output.document;
            page.dependencies.extend(output.dependencies);
        }

        Ok(())
    }
}
