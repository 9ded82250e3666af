//! Content transform stage.
//!
//! Turns each page's envelope into a Tera template document using the
//! transform matching its content kind.

use log::debug;

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};

/// Stage that runs each page's primary transform.
///
/// After this stage, `page.content` is a template document extending the
/// page's layout, and `page.dependencies` lists the templates it declared.
pub struct TransformStage;

impl Stage for TransformStage {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn process(
        &self,
        pages: &mut [ProcessingPage],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        let transform_ctx = ctx.transform_context();

        for page in pages {
            let id = page.registration.transforms.primary;
            let transform = ctx.transforms.get(id).ok_or_else(|| {
                PipelineError::stage("transform", format!("no transform registered for '{id}'"))
            })?;

            let output = transform
                .transform(&page.content, &transform_ctx)
                .map_err(|source| PipelineError::Transform {
                    filename: page.filename().to_string(),
                    source,
                })?;

            debug!(
                "{}: {} transform, dependencies {:?}",
                page.filename(),
                id,
                output.dependencies
            );

            page.content = output.document;
            page.dependencies.extend(output.dependencies);
        }

        Ok(())
    }
}
