//! File writing stage.
//!
//! Writes the final HTML output to the filesystem.

use log::debug;

use crate::build::paths::output_file_path;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};

/// Stage that writes rendered pages to the output directory.
///
/// This stage takes the final HTML from `page.output_html` and writes
/// it to the page's relative output path, creating any necessary parent
/// directories.
pub struct WriteStage;

impl Stage for WriteStage {
    fn name(&self) -> &'static str {
        "write"
    }

    fn process(
        &self,
        pages: &mut [ProcessingPage],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for page in pages {
            // Get the final HTML output
            let html = page.output_html.as_ref().ok_or_else(|| {
                PipelineError::stage(
                    "write",
                    format!(
                        "page '{}' has no output HTML (was template stage run?)",
                        page.filename()
                    ),
                )
            })?;

            let output_path =
                output_file_path(ctx.output_dir, &page.descriptor().relative_output_path);

            // Create parent directories if needed
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            std::fs::write(&output_path, html)?;
            debug!("{} -> {}", page.filename(), output_path.display());
        }

        Ok(())
    }
}
