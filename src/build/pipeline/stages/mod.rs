//! Default pipeline stages.
//!
//! The standard page processing pipeline consists of:
//!
//! 1. **FrontMatterStage** - Run the auxiliary transform (front matter -> envelope)
//! 2. **TransformStage** - Run the primary transform (envelope -> template document)
//! 3. **TemplateStage** - Render the document against the layouts
//! 4. **WriteStage** - Write final HTML to output directory
//!
//! The builder adds **AssetUrlStage** after template rendering and
//! **AssetCopyStage** as a finalize stage.

mod assets;
mod front_matter;
mod template;
mod transform;
mod write;

pub use assets::{AssetCopyStage, AssetUrlStage};
pub use front_matter::FrontMatterStage;
pub use template::TemplateStage;
pub use transform::TransformStage;
pub use write::WriteStage;
