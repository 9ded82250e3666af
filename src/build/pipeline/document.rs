//! Page types for pipeline processing.

use crate::build::page::PageDescriptor;
use crate::build::plan::Registration;

/// A page being processed through the pipeline.
///
/// Wraps the page's registration with mutable state that evolves
/// through pipeline stages:
///
/// 1. Initially: `content` = raw source text
/// 2. After front_matter: `content` = JSON envelope
/// 3. After transform: `content` = Tera template document, `dependencies` populated
/// 4. After template: `output_html` = final page HTML
#[derive(Debug)]
pub struct ProcessingPage {
    /// The page's build registration
    pub registration: Registration,

    /// Content being processed.
    pub content: String,

    /// Templates the generated document depends on.
    ///
    /// Empty until the transform stage populates it.
    pub dependencies: Vec<String>,

    /// Final HTML output after template rendering.
    ///
    /// None until the template stage populates it.
    pub output_html: Option<String>,
}

impl ProcessingPage {
    /// Create a new processing page from its registration and raw source.
    pub fn new(registration: Registration, raw_content: String) -> Self {
        Self {
            registration,
            content: raw_content,
            dependencies: Vec::new(),
            output_html: None,
        }
    }

    /// Get the page descriptor.
    pub fn descriptor(&self) -> &PageDescriptor {
        &self.registration.descriptor
    }

    /// Get the page's project-relative filename (used in messages).
    pub fn filename(&self) -> &str {
        &self.registration.descriptor.filename
    }
}
