//! Content transforms.
//!
//! A page goes through a chain of text-to-text transforms before it reaches
//! the template engine:
//!
//! 1. **front-matter**: raw source -> JSON envelope
//! 2. **template** or **markdown**: JSON envelope -> Tera template document
//!
//! The generated document extends the page's parent template, injects the
//! page locals through a `locals` block, and fills the content block.

use super::envelope::{Envelope, EnvelopeError, LocalValue};
use super::front_matter::{EnvelopeDefaults, FrontMatterError, to_envelope};
use super::highlight::SyntaxHighlighter;
use super::markdown::render_markdown;

/// Name of the block holding the locals-injection directive.
pub const LOCALS_BLOCK: &str = "locals";

/// Name of the Tera filter that renders Markdown at template render time.
pub const MARKDOWN_FILTER: &str = "markdown";

/// Indentation of template content under its block.
const CONTENT_INDENT: &str = "    ";

/// Identifies a transform in a page's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformId {
    FrontMatter,
    Template,
    Markdown,
}

impl TransformId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformId::FrontMatter => "front-matter",
            TransformId::Template => "template",
            TransformId::Markdown => "markdown",
        }
    }
}

impl std::fmt::Display for TransformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transforms a page runs through: the auxiliary one first, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformChain {
    pub primary: TransformId,
    pub auxiliary: Option<TransformId>,
}

impl TransformChain {
    /// Transforms in execution order.
    pub fn in_order(&self) -> impl Iterator<Item = TransformId> {
        self.auxiliary.into_iter().chain(std::iter::once(self.primary))
    }
}

/// Output of a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// The produced text
    pub document: String,
    /// Templates the produced document depends on (for incremental rebuilds)
    pub dependencies: Vec<String>,
}

impl TransformOutput {
    fn without_dependencies(document: String) -> Self {
        Self {
            document,
            dependencies: Vec::new(),
        }
    }
}

/// Context available during a transform.
pub struct TransformContext<'a> {
    /// Syntax highlighter for code blocks.
    pub highlighter: &'a SyntaxHighlighter,
    /// Values filled in when front matter omits them.
    pub defaults: &'a EnvelopeDefaults,
}

#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("parent template name must not be empty")]
    EmptyExtends,
}

/// A text transform applied to page content.
pub trait ContentTransform: Send + Sync {
    fn id(&self) -> TransformId;

    fn transform(&self, input: &str, ctx: &TransformContext)
    -> Result<TransformOutput, TransformError>;
}

/// Encodes YAML front matter and body as a JSON envelope.
pub struct FrontMatterTransform;

impl ContentTransform for FrontMatterTransform {
    fn id(&self) -> TransformId {
        TransformId::FrontMatter
    }

    fn transform(
        &self,
        input: &str,
        ctx: &TransformContext,
    ) -> Result<TransformOutput, TransformError> {
        let envelope = to_envelope(input, ctx.defaults)?;
        Ok(TransformOutput::without_dependencies(envelope))
    }
}

/// Turns an envelope into a template whose body is Markdown rendered by the
/// template engine.
pub struct TemplateTransform;

impl ContentTransform for TemplateTransform {
    fn id(&self) -> TransformId {
        TransformId::Template
    }

    fn transform(
        &self,
        input: &str,
        _ctx: &TransformContext,
    ) -> Result<TransformOutput, TransformError> {
        let envelope = Envelope::parse(input)?;

        let body = indent(envelope.content.trim(), CONTENT_INDENT);
        let content = format!(
            "{{% filter {MARKDOWN_FILTER} %}}{{% raw %}}\n{}\n{{% endraw %}}{{% endfilter %}}",
            splice_raw(&body)
        );

        let document = template_document(&envelope, &content)?;
        Ok(TransformOutput::without_dependencies(document))
    }
}

/// Renders the envelope's Markdown body to HTML and embeds it verbatim.
pub struct MarkdownTransform;

impl ContentTransform for MarkdownTransform {
    fn id(&self) -> TransformId {
        TransformId::Markdown
    }

    fn transform(
        &self,
        input: &str,
        ctx: &TransformContext,
    ) -> Result<TransformOutput, TransformError> {
        let envelope = Envelope::parse(input)?;

        let html = render_markdown(&envelope.content, ctx.highlighter);
        let content = format!(
            "{{% raw %}}{}{{% endraw %}}",
            neutralize_raw(html.trim_end())
        );

        let document = template_document(&envelope, &content)?;
        Ok(TransformOutput {
            document,
            dependencies: vec![envelope.extends],
        })
    }
}

/// Build the template document shared by both content transforms.
fn template_document(envelope: &Envelope, content: &str) -> Result<String, TransformError> {
    if envelope.extends.trim().is_empty() {
        return Err(TransformError::EmptyExtends);
    }

    let extends = LocalValue::String(envelope.extends.clone()).to_template_literal();
    let block = envelope.block_name();

    let mut lines = vec![
        format!("{{% extends {extends} %}}"),
        format!("{{% block {LOCALS_BLOCK} %}}"),
    ];
    lines.extend(envelope.locals.iter().map(|(key, value)| {
        format!("{{%- set_global {key} = {} %}}", value.to_template_literal())
    }));
    lines.push(format!("{{% endblock {LOCALS_BLOCK} %}}"));
    lines.push(format!("{{% block {block} %}}"));
    lines.push(content.to_string());
    lines.push(format!("{{% endblock {block} %}}"));

    Ok(lines.join("\n"))
}

/// Indent every non-empty line.
fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep rendered HTML from closing the surrounding raw section early.
///
/// `&#123;` is the `{` character reference, so browsers show the same text.
fn neutralize_raw(text: &str) -> String {
    text.replace("{%", "&#123;%")
}

/// Keep Markdown source from closing the surrounding raw section early.
///
/// Each `{%` is emitted by an expression between two raw sections, so the
/// `markdown` filter still receives the original text.
fn splice_raw(text: &str) -> String {
    text.replace("{%", "{% endraw %}{{ \"{%\" }}{% raw %}")
}

/// Registry of content transforms, keyed by id.
pub struct TransformRegistry {
    transforms: Vec<Box<dyn ContentTransform>>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Create a registry with the built-in transforms.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FrontMatterTransform);
        registry.register(TemplateTransform);
        registry.register(MarkdownTransform);
        registry
    }

    /// Register a transform. Later registrations take precedence.
    pub fn register<T: ContentTransform + 'static>(&mut self, transform: T) {
        self.transforms.push(Box::new(transform));
    }

    /// Find the transform with the given id.
    pub fn get(&self, id: TransformId) -> Option<&dyn ContentTransform> {
        self.transforms
            .iter()
            .rev()
            .find(|t| t.id() == id)
            .map(|t| t.as_ref())
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
