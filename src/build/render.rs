use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};

use super::highlight::SyntaxHighlighter;
use super::markdown::{dedent, render_markdown};
use super::transform::MARKDOWN_FILTER;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("templates directory not found: {0}")]
    TemplatesNotFound(String),
}

/// The template renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Create a new renderer loading `**/*.html` from the templates directory.
    pub fn new(
        templates_dir: &Path,
        highlighter: Arc<SyntaxHighlighter>,
    ) -> Result<Self, RenderError> {
        if !templates_dir.is_dir() {
            return Err(RenderError::TemplatesNotFound(
                templates_dir.display().to_string(),
            ));
        }

        let glob = templates_dir.join("**/*.html");
        let glob_str = glob.to_string_lossy();
        let mut tera = Tera::new(&glob_str)?;
        tera.register_filter(MARKDOWN_FILTER, MarkdownFilter { highlighter });

        Ok(Self { tera })
    }

    /// Render a generated page document.
    ///
    /// The document is added as a temporary template so that it can extend
    /// the loaded layouts, then removed again.
    pub fn render_page(
        &mut self,
        name: &str,
        document: &str,
        context: &PageContext,
    ) -> Result<String, RenderError> {
        let mut tera_context = Context::new();
        tera_context.insert("site", &context.site);
        tera_context.insert("url", &context.page.url);
        tera_context.insert("path", &context.page.path);
        tera_context.insert("filename", &context.page.filename);

        // The .html suffix keeps autoescaping on for layout expressions
        let template_name = format!("__page__/{name}.html");
        let result = self
            .tera
            .add_raw_template(&template_name, document)
            .and_then(|()| self.tera.render(&template_name, &tera_context));

        // Clean up the temporary template, even if it failed to load
        self.tera.templates.remove(&template_name);

        Ok(result?)
    }

    /// Templates the named template inherits from, nearest first.
    ///
    /// Unknown templates have no ancestors.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        self.tera
            .templates
            .get(name)
            .map(|template| template.parents.clone())
            .unwrap_or_default()
    }
}

/// Tera filter rendering its input as Markdown.
///
/// The input is dedented first, so indented filter sections are not
/// mistaken for code blocks.
struct MarkdownFilter {
    highlighter: Arc<SyntaxHighlighter>,
}

impl tera::Filter for MarkdownFilter {
    fn filter(
        &self,
        value: &tera::Value,
        _args: &HashMap<String, tera::Value>,
    ) -> tera::Result<tera::Value> {
        let text = tera::try_get_value!(MARKDOWN_FILTER, "value", String, value);
        Ok(tera::Value::String(render_markdown(
            &dedent(&text),
            &self.highlighter,
        )))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Context passed to page templates.
#[derive(Debug)]
pub struct PageContext {
    pub site: SiteContext,
    pub page: PageInfo,
}

/// Site-level information.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub name: Option<String>,
    pub url: String,
    pub cdn_url: String,
}

/// Information about the current page, exposed as top-level variables.
#[derive(Debug)]
pub struct PageInfo {
    /// Canonical URL
    pub url: String,
    /// Public path
    pub path: String,
    /// Source path relative to the project root
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn context() -> PageContext {
        PageContext {
            site: SiteContext {
                name: Some("Mazurka".to_string()),
                url: "http://example.com".to_string(),
                cdn_url: "/".to_string(),
            },
            page: PageInfo {
                url: "http://example.com/about".to_string(),
                path: "/about".to_string(),
                filename: "pages/about/index.tera".to_string(),
            },
        }
    }

    fn renderer(layout: &str) -> (tempfile::TempDir, Renderer) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "layout.html", layout);
        let renderer =
            Renderer::new(dir.path(), Arc::new(SyntaxHighlighter::default())).unwrap();
        (dir, renderer)
    }

    #[test]
    fn test_missing_templates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = Renderer::new(
            &dir.path().join("missing"),
            Arc::new(SyntaxHighlighter::default()),
        );
        assert!(matches!(result, Err(RenderError::TemplatesNotFound(_))));
    }

    #[test]
    fn test_locals_are_injected() {
        let (_dir, mut renderer) = renderer(
            "{% block locals %}{% endblock locals %}a={{ a }} b={{ b }} url={{ url }}|{% block main %}{% endblock main %}",
        );
        let document = [
            "{% extends \"layout.html\" %}",
            "{% block locals %}",
            "{%- set_global a = 1 %}",
            "{%- set_global b = \"x\" %}",
            "{% endblock locals %}",
            "{% block main %}body{% endblock main %}",
        ]
        .join("\n");

        let html = renderer
            .render_page("about", &document, &context())
            .unwrap();
        assert!(html.contains("a=1 b=x url=http:&#x2F;&#x2F;example.com&#x2F;about|body"));
    }

    #[test]
    fn test_markdown_filter() {
        let (_dir, mut renderer) = renderer("{% block main %}{% endblock main %}");
        let document = [
            "{% extends \"layout.html\" %}",
            "{% block main %}",
            "{% filter markdown %}{% raw %}",
            "    # Title",
            "",
            "    Some *text* with {{ braces }}",
            "{% endraw %}{% endfilter %}",
            "{% endblock main %}",
        ]
        .join("\n");

        let html = renderer.render_page("page", &document, &context()).unwrap();
        assert!(html.contains("<h1 id=\"title\">Title</h1>"));
        assert!(html.contains("<em>text</em>"));
        assert!(html.contains("{{ braces }}"));
        assert!(!html.contains("<pre"));
    }

    #[test]
    fn test_markdown_filter_sees_spliced_tag_openers() {
        let (_dir, mut renderer) = renderer("{% block main %}{% endblock main %}");
        let document = [
            "{% extends \"layout.html\" %}",
            "{% block main %}",
            "{% filter markdown %}{% raw %}",
            "    Use `{% endraw %}{{ \"{%\" }}{% raw %} if x %}`",
            "{% endraw %}{% endfilter %}",
            "{% endblock main %}",
        ]
        .join("\n");

        let html = renderer.render_page("page", &document, &context()).unwrap();
        assert!(html.contains("<p>Use <code>{% if x %}</code></p>"));
    }

    #[test]
    fn test_missing_parent_template() {
        let (_dir, mut renderer) = renderer("{% block main %}{% endblock main %}");
        let result = renderer.render_page(
            "page",
            "{% extends \"missing.html\" %}{% block main %}x{% endblock main %}",
            &context(),
        );
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base.html", "{% block main %}{% endblock main %}");
        write(
            dir.path(),
            "layout.html",
            "{% extends \"base.html\" %}{% block main %}{% endblock main %}",
        );
        let renderer =
            Renderer::new(dir.path(), Arc::new(SyntaxHighlighter::default())).unwrap();

        assert_eq!(renderer.ancestors("layout.html"), vec!["base.html".to_string()]);
        assert!(renderer.ancestors("base.html").is_empty());
        assert!(renderer.ancestors("missing.html").is_empty());
    }

    #[test]
    fn test_temporary_template_removed() {
        let (_dir, mut renderer) = renderer("{% block main %}{% endblock main %}");
        let document = "{% extends \"layout.html\" %}{% block main %}x{% endblock main %}";
        renderer.render_page("page", document, &context()).unwrap();
        assert!(!renderer.tera.templates.contains_key("__page__/page.html"));

        let broken = "{% extends \"missing.html\" %}{% block main %}x{% endblock main %}";
        assert!(renderer.render_page("broken", broken, &context()).is_err());
        assert!(!renderer.tera.templates.contains_key("__page__/broken.html"));
        assert!(renderer.render_page("page", document, &context()).is_ok());
    }
}
