//! Markdown rendering with sanitization and syntax highlighting.
//!
//! Rendering policy: GitHub-flavored syntax and tables on, soft line breaks
//! stay soft, raw HTML is escaped, no smart punctuation, and every code block
//! goes through the syntax highlighter. Link and image destinations with a
//! script-capable scheme are replaced by `#`.

use std::collections::HashSet;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};

use super::highlight::SyntaxHighlighter;

/// Destination schemes that can run script when followed or loaded.
const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Render markdown to HTML using pulldown-cmark with syntax highlighting.
pub fn render_markdown(markdown: &str, highlighter: &SyntaxHighlighter) -> String {
    let options = Options::ENABLE_GFM
        | Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(markdown, options);

    // Process events, intercepting code blocks for syntax highlighting
    let mut in_code_block = false;
    let mut code_language = String::new();
    let mut code_content = String::new();

    // Headings are buffered so they can be emitted with an id
    let mut in_heading: Option<HeadingLevel> = None;
    let mut heading_events: Vec<Event> = Vec::new();
    let mut heading_text = String::new();
    let mut used_heading_ids: HashSet<String> = HashSet::new();

    let events: Vec<Event> = parser
        .map(sanitize_destination)
        .flat_map(|event| match event {
            // Sanitize: raw HTML from the source is shown as text
            Event::Html(raw) | Event::InlineHtml(raw) => {
                let text = Event::Text(raw);
                if in_heading.is_some() {
                    heading_events.push(text);
                    vec![]
                } else {
                    vec![text]
                }
            }
            Event::Start(Tag::Heading { level, id, .. }) => {
                if let Some(existing_id) = id {
                    used_heading_ids.insert(existing_id.to_string());
                }
                in_heading = Some(level);
                heading_events.clear();
                heading_text.clear();
                vec![]
            }
            Event::End(TagEnd::Heading(_)) => {
                let level = in_heading.take().unwrap_or(HeadingLevel::H1);

                let base_id = slugify(&heading_text);
                let mut id = base_id.clone();
                let mut suffix = 1;
                while used_heading_ids.contains(&id) {
                    id = format!("{}-{}", base_id, suffix);
                    suffix += 1;
                }
                used_heading_ids.insert(id.clone());

                let mut inner = String::new();
                html::push_html(&mut inner, heading_events.drain(..));

                vec![Event::Html(
                    format!(
                        "<h{level} id=\"{id}\">{inner}</h{level}>\n",
                        level = level as usize,
                    )
                    .into(),
                )]
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                code_language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_content.clear();
                vec![] // Don't emit the start tag yet
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                // Apply syntax highlighting and emit as raw HTML
                let highlighted = highlighter.highlight(&code_content, &code_language);
                vec![Event::Html(format!("{highlighted}\n").into())]
            }
            Event::Text(text) if in_code_block => {
                code_content.push_str(&text);
                vec![]
            }
            other if in_heading.is_some() => {
                if let Event::Text(text) | Event::Code(text) = &other {
                    heading_text.push_str(text);
                }
                heading_events.push(other);
                vec![]
            }
            _ => vec![event],
        })
        .collect();

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    html_output
}

/// Replace unsafe link and image destinations.
fn sanitize_destination(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if is_unsafe_destination(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if is_unsafe_destination(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        other => other,
    }
}

/// Browsers ignore whitespace and control characters inside a scheme.
fn is_unsafe_destination(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Remove the indentation shared by all non-blank lines.
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start_matches(' ')))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a string to a slug suitable for use as an HTML id.
fn slugify(s: &str) -> String {
    s.to_lowercase()
        .replace(' ', "-")
        .replace(|c: char| !c.is_alphanumeric() && c != '-', "")
}
