use autumnus::{HtmlLinkedBuilder, formatter::Formatter, languages::Language, themes};

/// Class prefix autumnus puts on `<code>` elements.
const AUTUMNUS_CLASS_PREFIX: &str = "class=\"language-";

/// A syntax highlighter using autumnus (tree-sitter based).
pub struct SyntaxHighlighter {
    /// Theme name for CSS generation
    theme_name: String,
    /// Prefix for the language class on code elements (e.g. `lang-`)
    class_prefix: String,
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the given theme and class prefix.
    pub fn new(theme_name: &str, class_prefix: &str) -> Self {
        Self {
            theme_name: theme_name.to_string(),
            class_prefix: class_prefix.to_string(),
        }
    }

    /// Highlight code and return HTML with CSS classes.
    ///
    /// An empty `language` lets autumnus detect the language from the code.
    /// Returns the original code wrapped in a plain `<code>` if the language is not supported.
    pub fn highlight(&self, code: &str, language: &str) -> String {
        let language = sanitize_language(language);

        // Use Language::guess which handles language detection from name, extension or content
        let lang = Language::guess(&language, code);

        // Check if it's the Plaintext/unknown fallback
        if matches!(lang, Language::PlainText)
            && !language.is_empty()
            && language != "plaintext"
            && language != "text"
        {
            // Language wasn't recognized, use plain code block
            return self.plain_code_block(code, &language);
        }

        let formatter = HtmlLinkedBuilder::new().source(code).lang(lang).build();

        let highlighted = match formatter {
            Ok(f) => {
                let mut output: Vec<u8> = Vec::new();
                if f.format(&mut output).is_ok() {
                    String::from_utf8(output).ok()
                } else {
                    None
                }
            }
            Err(_) => None,
        };

        match highlighted {
            Some(html) => self.apply_class_prefix(html),
            None => self.plain_code_block(code, &language),
        }
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Generate CSS for the current theme.
    pub fn generate_css(&self) -> Option<String> {
        let theme = themes::get(&self.theme_name).ok()?;
        Some(theme.css(false)) // false = don't enable italic
    }

    /// Swap the autumnus language class prefix for the configured one.
    fn apply_class_prefix(&self, html: String) -> String {
        if self.class_prefix == "language-" {
            return html;
        }
        html.replace(
            AUTUMNUS_CLASS_PREFIX,
            &format!("class=\"{}", self.class_prefix),
        )
    }

    /// Create a plain code block without highlighting.
    fn plain_code_block(&self, code: &str, language: &str) -> String {
        let escaped = html_escape(code);
        if language.is_empty() {
            format!("<pre><code>{}</code></pre>", escaped)
        } else {
            format!(
                "<pre><code class=\"{}{}\">{}</code></pre>",
                self.class_prefix, language, escaped
            )
        }
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new("github_dark", "lang-")
    }
}

/// Keep the first word of a fence info string, restricted to class-safe characters.
fn sanitize_language(info: &str) -> String {
    info.split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
        .collect()
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
