//! YAML front matter extraction.
//!
//! Splits a page source into its YAML front matter and body, and encodes
//! both as the JSON envelope consumed by the content transforms:
//!
//! ```json
//! {"extends": "layout.html", "block": "main", "locals": {...}, "__content": "..."}
//! ```

use serde_json::{Map, Value};

/// Key holding the page body in the envelope.
pub const CONTENT_KEY: &str = "__content";

#[derive(thiserror::Error, Debug)]
pub enum FrontMatterError {
    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("front matter cannot be encoded as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Values filled in when the front matter leaves them out.
#[derive(Debug, Clone)]
pub struct EnvelopeDefaults {
    /// Parent template
    pub layout: String,
    /// Content block
    pub block: String,
}

/// A page source split into front matter and body.
#[derive(Debug, PartialEq, Eq)]
pub struct SplitSource<'a> {
    /// The YAML between the `---` delimiters, if present
    pub front_matter: Option<&'a str>,
    /// Everything after the front matter
    pub body: &'a str,
}

/// Split YAML front matter from the body.
///
/// Front matter is a YAML block delimited by `---` at the start of the file:
///
/// ```markdown
/// ---
/// extends: layout.html
/// locals:
///   title: About
/// ---
///
/// # Content starts here
/// ```
pub fn split_front_matter(content: &str) -> SplitSource<'_> {
    let trimmed = content.trim_start();

    let Some(after_opening) = trimmed.strip_prefix("---") else {
        return SplitSource {
            front_matter: None,
            body: content,
        };
    };

    // Find the closing delimiter
    let Some(closing_pos) = after_opening.find("\n---") else {
        // No closing delimiter found, treat entire content as body
        return SplitSource {
            front_matter: None,
            body: content,
        };
    };

    let yaml = after_opening[..closing_pos].trim_start_matches(['\r', '\n']);
    let rest = &after_opening[closing_pos + "\n---".len()..];
    // Drop the remainder of the delimiter line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => "",
    };

    SplitSource {
        front_matter: Some(yaml),
        body: body.trim_start_matches(['\r', '\n']),
    }
}

/// Encode a page source as a JSON envelope.
pub fn to_envelope(raw: &str, defaults: &EnvelopeDefaults) -> Result<String, FrontMatterError> {
    let split = split_front_matter(raw);

    let mut envelope = match split.front_matter {
        Some(yaml) => parse_mapping(yaml)?,
        None => Map::new(),
    };

    if !envelope.contains_key("extends") {
        envelope.insert("extends".to_string(), Value::String(defaults.layout.clone()));
    }
    if !envelope.contains_key("block") {
        envelope.insert("block".to_string(), Value::String(defaults.block.clone()));
    }
    envelope.insert(CONTENT_KEY.to_string(), Value::String(split.body.to_string()));

    Ok(serde_json::to_string(&Value::Object(envelope))?)
}

/// Parse front matter YAML into a JSON object.
fn parse_mapping(yaml: &str) -> Result<Map<String, Value>, FrontMatterError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;

    match value {
        serde_yaml::Value::Null => Ok(Map::new()),
        serde_yaml::Value::Mapping(_) => match serde_json::to_value(&value)? {
            Value::Object(map) => Ok(map),
            _ => Err(FrontMatterError::NotAMapping("a non-object value")),
        },
        serde_yaml::Value::Sequence(_) => Err(FrontMatterError::NotAMapping("a sequence")),
        _ => Err(FrontMatterError::NotAMapping("a scalar")),
    }
}
