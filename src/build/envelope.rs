//! Typed page envelopes.
//!
//! The envelope is validated once at the transform boundary: locals keys must
//! be template identifiers, and values must belong to the set that can be
//! written as a Tera literal.

use serde::Deserialize;
use serde_json::Value;

/// Content block used when the envelope does not name one.
pub const DEFAULT_BLOCK: &str = "main";

/// Words Tera reserves in expressions; they cannot be assigned to.
const RESERVED_WORDS: &[&str] = &[
    "true", "false", "True", "False", "and", "or", "not", "in", "is", "loop", "self", "super",
    "__tera_context",
];

#[derive(thiserror::Error, Debug)]
pub enum EnvelopeError {
    #[error("invalid page envelope: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid local name '{0}': must be an identifier")]
    InvalidKey(String),

    #[error("invalid block name '{0}': must be an identifier")]
    InvalidBlock(String),

    #[error("local '{key}' has an unsupported value: {reason}")]
    UnsupportedValue { key: String, reason: String },
}

/// Raw envelope shape, before validation.
#[derive(Deserialize)]
struct RawEnvelope {
    extends: String,
    #[serde(default)]
    block: Option<String>,
    #[serde(default)]
    locals: Option<serde_json::Map<String, Value>>,
    #[serde(rename = "__content", default)]
    content: Option<String>,
}

/// A validated page envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Parent template identifier
    pub extends: String,
    block: Option<String>,
    /// Page locals in source order
    pub locals: Vec<(String, LocalValue)>,
    /// Raw page body
    pub content: String,
}

impl Envelope {
    /// Parse and validate a JSON envelope.
    pub fn parse(json: &str) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_str(json)?;

        if let Some(block) = &raw.block
            && !is_identifier(block)
        {
            return Err(EnvelopeError::InvalidBlock(block.clone()));
        }

        let locals = raw
            .locals
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| {
                if !is_identifier(&key) || RESERVED_WORDS.contains(&key.as_str()) {
                    return Err(EnvelopeError::InvalidKey(key));
                }
                let value = LocalValue::from_json(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extends: raw.extends,
            block: raw.block,
            locals,
            content: raw.content.unwrap_or_default(),
        })
    }

    /// The content block name, defaulting to `main`.
    pub fn block_name(&self) -> &str {
        self.block.as_deref().unwrap_or(DEFAULT_BLOCK)
    }
}

/// A local value that can be injected into the template scope.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<LocalValue>),
}

impl LocalValue {
    fn from_json(key: &str, value: Value) -> Result<Self, EnvelopeError> {
        let unsupported = |reason: &str| EnvelopeError::UnsupportedValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        match value {
            Value::String(s) => {
                if s.contains('"') && s.contains('\'') && s.contains('`') {
                    return Err(unsupported(
                        "strings cannot contain all of the quote characters \" ' `",
                    ));
                }
                Ok(LocalValue::String(s))
            }
            Value::Bool(b) => Ok(LocalValue::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(LocalValue::Integer(i))
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(LocalValue::Float)
                        .ok_or_else(|| unsupported("number out of range"))
                }
            }
            Value::Array(items) => items
                .into_iter()
                .map(|item| LocalValue::from_json(key, item))
                .collect::<Result<Vec<_>, _>>()
                .map(LocalValue::Array),
            Value::Null => Err(unsupported("null is not allowed")),
            Value::Object(_) => Err(unsupported("mappings are not allowed")),
        }
    }

    /// Write the value as a Tera literal.
    pub fn to_template_literal(&self) -> String {
        match self {
            LocalValue::String(s) => {
                // Tera string literals have no escapes; pick a free delimiter
                let quote = ['"', '\'', '`']
                    .into_iter()
                    .find(|q| !s.contains(*q))
                    .unwrap_or('"');
                format!("{quote}{s}{quote}")
            }
            LocalValue::Integer(i) => i.to_string(),
            LocalValue::Float(f) => {
                let literal = f.to_string();
                if literal.contains('.') || literal.contains('e') {
                    literal
                } else {
                    format!("{literal}.0")
                }
            }
            LocalValue::Bool(b) => b.to_string(),
            LocalValue::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(LocalValue::to_template_literal)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Check whether a name is a valid template identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_envelope() {
        let envelope = Envelope::parse(
            r#"{"extends":"layout.html","block":"content","locals":{"a":1,"b":"x"},"__content":"Hi"}"#,
        )
        .unwrap();

        assert_eq!(envelope.extends, "layout.html");
        assert_eq!(envelope.block_name(), "content");
        assert_eq!(
            envelope.locals,
            vec![
                ("a".to_string(), LocalValue::Integer(1)),
                ("b".to_string(), LocalValue::String("x".to_string())),
            ]
        );
        assert_eq!(envelope.content, "Hi");
    }

    #[test]
    fn test_defaults() {
        let envelope = Envelope::parse(r#"{"extends":"layout.html"}"#).unwrap();
        assert_eq!(envelope.block_name(), "main");
        assert!(envelope.locals.is_empty());
        assert_eq!(envelope.content, "");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Envelope::parse("{not json"),
            Err(EnvelopeError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_extends() {
        assert!(matches!(
            Envelope::parse(r#"{"__content":"x"}"#),
            Err(EnvelopeError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_key() {
        let result = Envelope::parse(r#"{"extends":"l.html","locals":{"page-title":"x"}}"#);
        assert!(matches!(result, Err(EnvelopeError::InvalidKey(k)) if k == "page-title"));

        let result = Envelope::parse(r#"{"extends":"l.html","locals":{"loop":1}}"#);
        assert!(matches!(result, Err(EnvelopeError::InvalidKey(_))));
    }

    #[test]
    fn test_invalid_block() {
        let result = Envelope::parse(r#"{"extends":"l.html","block":"my block"}"#);
        assert!(matches!(result, Err(EnvelopeError::InvalidBlock(_))));
    }

    #[test]
    fn test_unsupported_values() {
        for locals in [r#"{"a":null}"#, r#"{"a":{"b":1}}"#, r#"{"a":[1,null]}"#] {
            let json = format!(r#"{{"extends":"l.html","locals":{locals}}}"#);
            assert!(matches!(
                Envelope::parse(&json),
                Err(EnvelopeError::UnsupportedValue { .. })
            ));
        }
    }

    #[test]
    fn test_template_literals() {
        assert_eq!(LocalValue::Integer(-3).to_template_literal(), "-3");
        assert_eq!(LocalValue::Float(1.5).to_template_literal(), "1.5");
        assert_eq!(LocalValue::Float(2.0).to_template_literal(), "2.0");
        assert_eq!(LocalValue::Bool(true).to_template_literal(), "true");
        assert_eq!(
            LocalValue::String("plain".into()).to_template_literal(),
            "\"plain\""
        );
        assert_eq!(
            LocalValue::String("say \"hi\"".into()).to_template_literal(),
            "'say \"hi\"'"
        );
        assert_eq!(
            LocalValue::String("it's \"x\"".into()).to_template_literal(),
            "`it's \"x\"`"
        );
        assert_eq!(
            LocalValue::Array(vec![
                LocalValue::Integer(1),
                LocalValue::String("two".into())
            ])
            .to_template_literal(),
            "[1, \"two\"]"
        );
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("title"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("h1"));
        assert!(!is_identifier("1h"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
