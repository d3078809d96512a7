//! Decoding of raw fragments into property sources.

use crate::core::PropertySource;
use crate::error::{ImportError, Result};
use crate::sources::NamedFragment;
use serde::Deserialize;
use serde_yaml::Value;

/// Turns one fragment into zero or more property sources.
///
/// Implement this trait to plug in a different structured-text format.
pub trait FragmentDecoder: Send + Sync {
    /// Decode `fragment`, yielding one property source per document.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MalformedFragment`] if the payload cannot be
    /// decoded. The importer skips that fragment and keeps going.
    fn decode(&self, fragment: &NamedFragment) -> Result<Vec<PropertySource>>;
}

/// YAML decoder supporting multi-document fragments.
///
/// Nested mappings flatten into dotted keys and sequences into indexed keys:
///
/// ```yaml
/// server:
///   hosts: [a, b]
/// ```
///
/// becomes `server.hosts[0] = a` and `server.hosts[1] = b`. Null values become
/// empty strings and empty documents are dropped. When a fragment holds more
/// than one document, each source is named `"<fragment> (document #<n>)"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl FragmentDecoder for YamlDecoder {
    fn decode(&self, fragment: &NamedFragment) -> Result<Vec<PropertySource>> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_slice(fragment.bytes()) {
            let value = Value::deserialize(document)
                .map_err(|e| ImportError::malformed(fragment.name(), e))?;
            documents.push(value);
        }

        let multi_document = documents.len() > 1;
        let mut sources = Vec::new();

        for (index, document) in documents.into_iter().enumerate() {
            let name = if multi_document {
                format!("{} (document #{})", fragment.name(), index)
            } else {
                fragment.name().to_string()
            };

            match untag(document) {
                Value::Null => continue,
                Value::Mapping(mapping) => {
                    let mut source = PropertySource::new(name);
                    flatten(String::new(), Value::Mapping(mapping), &mut source);
                    if !source.is_empty() {
                        sources.push(source);
                    }
                }
                other => {
                    return Err(ImportError::malformed(
                        name,
                        format!("expected a mapping at document root, found {}", kind(&other)),
                    ));
                }
            }
        }

        Ok(sources)
    }
}

fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn flatten(path: String, value: Value, out: &mut PropertySource) {
    match untag(value) {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                // Composite keys have no dotted form
                let Some(key) = scalar_text(&untag(key)) else {
                    continue;
                };
                let child_path = if path.is_empty() {
                    key
                } else {
                    format!("{}.{}", path, key)
                };
                flatten(child_path, child, out);
            }
        }
        Value::Sequence(items) => {
            for (index, item) in items.into_iter().enumerate() {
                flatten(format!("{}[{}]", path, index), item, out);
            }
        }
        scalar => {
            let text = scalar_text(&scalar).unwrap_or_default();
            out.push(path, text);
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
