//! Restricted-schema Compose document loader.
//!
//! Text is first read into a generic YAML tree. Any explicit tag anywhere in
//! that tree is rejected before the tree is turned into the typed
//! [`ast::ComposeDocument`], so untrusted input can never select the type
//! that gets instantiated.

pub mod ast;
pub mod validator;

use ciconv_common::error::{CiconvError, Result};
use serde_yaml::Value;

use self::ast::ComposeDocument;

fn parse_err(message: impl Into<String>) -> CiconvError {
    CiconvError::Parse {
        message: message.into(),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Walks the tree and fails on the first explicitly tagged node.
fn reject_tags(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::Tagged(tagged) => {
            let at = if path.is_empty() { "<root>" } else { path };
            Err(parse_err(format!(
                "custom tag {} is not allowed (at {at})",
                tagged.tag
            )))
        }
        Value::Sequence(items) => {
            for (idx, item) in items.iter().enumerate() {
                reject_tags(item, &format!("{path}[{idx}]"))?;
            }
            Ok(())
        }
        Value::Mapping(map) => {
            for (key, item) in map {
                reject_tags(key, path)?;
                let segment = key
                    .as_str()
                    .map_or_else(|| format!("<{}>", kind_of(key)), String::from);
                let child = if path.is_empty() {
                    segment
                } else {
                    format!("{path}.{segment}")
                };
                reject_tags(item, &child)?;
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
    }
}

/// Parses a Compose document from its source text.
///
/// Structural problems such as a missing `services` section are not parse
/// errors; they are reported by [`validator::validate`].
///
/// # Errors
///
/// Returns [`CiconvError::Parse`] carrying the YAML parser's message when the
/// text is malformed, uses explicit tags, is not a mapping at the top level,
/// or does not match the Compose schema.
pub fn parse(input: &str) -> Result<ComposeDocument> {
    tracing::info!(bytes = input.len(), "parsing compose document");
    if input.trim().is_empty() {
        return Ok(ComposeDocument::default());
    }

    let tree: Value = serde_yaml::from_str(input).map_err(|e| parse_err(e.to_string()))?;
    reject_tags(&tree, "")?;

    match tree {
        Value::Null => Ok(ComposeDocument::default()),
        Value::Mapping(_) => {
            let document: ComposeDocument =
                serde_yaml::from_value(tree).map_err(|e| parse_err(e.to_string()))?;
            tracing::debug!(services = document.services().len(), "compose document parsed");
            Ok(document)
        }
        other => Err(parse_err(format!(
            "top level must be a mapping, got {}",
            kind_of(&other)
        ))),
    }
}
