//! Hierarchical sample identifiers for templated request URLs.
//!
//! Documentation URLs carry placeholders such as `/teams/{team-id}/channels/{channel-id}`.
//! Sample values are stored as a trie: a concrete team node owns the channel node that
//! belongs to it, so `{channel-id}` is resolved relative to whichever team was resolved
//! first in the same URL.

use crate::error::{Result, SnippetError};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Reserved key carrying a node's own value in the JSON source.
pub const VALUE_KEY: &str = "_value";

/// Matches `{name-id}` and `{dotted.name-id}`, case-insensitively.
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"(?i)\{([a-z0-9.]+)-id\}").expect("Invalid regex pattern"))
}

/// Malformed patterns found in published documentation, rewritten to the placeholder
/// grammar before scanning.
const EDGE_CASES: &[(&str, &str)] = &[
    ("{user-id | userPrincipalName}", "{user-id}"),
    ("{id | userPrincipalName}", "{user-id}"),
    ("{user-id|userPrincipalName}", "{user-id}"),
    ("{group-id | team-id}", "{group-id}"),
];

/// The marker value meaning "no sample exists for this node".
pub fn unresolved_sentinel(name: &str) -> String {
    format!("<{}>", name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierNode {
    value: Option<String>,
    children: HashMap<String, IdentifierNode>,
}

impl IdentifierNode {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: Some(value.into()), children: HashMap::new() }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: IdentifierNode) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn child(&self, name: &str) -> Option<&IdentifierNode> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &IdentifierNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn from_json(path: &str, value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            SnippetError::config(format!("identifier node '{}' must be a JSON object", path))
        })?;

        let mut node = IdentifierNode::default();
        for (key, child) in object {
            if key == VALUE_KEY {
                let text = child.as_str().ok_or_else(|| {
                    SnippetError::config(format!("'{}' of '{}' must be a string", VALUE_KEY, path))
                })?;
                node.value = Some(text.to_string());
            } else {
                let child_path = format!("{}/{}", path, key);
                node.children.insert(key.clone(), Self::from_json(&child_path, child)?);
            }
        }
        Ok(node)
    }

    /// Resolved value of the child `name`, unless the child is missing or only
    /// carries the unresolved-data sentinel.
    fn resolved_child(&self, name: &str) -> Option<(&IdentifierNode, &str)> {
        let child = self.children.get(name)?;
        let value = child.value.as_deref()?;
        if value == unresolved_sentinel(name) {
            return None;
        }
        Some((child, value))
    }
}

/// Root of the identifier trie. The root itself never carries a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierTree {
    root: IdentifierNode,
}

impl IdentifierTree {
    pub fn new(root: IdentifierNode) -> Result<Self> {
        if root.value.is_some() {
            return Err(SnippetError::config("identifier tree root must not carry a value"));
        }
        Ok(Self { root })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        Self::new(IdentifierNode::from_json("", value)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let tree = Self::from_json_str(&content)?;
        debug!(path = %path.display(), top_level = tree.root.children.len(), "loaded identifier tree");
        Ok(tree)
    }

    pub fn root(&self) -> &IdentifierNode {
        &self.root
    }

    /// Replaces every `{name-id}` placeholder in `text` with sample data.
    ///
    /// Placeholders are visited in order of appearance. Each lookup starts from the
    /// node resolved for the previous placeholder, so nested resources resolve inside
    /// their parent's subtree. Token matching is case-insensitive; key lookup is not.
    ///
    /// # Errors
    ///
    /// Returns [`SnippetError::DataNotFound`] for the first placeholder without sample
    /// data. No partially substituted text is ever returned.
    pub fn resolve(&self, text: &str) -> Result<String> {
        let mut text = text.to_string();
        for (pattern, replacement) in EDGE_CASES {
            if text.contains(pattern) {
                text = text.replace(pattern, replacement);
            }
        }

        let regex = get_placeholder_regex();
        let mut cursor = &self.root;
        let mut resolved: HashMap<String, String> = HashMap::new();

        for captures in regex.captures_iter(&text) {
            let token = &captures[0];
            let key = token.to_lowercase();
            if resolved.contains_key(&key) {
                continue;
            }

            let name = &captures[1];
            let (node, value) = cursor.resolved_child(name).ok_or_else(|| {
                SnippetError::DataNotFound { placeholder: token.to_string(), text: text.clone() }
            })?;

            resolved.insert(key, value.to_string());
            cursor = node;
        }

        if resolved.is_empty() {
            return Ok(text);
        }

        let output = regex.replace_all(&text, |captures: &regex::Captures<'_>| {
            resolved.get(&captures[0].to_lowercase()).cloned().unwrap_or_default()
        });
        Ok(output.into_owned())
    }
}
