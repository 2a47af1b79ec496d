//! Document model and parser
//!
//! An LCOD document is YAML of the shape:
//!
//! ```yaml
//! content:
//!   - component: Card
//!     properties:
//!       title: Hello
//!     slots:
//!       default:
//!         - component: Text
//!       footer:
//!         - component: Button
//! ```

use std::path::Path;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use crate::error::{CompileError, Result};
use crate::instrument::{content_hash, is_valid_boundary_id, NodePath};

/// Name of the slot whose children are inlined instead of wrapped.
pub const DEFAULT_SLOT: &str = "default";

/// One component instance in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Component name; the emitted tag and the resolution key.
    pub component: String,
    /// Literal attribute values, in document order.
    pub properties: IndexMap<String, String>,
    /// `None` for leaves. `Some` (possibly empty) means the node has a body.
    pub slots: Option<IndexMap<String, Vec<Node>>>,
    /// Identity-mode boundary id, if the document already carries one.
    pub uuid: Option<String>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.slots.is_none()
    }
}

/// A parsed document. Created per compile and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<Node>,
    hash: String,
}

impl Document {
    /// Parse raw document text. `file` is only used for diagnostics.
    pub fn parse(text: &str, file: &Path) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(CompileError::parse(file, "document is empty"));
        }

        let raw: RawDocument = serde_yaml::from_str(text)
            .map_err(|e| CompileError::parse(file, e.to_string()))?;

        let content = build_nodes(raw.content.unwrap_or_default(), &NodePath::root(), None, file)?;

        Ok(Self {
            content,
            hash: content_hash(text),
        })
    }

    /// Hash of the raw text this document was parsed from.
    pub fn content_hash(&self) -> &str {
        &self.hash
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    content: Option<Vec<RawNode>>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    component: Option<String>,
    #[serde(default)]
    properties: Option<IndexMap<String, Value>>,
    // Outer `Option` tracks presence: `slots:` with no value still counts.
    #[serde(default, deserialize_with = "present")]
    slots: Option<Option<IndexMap<String, Option<Vec<RawNode>>>>>,
    #[serde(default)]
    uuid: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn build_nodes(
    raw: Vec<RawNode>,
    parent: &NodePath,
    slot: Option<&str>,
    file: &Path,
) -> Result<Vec<Node>> {
    let base = match slot {
        Some(name) => parent.slot(name),
        None => parent.clone(),
    };

    raw.into_iter()
        .enumerate()
        .map(|(index, node)| build_node(node, &base.child(index), file))
        .collect()
}

fn build_node(raw: RawNode, path: &NodePath, file: &Path) -> Result<Node> {
    let component = match raw.component {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Err(CompileError::parse(
                file,
                format!("node {} has no `component`", path),
            ));
        }
    };
    if !is_component_name(&component) {
        return Err(CompileError::parse(
            file,
            format!("node {} has an invalid component name {:?}", path, component),
        ));
    }

    let mut properties = IndexMap::new();
    for (key, value) in raw.properties.unwrap_or_default() {
        let text = property_text(value).ok_or_else(|| {
            CompileError::parse(
                file,
                format!(
                    "property `{}` of {} at node {} must be a string, number or boolean",
                    key, component, path
                ),
            )
        })?;
        properties.insert(key, text);
    }

    if let Some(uuid) = &raw.uuid {
        if !is_valid_boundary_id(uuid) {
            return Err(CompileError::parse(
                file,
                format!("node {} has an invalid uuid {:?}", path, uuid),
            ));
        }
    }

    let slots = match raw.slots {
        None => None,
        Some(slots) => {
            let mut built = IndexMap::new();
            for (name, children) in slots.unwrap_or_default() {
                // Slot names are part of path-mode boundary ids.
                if !is_valid_boundary_id(&name) {
                    return Err(CompileError::parse(
                        file,
                        format!("node {} has an invalid slot name {:?}", path, name),
                    ));
                }
                let children = build_nodes(children.unwrap_or_default(), path, Some(&name), file)?;
                built.insert(name, children);
            }
            Some(built)
        }
    };

    Ok(Node {
        component,
        properties,
        slots,
        uuid: raw.uuid,
    })
}

/// Component names are used as import bindings, tags and file names.
fn is_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn property_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Document> {
        Document::parse(text, Path::new("test.lcod"))
    }

    #[test]
    fn test_parse_leaf_and_slots() {
        let doc = parse(
            r#"
content:
  - component: Card
    properties:
      title: Hello
      count: 3
      open: true
    slots:
      default:
        - component: Text
      footer:
        - component: Button
          uuid: btn-1
"#,
        )
        .expect("parse failed");

        assert_eq!(doc.content.len(), 1);
        let card = &doc.content[0];
        assert_eq!(card.component, "Card");
        assert_eq!(card.properties["title"], "Hello");
        assert_eq!(card.properties["count"], "3");
        assert_eq!(card.properties["open"], "true");

        let slots = card.slots.as_ref().expect("card has slots");
        let names: Vec<_> = slots.keys().map(String::as_str).collect();
        assert_eq!(names, ["default", "footer"]);
        assert!(slots["default"][0].is_leaf());
        assert_eq!(slots["footer"][0].uuid.as_deref(), Some("btn-1"));
    }

    #[test]
    fn test_present_but_empty_slots_is_not_a_leaf() {
        let doc = parse("content:\n  - component: Box\n    slots:\n").expect("parse failed");
        assert_eq!(doc.content[0].slots, Some(IndexMap::new()));

        let doc = parse("content:\n  - component: Box\n    slots:\n      default:\n").expect("parse failed");
        let slots = doc.content[0].slots.as_ref().expect("has slots");
        assert!(slots["default"].is_empty());
    }

    #[test]
    fn test_missing_content_is_empty() {
        let doc = parse("title: nothing here\n").expect("parse failed");
        assert!(doc.content.is_empty());

        let doc = parse("content:\n").expect("parse failed");
        assert!(doc.content.is_empty());
    }

    #[test]
    fn test_empty_text_is_error() {
        assert!(matches!(parse("  \n"), Err(CompileError::Parse { .. })));
    }

    #[test]
    fn test_syntax_error_carries_diagnostic() {
        let err = parse("content: [\n  - component: A\n").unwrap_err();
        match err {
            CompileError::Parse { file, message } => {
                assert_eq!(file, Path::new("test.lcod"));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_component_fails_with_node_path() {
        let err = parse(
            r#"
content:
  - component: Card
    slots:
      header:
        - component: Title
        - properties:
            text: orphan
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("node 0/:header/1 has no `component`"), "{err}");
    }

    #[test]
    fn test_nested_property_value_is_rejected() {
        let err = parse("content:\n  - component: A\n    properties:\n      x: [1, 2]\n").unwrap_err();
        assert!(err.to_string().contains("property `x` of A"), "{err}");
    }

    #[test]
    fn test_invalid_uuid_is_rejected() {
        let err = parse("content:\n  - component: A\n    uuid: \"x' -->\"\n").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn test_component_name_must_be_identifier() {
        for name in ["../x", "/abs", "a b", "1Card", "Card.lcod"] {
            let source = format!("content:\n  - component: {:?}\n", name);
            let err = parse(&source).unwrap_err();
            assert!(err.to_string().contains("invalid component name"), "{name}: {err}");
        }
        assert!(parse("content:\n  - component: _My$Card2\n").is_ok());
    }

    #[test]
    fn test_slot_name_must_be_boundary_safe() {
        let err = parse(
            "content:\n  - component: Box\n    slots:\n      \"x' -->\":\n        - component: A\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid slot name"), "{err}");
        assert!(parse("content:\n  - component: Box\n    slots:\n      side-bar_2:\n").is_ok());
    }

    #[test]
    fn test_content_hash_tracks_text() {
        let a = parse("content:\n  - component: A\n").expect("parse failed");
        let b = parse("content:\n  - component: B\n").expect("parse failed");
        assert_eq!(a.content_hash(), content_hash("content:\n  - component: A\n"));
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
