//! Output-schema tree model shared by summarization and drill-down (§4.5.3).
//!
//! A wrapper's attached `output_schema` is a JSON value using a small
//! example-shape convention: a JSON string names a leaf's type (`"id":
//! "string"`); a JSON object is a nested object; a JSON array's first
//! element describes the (homogeneous) item shape. Bare scalars are
//! accepted too, so a schema can be handed in as literal example data
//! instead of type strings.

use serde_json::Value;
use std::collections::BTreeMap;

/// Parsed form of an `output_schema` value.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// A scalar leaf, carrying its rendered type name.
    Leaf(String),
    /// An object, keyed deterministically (`BTreeMap` sorts by key).
    Object(BTreeMap<String, SchemaNode>),
    /// An array; all items share `item`'s shape.
    Array(Box<SchemaNode>),
}

/// Parse a raw `output_schema` value into a [`SchemaNode`] tree.
pub fn parse_schema(value: &Value) -> SchemaNode {
    match value {
        Value::Object(map) => {
            SchemaNode::Object(map.iter().map(|(k, v)| (k.clone(), parse_schema(v))).collect())
        }
        Value::Array(items) => match items.first() {
            Some(first) => SchemaNode::Array(Box::new(parse_schema(first))),
            None => SchemaNode::Leaf("array".to_string()),
        },
        Value::String(s) => SchemaNode::Leaf(s.clone()),
        Value::Bool(_) => SchemaNode::Leaf("boolean".to_string()),
        Value::Number(_) => SchemaNode::Leaf("number".to_string()),
        Value::Null => SchemaNode::Leaf("null".to_string()),
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Depth-first flatten to `(path, type_name)` for every leaf under `node`,
/// rooted at `prefix`. Array traversal is denoted `[]` per §4.5.3.
pub fn flatten_leaves(node: &SchemaNode, prefix: &str, out: &mut Vec<(String, String)>) {
    match node {
        SchemaNode::Leaf(ty) => out.push((prefix.to_string(), ty.clone())),
        SchemaNode::Object(children) => {
            for (key, child) in children {
                flatten_leaves(child, &child_path(prefix, key), out);
            }
        }
        SchemaNode::Array(item) => {
            let path = format!("{prefix}[]");
            flatten_leaves(item, &path, out);
        }
    }
}

/// Count the leaves reachable under `node` (used for fold-marker counts).
pub fn leaf_count(node: &SchemaNode) -> usize {
    match node {
        SchemaNode::Leaf(_) => 1,
        SchemaNode::Object(children) => children.values().map(leaf_count).sum(),
        SchemaNode::Array(item) => leaf_count(item),
    }
}

/// Navigate a dotted/`[]`-suffixed field path (as emitted in a fold marker)
/// down to the node it names. `""` returns `node` itself.
pub fn node_at_path<'a>(node: &'a SchemaNode, path: &str) -> Option<&'a SchemaNode> {
    if path.is_empty() {
        return Some(node);
    }
    let mut current = node;
    for segment in path.split('.') {
        let (key, is_array) = match segment.strip_suffix("[]") {
            Some(k) => (k, true),
            None => (segment, false),
        };
        if !key.is_empty() {
            current = match current {
                SchemaNode::Object(children) => children.get(key)?,
                _ => return None,
            };
        }
        if is_array {
            current = match current {
                SchemaNode::Array(item) => item.as_ref(),
                _ => return None,
            };
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_object_and_array() {
        let schema = json!({
            "id": "string",
            "messages": [{"id": "string", "subject": "string"}]
        });
        let root = parse_schema(&schema);
        let mut leaves = Vec::new();
        flatten_leaves(&root, "", &mut leaves);
        leaves.sort();
        assert_eq!(
            leaves,
            vec![
                ("id".to_string(), "string".to_string()),
                ("messages[].id".to_string(), "string".to_string()),
                ("messages[].subject".to_string(), "string".to_string()),
            ]
        );
    }

    #[test]
    fn navigates_array_path() {
        let schema = json!({"messages": [{"id": "string"}]});
        let root = parse_schema(&schema);
        let node = node_at_path(&root, "messages[].id").unwrap();
        assert!(matches!(node, SchemaNode::Leaf(t) if t == "string"));
    }

    #[test]
    fn unknown_path_is_none() {
        let schema = json!({"id": "string"});
        let root = parse_schema(&schema);
        assert!(node_at_path(&root, "nope").is_none());
    }

    #[test]
    fn leaf_count_counts_transitively() {
        let schema = json!({"a": "string", "b": {"c": "number", "d": "boolean"}});
        let root = parse_schema(&schema);
        assert_eq!(leaf_count(&root), 3);
    }
}
