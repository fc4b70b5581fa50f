//! Hierarchical output-schema summarization with fold markers (§4.5.3).

use crate::schema::{flatten_leaves, leaf_count, parse_schema, SchemaNode};
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::OnceLock;

/// Hard cap on the number of summary lines a single tool's output schema
/// (or a single drill-down) may produce.
pub const MAX_SUMMARY_FIELDS: usize = 30;

fn tier1_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"^(?:|.*\.|\[\]\.)(?:id|.*_id|name|title|status|type|url|email|price|amount|created|updated|timestamp)$",
        )
        .expect("tier1 pattern is valid")
    })
}

fn fold_line(path: &str, sub_fields: usize) -> String {
    format!(
        "{path}: object (contains {sub_fields} sub-fields; inspect_tool_output(..., field_path=\"{path}\"))"
    )
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Summarize `schema` (the wrapper's raw `output_schema` value) into at
/// most [`MAX_SUMMARY_FIELDS`] lines, returning `(lines, has_hidden_fields)`.
pub fn summarize_output_schema(schema: &Value) -> (Vec<String>, bool) {
    summarize_node(&parse_schema(schema))
}

/// Summarize an already-parsed subtree rooted at the tool's output root.
pub fn summarize_node(root: &SchemaNode) -> (Vec<String>, bool) {
    summarize_node_at(root, "")
}

/// Summarize a subtree reached by navigating `prefix` down from the real
/// output root. Lines always carry paths absolute w.r.t. that real root, so
/// a fold marker emitted from *any* depth is a valid `field_path` to feed
/// straight back into another drill-down call (§8's fold/unfold property).
pub fn summarize_node_at(root: &SchemaNode, prefix: &str) -> (Vec<String>, bool) {
    let mut lines = Vec::new();
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut has_hidden = false;

    // Tier 1: leaves matching the always-kept name pattern, anywhere in the tree.
    let mut all_leaves = Vec::new();
    flatten_leaves(root, prefix, &mut all_leaves);
    let re = tier1_regex();
    for (path, ty) in &all_leaves {
        if !re.is_match(path) {
            continue;
        }
        if lines.len() >= MAX_SUMMARY_FIELDS {
            has_hidden = true;
            break;
        }
        if used.insert(path.clone()) {
            lines.push(format!("{path}: {ty}"));
        }
    }

    // Tier 2: immediate children of the root, primitive leaf or one-line fold.
    let mut fold_roots: Vec<(String, &SchemaNode)> = Vec::new();
    if let SchemaNode::Object(children) = root {
        for (key, child) in children {
            let full_path = child_path(prefix, key);
            if used.contains(&full_path) {
                continue;
            }
            if lines.len() >= MAX_SUMMARY_FIELDS {
                has_hidden = true;
                break;
            }
            match child {
                SchemaNode::Leaf(ty) => {
                    used.insert(full_path.clone());
                    lines.push(format!("{full_path}: {ty}"));
                }
                _ => {
                    used.insert(full_path.clone());
                    lines.push(fold_line(&full_path, leaf_count(child)));
                    has_hidden = true;
                    fold_roots.push((full_path, child));
                }
            }
        }
    }

    // Tier 3: BFS over what Tier 2 folded (plus anything Tier 2 didn't touch,
    // e.g. a non-object root), filling whatever budget remains.
    let mut queue: VecDeque<(String, &SchemaNode)> = VecDeque::new();
    match root {
        SchemaNode::Object(_) => {
            for (path, node) in fold_roots {
                enqueue_children(path, node, &used, &mut queue);
            }
        }
        other => queue.push_back((prefix.to_string(), other)),
    }

    while let Some((path, node)) = queue.pop_front() {
        if used.contains(&path) {
            continue;
        }
        if lines.len() >= MAX_SUMMARY_FIELDS {
            has_hidden = true;
            break;
        }
        match node {
            SchemaNode::Leaf(ty) => {
                used.insert(path.clone());
                lines.push(format!("{path}: {ty}"));
            }
            SchemaNode::Array(item) => {
                queue.push_back((format!("{path}[]"), item.as_ref()));
            }
            SchemaNode::Object(children) => {
                let remaining = MAX_SUMMARY_FIELDS - lines.len();
                if !children.is_empty() && children.len() > remaining {
                    used.insert(path.clone());
                    lines.push(fold_line(&path, leaf_count(node)));
                    has_hidden = true;
                } else {
                    enqueue_children(path, node, &used, &mut queue);
                }
            }
        }
    }

    (lines, has_hidden)
}

fn enqueue_children<'a>(
    path: String,
    node: &'a SchemaNode,
    used: &BTreeSet<String>,
    queue: &mut VecDeque<(String, &'a SchemaNode)>,
) {
    match node {
        SchemaNode::Object(children) => {
            for (key, child) in children {
                let cp = child_path(&path, key);
                if !used.contains(&cp) {
                    queue.push_back((cp, child));
                }
            }
        }
        SchemaNode::Array(item) => {
            queue.push_back((format!("{path}[]"), item.as_ref()));
        }
        SchemaNode::Leaf(_) => queue.push_back((path, node)),
    }
}
