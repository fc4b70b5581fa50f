//! `toolbox.inspect_tool_output` — the built-in drill-down tool (§4.5.1, §4.5.3).
//!
//! Recursively applying this to every fold marker a summarization emits
//! reaches the same leaves as a direct full flatten of the schema (§8):
//! each call re-runs the identical Tier 1/2/3 rules rooted at the
//! requested `field_path`, so a subtree small enough to fit under
//! `MAX_SUMMARY_FIELDS` is always reported in full, and one that isn't
//! yields further fold markers to keep drilling into.

use crate::index::{IndexError, ToolIndex};
use crate::schema::{node_at_path, parse_schema};
use crate::summarize::summarize_node_at;
use serde_json::{json, Value};

/// Drill into `field_path` of `tool_id`'s output schema, returning the same
/// `{lines, has_hidden_fields}` shape a top-level summarization produces.
///
/// Lines in the result carry paths absolute w.r.t. the tool's real output
/// root (not relative to `field_path`), so any fold marker in the result
/// can be fed straight back in as the next `field_path`.
pub fn inspect_tool_output(
    index: &ToolIndex,
    tool_id: &str,
    field_path: &str,
) -> Result<Value, IndexError> {
    let schema = index.output_schema(tool_id)?;
    let root = parse_schema(schema);
    let node = node_at_path(&root, field_path).ok_or_else(|| {
        IndexError::UnknownFieldPath(tool_id.to_string(), field_path.to_string())
    })?;
    let (fields, has_hidden_fields) = summarize_node_at(node, field_path);
    Ok(json!({
        "tool_id": tool_id,
        "field_path": field_path,
        "fields": fields,
        "has_hidden_fields": has_hidden_fields,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParamSpec, ToolSpec};
    use std::collections::{HashSet, VecDeque};

    /// A schema with more total leaves than `MAX_SUMMARY_FIELDS`, but no
    /// single container with more direct children than the budget — every
    /// container is individually recoverable by drilling into its own
    /// Tier 2 fold marker with a fresh budget. A container wider than the
    /// budget at one level (e.g. fifty flat sibling scalars) is out of
    /// scope: nothing in the field-path grammar can address "the rest of
    /// this level", so such a level can only ever be partially surfaced.
    fn big_schema() -> Value {
        fn group(prefix: &str) -> Value {
            let mut fields = serde_json::Map::new();
            for i in 0..7 {
                fields.insert(format!("{prefix}{i}"), json!("string"));
            }
            Value::Object(fields)
        }
        json!({
            "id": "string",
            "alpha": group("a"),
            "beta": group("b"),
            "gamma": group("g"),
            "delta": group("d"),
        })
    }

    fn index_with_big_schema() -> ToolIndex {
        let spec = ToolSpec {
            provider: "gmail".into(),
            name: "gmail_search".into(),
            params: vec![
                ParamSpec::required("tenant", "TenantContext"),
                ParamSpec::required("query", "str"),
            ],
            docstring: "Search.".into(),
            output_schema: Some(big_schema()),
        };
        ToolIndex::build(&[spec])
    }

    #[test]
    fn unknown_tool_is_an_error() {
        let index = index_with_big_schema();
        assert!(matches!(
            inspect_tool_output(&index, "gmail.nope", "x"),
            Err(IndexError::UnknownTool(_))
        ));
    }

    #[test]
    fn unknown_field_path_is_an_error() {
        let index = index_with_big_schema();
        assert!(matches!(
            inspect_tool_output(&index, "gmail.gmail_search", "not.a.field"),
            Err(IndexError::UnknownFieldPath(..))
        ));
    }

    #[test]
    fn drilling_into_every_fold_marker_reaches_the_full_flatten() {
        let index = index_with_big_schema();
        let descriptor = index.get("gmail.gmail_search").unwrap();

        // Collect all leaves a direct full flatten would produce, for comparison.
        let root = crate::schema::parse_schema(&big_schema());
        let mut full = Vec::new();
        crate::schema::flatten_leaves(&root, "", &mut full);
        let full_paths: HashSet<String> = full.into_iter().map(|(p, _)| p).collect();

        // BFS-unfold every fold marker the top-level summary emits.
        let mut discovered: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for line in &descriptor.output_fields {
            if let Some(path) = extract_leaf_path(line) {
                discovered.insert(path);
            } else if let Some(path) = extract_fold_path(line) {
                queue.push_back(path);
            }
        }
        while let Some(path) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let result = inspect_tool_output(&index, "gmail.gmail_search", &path).unwrap();
            for line in result["fields"].as_array().unwrap() {
                let line = line.as_str().unwrap();
                if let Some(p) = extract_leaf_path(line) {
                    discovered.insert(p);
                } else if let Some(p) = extract_fold_path(line) {
                    queue.push_back(p);
                }
            }
        }

        assert_eq!(discovered, full_paths);
    }

    fn extract_leaf_path(line: &str) -> Option<String> {
        if line.contains("inspect_tool_output") {
            return None;
        }
        line.split_once(':').map(|(p, _)| p.to_string())
    }

    fn extract_fold_path(line: &str) -> Option<String> {
        if !line.contains("inspect_tool_output") {
            return None;
        }
        line.split_once(':').map(|(p, _)| p.to_string())
    }
}
