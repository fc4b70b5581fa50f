//! The Tool Index itself: built descriptors, lexical search, lookup (§4.5.1).

use crate::docstring::parse_docstring;
use crate::spec::ToolSpec;
use crate::summarize::summarize_output_schema;
use planner_core::ToolDescriptor;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors surfaced by [`ToolIndex`] lookups.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IndexError {
    /// No tool with this id is in the index.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The tool has no attached `output_schema` to drill into.
    #[error("tool {0} has no output schema")]
    NoOutputSchema(String),
    /// `field_path` does not resolve against the tool's output schema.
    #[error("unknown field path {1:?} for tool {0}")]
    UnknownFieldPath(String, String),
}

struct Entry {
    descriptor: ToolDescriptor,
    output_schema: Option<Value>,
}

/// Compact, searchable view over a tenant's registered tools, rebuilt
/// whenever the provider set changes (§5's "readers observe immutable
/// snapshots" policy — callers swap `ToolIndex` instances wholesale).
pub struct ToolIndex {
    entries: BTreeMap<String, Entry>,
}

fn build_descriptor(spec: &ToolSpec) -> ToolDescriptor {
    let exposed = spec.exposed_params();
    let parsed = parse_docstring(&spec.docstring);
    let signature = format!(
        "({})",
        exposed
            .iter()
            .map(|p| p.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut input_params = HashMap::new();
    for p in &exposed {
        let requiredness = match &p.default {
            None => "required".to_string(),
            Some(default) => format!("optional, default={default}"),
        };
        let doc = parsed.params.get(&p.name).cloned().unwrap_or_default();
        input_params.insert(
            p.name.clone(),
            format!("{} ({requiredness}) - {doc}", p.type_name),
        );
    }
    let (output_fields, has_hidden_fields) = match &spec.output_schema {
        Some(schema) => summarize_output_schema(schema),
        None => (Vec::new(), false),
    };
    ToolDescriptor {
        tool_id: spec.tool_id(),
        server: spec.provider.clone(),
        signature,
        description: parsed.description,
        input_params,
        output_fields,
        has_hidden_fields,
    }
}

fn lexical_score(query_tokens: &[String], haystack: &str) -> usize {
    let haystack = haystack.to_ascii_lowercase();
    query_tokens
        .iter()
        .filter(|t| haystack.contains(t.as_str()))
        .count()
}

impl ToolIndex {
    /// Build an index from the wrappers discovered in the current process.
    ///
    /// Building twice over the same `specs` yields byte-identical
    /// descriptors (§8): there is no randomness or wall-clock input
    /// anywhere in [`build_descriptor`] or [`summarize_output_schema`].
    pub fn build(specs: &[ToolSpec]) -> Self {
        let entries = specs
            .iter()
            .map(|spec| {
                let descriptor = build_descriptor(spec);
                (
                    descriptor.tool_id.clone(),
                    Entry {
                        descriptor,
                        output_schema: spec.output_schema.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Number of tools in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no tools.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one tool's compact descriptor by id.
    pub fn get(&self, tool_id: &str) -> Option<&ToolDescriptor> {
        self.entries.get(tool_id).map(|e| &e.descriptor)
    }

    /// Every tool id in the index, in ascending order.
    pub fn tool_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Lexical search (Open Question #2: deterministic, no embeddings) over
    /// tool id, description, and parameter docs. Ties break on `tool_id`
    /// (the `BTreeMap`'s natural order), so results are stable across runs
    /// over the same index snapshot.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ToolDescriptor> {
        let query_tokens: Vec<String> = query
            .to_ascii_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &ToolDescriptor)> = self
            .entries
            .values()
            .filter_map(|entry| {
                let d = &entry.descriptor;
                let haystack = format!(
                    "{} {} {}",
                    d.tool_id,
                    d.description,
                    d.input_params.values().cloned().collect::<Vec<_>>().join(" ")
                );
                let score = lexical_score(&query_tokens, &haystack);
                (score > 0).then_some((score, d))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.tool_id.cmp(&b.1.tool_id)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, d)| d.clone())
            .collect()
    }

    /// The raw `output_schema` backing `tool_id`'s descriptor, for
    /// [`crate::inspect_tool_output`].
    pub(crate) fn output_schema(&self, tool_id: &str) -> Result<&Value, IndexError> {
        let entry = self
            .entries
            .get(tool_id)
            .ok_or_else(|| IndexError::UnknownTool(tool_id.to_string()))?;
        entry
            .output_schema
            .as_ref()
            .ok_or_else(|| IndexError::NoOutputSchema(tool_id.to_string()))
    }
}
