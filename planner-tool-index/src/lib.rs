#![deny(missing_docs)]
//! Tool Index — §4.5.
//!
//! Builds the compact [`ToolDescriptor`]s surfaced to the planner by
//! `search`, by introspecting registered wrapper functions ([`ToolSpec`]):
//! deriving the exposed parameter list, parsing the docstring, and folding
//! the attached output schema down to a bounded set of field lines
//! (`MAX_SUMMARY_FIELDS`, §4.5.3). [`inspect_tool_output`] is the drill-down
//! counterpart the planner calls when it needs a field a fold marker hid.

mod docstring;
mod index;
mod inspect;
mod schema;
mod spec;
mod summarize;

pub use docstring::{parse_docstring, ParsedDoc};
pub use index::{IndexError, ToolIndex};
pub use inspect::inspect_tool_output;
pub use spec::{ParamSpec, ToolSpec};
pub use summarize::{summarize_output_schema, MAX_SUMMARY_FIELDS};

/// Tool id of the built-in drill-down tool, always usable without discovery
/// (mirrors `planner_core::state::AgentState::is_always_allowed`).
pub const INSPECT_TOOL_ID: &str = "toolbox.inspect_tool_output";
