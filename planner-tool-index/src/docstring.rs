//! Docstring -> `{description, params}` parsing (§4.5.1).
//!
//! Wrapper docstrings follow the common Python convention of a free-text
//! summary followed by an `Args:`/`Arguments:`/`Params:` section listing
//! `name: doc` lines. Anything after a `Returns:`/`Raises:` header is
//! ignored — that's documentation for the wrapper's own return value and
//! error modes, not its parameters.

use std::collections::HashMap;

/// The two parts a docstring splits into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    /// Free-text description, whitespace-normalized.
    pub description: String,
    /// Parameter name -> its documentation line.
    pub params: HashMap<String, String>,
}

fn is_params_header(line: &str) -> bool {
    matches!(
        line.to_ascii_lowercase().as_str(),
        "args:" | "arguments:" | "params:" | "parameters:"
    )
}

fn ends_params_section(line: &str) -> bool {
    matches!(
        line.to_ascii_lowercase().as_str(),
        "returns:" | "raises:" | "yields:" | "examples:"
    )
}

/// Parse a docstring into its description and per-parameter doc lines.
pub fn parse_docstring(doc: &str) -> ParsedDoc {
    let mut description_words: Vec<&str> = Vec::new();
    let mut params = HashMap::new();
    let mut in_params = false;

    for raw_line in doc.lines() {
        let line = raw_line.trim();
        if !in_params {
            if is_params_header(line) {
                in_params = true;
                continue;
            }
            description_words.extend(line.split_whitespace());
        } else {
            if line.is_empty() {
                continue;
            }
            if ends_params_section(line) {
                break;
            }
            if let Some((name, text)) = line.split_once(':') {
                params.insert(name.trim().to_string(), text.trim().to_string());
            }
        }
    }

    ParsedDoc {
        description: description_words.join(" "),
        params,
    }
}
