//! Sandbox AST gate (§4.4.3).
//!
//! Not a Python parser: a narrow, line-oriented lexical scanner that only
//! needs to answer three questions about a submitted snippet before it is
//! spliced into the fixed `plan.py` scaffold (`planner_sandbox::SandboxRoot`
//! generates `import sandbox_py.servers as servers` and the `asyncio.run`
//! entry point already — the submitted body must not try to redo either):
//!
//! 1. Does every line tokenize as a recognizable statement at all?
//! 2. Does the snippet redefine `main`, call `asyncio.run`, or guard on
//!    `if __name__` — all of which collide with the fixed scaffold?
//! 3. Does every `sandbox_py.servers` import or `servers.<provider>.<tool>(`
//!    / bare `<provider>.<tool>(` call reference only tools already
//!    surfaced by a prior `search`?

use std::collections::BTreeSet;
use std::sync::OnceLock;

use planner_core::ExecutorError;
use regex::Regex;

fn statement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[A-Za-z0-9_]+|[()\[\]{}.,:=+\-*/%<>!&|^~@\s])*$"#,
        )
        .expect("statement regex is a constant")
    })
}

fn import_provider_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^from\s+sandbox_py\.servers\s+import\s+([A-Za-z0-9_]+(?:\s*,\s*[A-Za-z0-9_]+)*)\s*$")
            .expect("import regex is a constant")
    })
}

fn import_tool_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^from\s+sandbox_py\.servers\.([A-Za-z0-9_]+)\s+import\s+([A-Za-z0-9_]+(?:\s*,\s*[A-Za-z0-9_]+)*)\s*$",
        )
        .expect("import regex is a constant")
    })
}

fn namespaced_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bservers\.([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)\s*\(")
            .expect("call regex is a constant")
    })
}

fn bare_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)\s*\(").expect("call regex is a constant")
    })
}

fn def_main_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^def\s+main\s*\(").expect("def main regex is a constant"))
}

fn dunder_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^if\s+__name__\s*==").expect("dunder name regex is a constant"))
}

fn is_allowed(tool_id: &str, discovered_tools: &BTreeSet<String>) -> bool {
    tool_id == "toolbox.inspect_tool_output" || discovered_tools.contains(tool_id)
}

/// Check a submitted `sandbox` command's code against `discovered_tools`.
///
/// Lines are checked independently for the invalid-body and syntax rules;
/// provider/tool references are checked across the whole snippet since a
/// call expression may span line-wrapped parentheses. Exempt from
/// discovery: `toolbox.inspect_tool_output`.
pub fn check(code: &str, discovered_tools: &BTreeSet<String>) -> Result<(), ExecutorError> {
    for raw_line in code.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if def_main_re().is_match(line) {
            return Err(ExecutorError::SandboxInvalidBody(
                "snippet may not redefine main".to_string(),
            ));
        }
        if line.contains("asyncio.run(") {
            return Err(ExecutorError::SandboxInvalidBody(
                "snippet may not call asyncio.run directly".to_string(),
            ));
        }
        if dunder_name_re().is_match(line) {
            return Err(ExecutorError::SandboxInvalidBody(
                "snippet may not use an if __name__ guard".to_string(),
            ));
        }

        if !statement_re().is_match(line) {
            return Err(ExecutorError::SandboxSyntaxError(format!(
                "line does not tokenize as a recognized statement: {line:?}"
            )));
        }
    }

    let mut imported_providers: BTreeSet<String> = BTreeSet::new();
    for raw_line in code.lines() {
        let line = raw_line.trim();
        if let Some(caps) = import_provider_re().captures(line) {
            for provider in caps[1].split(',') {
                let provider = provider.trim();
                let has_any_tool = discovered_tools
                    .iter()
                    .any(|t| t.split_once('.').is_some_and(|(p, _)| p == provider));
                if !has_any_tool {
                    return Err(ExecutorError::UnknownServer {
                        tool_id: String::new(),
                        server: provider.to_string(),
                    });
                }
                imported_providers.insert(provider.to_string());
            }
        } else if let Some(caps) = import_tool_re().captures(line) {
            let provider = &caps[1];
            for tool in caps[2].split(',') {
                let tool = tool.trim();
                let tool_id = format!("{provider}.{tool}");
                if !is_allowed(&tool_id, discovered_tools) {
                    return Err(ExecutorError::UndiscoveredTool(tool_id));
                }
            }
            imported_providers.insert(provider.to_string());
        }
    }

    for caps in namespaced_call_re().captures_iter(code) {
        let tool_id = format!("{}.{}", &caps[1], &caps[2]);
        if !is_allowed(&tool_id, discovered_tools) {
            return Err(ExecutorError::UndiscoveredTool(tool_id));
        }
    }

    for caps in bare_call_re().captures_iter(code) {
        let provider = &caps[1];
        if provider == "servers" || !imported_providers.contains(provider) {
            continue;
        }
        let tool_id = format!("{provider}.{}", &caps[2]);
        if !is_allowed(&tool_id, discovered_tools) {
            return Err(ExecutorError::UndiscoveredTool(tool_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_namespaced_call_to_a_discovered_tool_passes() {
        let code = "result = await servers.gmail.gmail_send_email(to=\"a@b.com\")\nreturn result";
        assert!(check(code, &discovered(&["gmail.gmail_send_email"])).is_ok());
    }

    #[test]
    fn inspect_tool_output_is_always_allowed() {
        let code = "return await servers.toolbox.inspect_tool_output(tool_id=\"x\", field_path=\"y\")";
        assert!(check(code, &discovered(&[])).is_ok());
    }

    #[test]
    fn namespaced_call_to_undiscovered_tool_is_rejected() {
        let code = "return await servers.gmail.gmail_send_email(to=\"a@b.com\")";
        let err = check(code, &discovered(&["gmail.gmail_search"])).unwrap_err();
        assert!(matches!(err, ExecutorError::UndiscoveredTool(id) if id == "gmail.gmail_send_email"));
    }

    #[test]
    fn explicit_provider_import_of_unknown_server_is_rejected() {
        let code = "from sandbox_py.servers import slack\nreturn await slack.post_message()";
        let err = check(code, &discovered(&["gmail.gmail_search"])).unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownServer { server, .. } if server == "slack"));
    }

    #[test]
    fn explicit_tool_import_of_undiscovered_tool_is_rejected() {
        let code = "from sandbox_py.servers.gmail import gmail_send_email";
        let err = check(code, &discovered(&["gmail.gmail_search"])).unwrap_err();
        assert!(matches!(err, ExecutorError::UndiscoveredTool(id) if id == "gmail.gmail_send_email"));
    }

    #[test]
    fn redefining_main_is_an_invalid_body() {
        let code = "def main():\n    pass";
        let err = check(code, &discovered(&[])).unwrap_err();
        assert!(matches!(err, ExecutorError::SandboxInvalidBody(_)));
    }

    #[test]
    fn calling_asyncio_run_is_an_invalid_body() {
        let code = "asyncio.run(something())";
        let err = check(code, &discovered(&[])).unwrap_err();
        assert!(matches!(err, ExecutorError::SandboxInvalidBody(_)));
    }

    #[test]
    fn dunder_name_guard_is_an_invalid_body() {
        let code = "if __name__ == \"__main__\":\n    pass";
        let err = check(code, &discovered(&[])).unwrap_err();
        assert!(matches!(err, ExecutorError::SandboxInvalidBody(_)));
    }

    #[test]
    fn a_line_with_unrecognized_characters_is_a_syntax_error() {
        let code = "result = `backtick nonsense`";
        let err = check(code, &discovered(&[])).unwrap_err();
        assert!(matches!(err, ExecutorError::SandboxSyntaxError(_)));
    }

    #[test]
    fn plain_arithmetic_and_control_flow_pass() {
        let code = "total = 0\nfor i in range(3):\n    total += i\nreturn {\"total\": total}";
        assert!(check(code, &discovered(&[])).is_ok());
    }
}
