//! Ephemeral sandbox filesystem root (§4.4.3, §4.5.2).
//!
//! One root is materialized per run, lazily on the first `sandbox` command,
//! and reused for every subsequent sandbox step in that run. It holds the
//! generated `sandbox_py` package (one wrapper function per discovered
//! tool) and the `plan.py` scaffold the submitted code is spliced into.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use planner_core::SandboxError;

const IPC_CLIENT_PY: &str = include_str!("templates/_ipc.py");

/// An ephemeral directory tree the sandbox subprocess runs inside.
///
/// Dropping this removes the directory and everything generated into it;
/// callers keep it alive for the run's lifetime and drop it when the run
/// ends.
pub struct SandboxRoot {
    dir: tempfile::TempDir,
}

impl SandboxRoot {
    /// Materialize a fresh root containing `sandbox_py` wrappers for
    /// `discovered_tools` (each a `provider.tool` id) and a `plan.py`
    /// whose `main` body is `code`.
    pub fn build(discovered_tools: &BTreeSet<String>, code: &str) -> Result<Self, SandboxError> {
        let dir = tempfile::tempdir()
            .map_err(|e| SandboxError::RootSetup(format!("tempdir: {e}")))?;

        let pkg_dir = dir.path().join("sandbox_py");
        let servers_dir = pkg_dir.join("servers");
        std::fs::create_dir_all(&servers_dir)
            .map_err(|e| SandboxError::RootSetup(format!("mkdir: {e}")))?;

        std::fs::write(pkg_dir.join("__init__.py"), "")
            .map_err(|e| SandboxError::RootSetup(format!("write __init__.py: {e}")))?;
        std::fs::write(pkg_dir.join("_ipc.py"), IPC_CLIENT_PY)
            .map_err(|e| SandboxError::RootSetup(format!("write _ipc.py: {e}")))?;

        let mut by_provider: std::collections::BTreeMap<&str, Vec<&str>> = Default::default();
        for tool_id in discovered_tools {
            let (provider, tool) = tool_id
                .split_once('.')
                .ok_or_else(|| SandboxError::RootSetup(format!("malformed tool_id: {tool_id}")))?;
            by_provider.entry(provider).or_default().push(tool);
        }

        let mut servers_init = String::from("from . import _ipc as __ipc\n\n");
        for (provider, tools) in &by_provider {
            let module_src = render_provider_module(provider, tools);
            std::fs::write(servers_dir.join(format!("{provider}.py")), module_src)
                .map_err(|e| SandboxError::RootSetup(format!("write {provider}.py: {e}")))?;
            servers_init.push_str(&format!("from . import {provider}\n"));
        }
        std::fs::write(servers_dir.join("__init__.py"), servers_init)
            .map_err(|e| SandboxError::RootSetup(format!("write servers/__init__.py: {e}")))?;

        let plan_src = render_plan(code);
        std::fs::write(dir.path().join("plan.py"), plan_src)
            .map_err(|e| SandboxError::RootSetup(format!("write plan.py: {e}")))?;

        Ok(Self { dir })
    }

    /// The root directory's path (the subprocess's working directory).
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path to the generated `plan.py` entry point.
    pub fn plan_path(&self) -> PathBuf {
        self.dir.path().join("plan.py")
    }
}

fn render_provider_module(provider: &str, tools: &[&str]) -> String {
    let mut src = String::from("from . import _ipc as __ipc\n\n");
    for tool in tools {
        src.push_str(&format!(
            "async def {tool}(**kwargs):\n    return await __ipc.call(\"{provider}\", \"{tool}\", kwargs)\n\n"
        ));
    }
    src
}

fn render_plan(code: &str) -> String {
    let indented: String = code
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "import asyncio\nimport json\nimport sandbox_py.servers as servers\n\nasync def __plan_main():\n{indented}\n\nasync def __run():\n    result = await __plan_main()\n    print(\"___TB_RESULT___\" + json.dumps(result if result is not None else {{}}))\n\nasyncio.run(__run())\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn build_generates_one_module_per_provider() {
        let mut tools = BTreeSet::new();
        tools.insert("crm.lookup_contact".to_string());
        tools.insert("crm.create_ticket".to_string());
        tools.insert("calendar.list_events".to_string());

        let root = SandboxRoot::build(&tools, "return 1").unwrap();
        assert!(root.path().join("sandbox_py/servers/crm.py").exists());
        assert!(root.path().join("sandbox_py/servers/calendar.py").exists());
        assert!(root.plan_path().exists());
    }

    #[test]
    fn build_rejects_malformed_tool_id() {
        let mut tools = BTreeSet::new();
        tools.insert("not-a-dotted-id".to_string());
        assert!(SandboxRoot::build(&tools, "return 1").is_err());
    }

    #[test]
    fn plan_wraps_code_in_fixed_main_and_sentinel() {
        let src = render_plan("x = 1\nreturn x");
        assert!(src.contains("async def __plan_main():"));
        assert!(src.contains("___TB_RESULT___"));
        assert!(src.contains("    x = 1"));
    }
}
