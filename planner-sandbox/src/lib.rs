#![deny(missing_docs)]
//! Sandbox Runner — §4.4.3, §4.5.2, §6.3, §6.4.
//!
//! Builds an ephemeral filesystem root containing generated per-tool
//! Python wrappers, spawns an isolated subprocess to run the submitted
//! plan against them, and parses the subprocess's sentinel-delimited
//! result. Tool calls made from inside the sandbox cross back out through
//! a length-prefixed JSON IPC channel to the same
//! [`planner_dispatcher::ToolDispatch`] implementation used by direct `tool`
//! steps, so budget and authorization are enforced identically either way.

mod ipc;
mod root;
mod runner;

pub use ipc::{IpcServer, IpcTransport};
pub use root::SandboxRoot;
pub use runner::{SandboxConfig, SandboxRun, SandboxRunner};
