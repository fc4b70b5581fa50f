#![deny(missing_docs)]
//! Tool Dispatcher — §4.4.2, §6.2.
//!
//! A single entry point, `invoke(tenant, provider, tool, args)`, that
//! routes to the [`planner_registry::ProviderRegistry`] and normalizes
//! whatever comes back into an `ActionResponse`. Both `tool` steps and the
//! Sandbox Runner's IPC shim call through here, so budget and
//! authorization are enforced uniformly regardless of which path a
//! request arrived on.

use async_trait::async_trait;
use planner_core::{ActionResponse, TenantId};
use planner_registry::{ProviderRegistry, RegistryError};
use std::sync::Arc;

/// Object-safe tool dispatch boundary the orchestrator depends on
/// (`Arc<dyn ToolDispatch>`), so it stays generic only over `Provider`
/// (§4.1, §4.2's expansion note on the system's one non-object-safe trait).
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    /// Invoke `provider.tool` on behalf of `tenant` with `args`.
    async fn invoke(
        &self,
        tenant: &TenantId,
        provider: &str,
        tool: &str,
        args: serde_json::Value,
    ) -> ActionResponse;
}

/// Routes tool invocations to the Provider Registry and normalizes the
/// result.
///
/// Holds no state of its own beyond the registry — it is a thin, reusable
/// dispatch point, not a cache or a queue.
pub struct ToolDispatcher {
    registry: Arc<ProviderRegistry>,
}

impl ToolDispatcher {
    /// Build a dispatcher over the given registry.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolDispatch for ToolDispatcher {
    /// Invoke `provider.tool` on behalf of `tenant` with `args`.
    ///
    /// Registry lookup failures (unregistered provider, unauthorized
    /// provider) and invoker-reported transport failures are both folded
    /// into `ActionResponse { successful: false, .. }` — this function
    /// never returns an `Err`, matching §6.2's "transport errors must be
    /// reported as `successful=false`".
    #[tracing::instrument(skip(self, args), fields(tenant = %tenant, provider, tool))]
    async fn invoke(
        &self,
        tenant: &TenantId,
        provider: &str,
        tool: &str,
        args: serde_json::Value,
    ) -> ActionResponse {
        let invoker = match self.registry.get(tenant, provider) {
            Ok(invoker) => invoker,
            Err(RegistryError::ProviderNotFound(p)) => {
                tracing::warn!(provider = %p, "provider not registered");
                return ActionResponse::failed(format!("provider not registered: {p}"));
            }
            Err(RegistryError::NotAuthorized(p)) => {
                tracing::warn!(provider = %p, "provider not authorized");
                return ActionResponse::failed(format!("provider not authorized: {p}"));
            }
        };

        let response = invoker.invoke(tenant, tool, args).await;
        if !response.successful {
            tracing::warn!(error = ?response.error, "tool invocation failed");
        }
        response
    }
}
