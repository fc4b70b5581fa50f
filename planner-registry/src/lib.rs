#![deny(missing_docs)]
//! Provider Registry — §6.2.
//!
//! A per-tenant map from provider id to a callable [`ToolInvoker`] plus its
//! authorization status. The registry itself does not know how to talk to
//! any upstream service; it only holds the `Arc<dyn ToolInvoker>` each
//! provider registered and decides whether a tenant is allowed to reach it.
//! Transport and protocol errors from the invoker are never surfaced as
//! Rust errors here — they come back as `ActionResponse { successful:
//! false, .. }`, matching §6.2's "transport errors must be reported as
//! `successful=false`".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use planner_core::{ActionResponse, TenantId};
use serde_json::Value;
use thiserror::Error;

/// Errors from registry lookups. Unlike invoker failures, these never reach
/// a tool call — they're rejected before one is attempted.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No provider with this id is registered for the tenant.
    #[error("provider not registered: {0}")]
    ProviderNotFound(String),

    /// The provider is registered but not authorized for this tenant.
    #[error("provider not authorized: {0}")]
    NotAuthorized(String),
}

/// Object-safe invoker implemented by each provider.
///
/// `tenant` carries the credentials handle the invoker needs to
/// authenticate to the upstream service; credentials themselves are
/// obtained out-of-band and never logged.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke `tool_name` with `args` on behalf of `tenant`.
    ///
    /// Must not panic. Upstream failures (network, auth, 4xx/5xx) are
    /// reported through `ActionResponse::failed`, not as a Rust `Err`.
    async fn invoke(&self, tenant: &TenantId, tool_name: &str, args: Value) -> ActionResponse;
}

struct ProviderEntry {
    invoker: Arc<dyn ToolInvoker>,
    authorized: bool,
}

/// Per-tenant map from provider id to invoker + authorization status.
///
/// Authorization is tracked per (tenant, provider) pair: the same provider
/// may be wired up for one tenant and withheld from another.
#[derive(Default)]
pub struct ProviderRegistry {
    tenants: HashMap<TenantId, HashMap<String, ProviderEntry>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider's invoker for a tenant, with its authorization
    /// status. Overwrites any existing registration for the same
    /// (tenant, provider) pair.
    pub fn register(
        &mut self,
        tenant: TenantId,
        provider: impl Into<String>,
        invoker: Arc<dyn ToolInvoker>,
        authorized: bool,
    ) {
        self.tenants.entry(tenant).or_default().insert(
            provider.into(),
            ProviderEntry {
                invoker,
                authorized,
            },
        );
    }

    /// Whether `provider` is registered and authorized for `tenant`.
    pub fn is_authorized(&self, tenant: &TenantId, provider: &str) -> bool {
        self.tenants
            .get(tenant)
            .and_then(|ps| ps.get(provider))
            .is_some_and(|e| e.authorized)
    }

    /// Look up the invoker registered for `(tenant, provider)`, checking
    /// both presence and authorization.
    pub fn get(
        &self,
        tenant: &TenantId,
        provider: &str,
    ) -> Result<&Arc<dyn ToolInvoker>, RegistryError> {
        let entry = self
            .tenants
            .get(tenant)
            .and_then(|ps| ps.get(provider))
            .ok_or_else(|| RegistryError::ProviderNotFound(provider.to_string()))?;
        if !entry.authorized {
            return Err(RegistryError::NotAuthorized(provider.to_string()));
        }
        Ok(&entry.invoker)
    }

    /// Provider ids registered for `tenant`, authorized or not.
    pub fn providers_for(&self, tenant: &TenantId) -> Vec<&str> {
        self.tenants
            .get(tenant)
            .map(|ps| ps.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
