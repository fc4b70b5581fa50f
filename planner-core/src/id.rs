//! Typed ID wrappers for run, tenant, and stored-output identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up run IDs, tenant IDs, etc.
/// These are just strings underneath — no UUID enforcement, no format
/// requirement.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(RunId, "Unique identifier for one orchestrator run.");
typed_id!(TenantId, "Unique identifier for a tenant/user.");
typed_id!(
    RawOutputKey,
    "Key into `AgentState.raw_outputs`, e.g. `tool:gmail.gmail_search:3`."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let id = RunId::new("run-1");
        assert_eq!(id.to_string(), "run-1");
        assert_eq!(id.as_str(), "run-1");
    }

    #[test]
    fn from_str_and_string() {
        let a: TenantId = "acme".into();
        let b: TenantId = String::from("acme").into();
        assert_eq!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let id = RawOutputKey::new("tool:gmail.gmail_search:3");
        let json = serde_json::to_string(&id).unwrap();
        let back: RawOutputKey = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
