//! Introspected shape of one registered wrapper function (§4.5.1).

use serde_json::Value;

/// One parameter of a wrapper function's signature.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name, as it appears in the signature.
    pub name: String,
    /// Pythonic type annotation, e.g. `"str"`, `"int"`.
    pub type_name: String,
    /// Default value rendered as source text, if any. Absence means required.
    pub default: Option<String>,
}

impl ParamSpec {
    /// A required parameter with no default.
    pub fn required(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default: None,
        }
    }

    /// An optional parameter carrying a default.
    pub fn optional(
        name: impl Into<String>,
        type_name: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default: Some(default.into()),
        }
    }
}

/// A wrapper function as discovered by introspecting one provider module.
///
/// `params` is the *full* signature including the leading tenant-context
/// parameter; [`ToolSpec::exposed_params`] strips it (and any `context`
/// parameter) per §4.5.1.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// The provider module this wrapper belongs to.
    pub provider: String,
    /// The wrapper function's name.
    pub name: String,
    /// Full parameter list, in signature order, tenant context first.
    pub params: Vec<ParamSpec>,
    /// Raw docstring text attached to the wrapper.
    pub docstring: String,
    /// Output schema (§4.5.3's node convention), if the wrapper declared one.
    pub output_schema: Option<Value>,
}

impl ToolSpec {
    /// `provider.name`.
    pub fn tool_id(&self) -> String {
        format!("{}.{}", self.provider, self.name)
    }

    /// Parameters exposed to the planner: everything but the first
    /// (tenant context) and anything literally named `context`.
    pub fn exposed_params(&self) -> Vec<&ParamSpec> {
        self.params
            .iter()
            .enumerate()
            .filter(|(i, p)| *i != 0 && p.name != "context")
            .map(|(_, p)| p)
            .collect()
    }
}
