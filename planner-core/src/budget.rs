//! Budget and usage accounting (§3, §7 "budget_exhausted").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-run resource limits. Immutable after construction.
///
/// A value of `0` on any axis means that axis is **disabled**: the
/// orchestrator terminates with `budget_exhausted` the first time a step
/// would consume it (see SPEC_FULL.md §9, Open Question 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum number of loop steps (search/tool/sandbox/finish/fail).
    pub max_steps: u32,
    /// Maximum number of successful `tool` invocations.
    pub max_tool_calls: u32,
    /// Maximum number of successful `sandbox` invocations.
    pub max_code_runs: u32,
    /// Maximum estimated cumulative LLM cost, in USD.
    pub max_llm_cost_usd: Decimal,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_tool_calls: 30,
            max_code_runs: 5,
            max_llm_cost_usd: Decimal::new(50, 2), // 0.50
        }
    }
}

/// Which budget axis a check or event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAxis {
    /// `Budget::max_steps`.
    MaxSteps,
    /// `Budget::max_tool_calls`.
    MaxToolCalls,
    /// `Budget::max_code_runs`.
    MaxCodeRuns,
    /// `Budget::max_llm_cost_usd`.
    MaxLlmCostUsd,
}

impl BudgetAxis {
    /// The wire/human name of this axis, matching the spec's field names.
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetAxis::MaxSteps => "max_steps",
            BudgetAxis::MaxToolCalls => "max_tool_calls",
            BudgetAxis::MaxCodeRuns => "max_code_runs",
            BudgetAxis::MaxLlmCostUsd => "max_llm_cost_usd",
        }
    }
}

impl std::fmt::Display for BudgetAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monotonically non-decreasing usage counters for the lifetime of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetUsage {
    /// Steps taken so far (incremented once per loop iteration).
    pub steps_taken: u32,
    /// Successful tool calls so far.
    pub tool_calls: u32,
    /// Successful sandbox runs so far.
    pub code_runs: u32,
    /// Estimated cumulative LLM cost in USD so far.
    pub estimated_llm_cost_usd: Decimal,
}

impl BudgetUsage {
    /// Returns the first budget axis that has met or exceeded its limit,
    /// if any, checked in a fixed order (steps, tool calls, code runs,
    /// cost) so `final_summary` naming is deterministic.
    pub fn exceeded_axis(&self, budget: &Budget) -> Option<BudgetAxis> {
        if self.steps_taken >= budget.max_steps {
            return Some(BudgetAxis::MaxSteps);
        }
        if self.tool_calls >= budget.max_tool_calls {
            return Some(BudgetAxis::MaxToolCalls);
        }
        if self.code_runs >= budget.max_code_runs {
            return Some(BudgetAxis::MaxCodeRuns);
        }
        if self.estimated_llm_cost_usd >= budget.max_llm_cost_usd {
            return Some(BudgetAxis::MaxLlmCostUsd);
        }
        None
    }
}
