#![deny(missing_docs)]
//! Event Bus — the telemetry vocabulary of §6.1.
//!
//! These are not a protocol trait; they are a shared vocabulary. The
//! orchestrator emits them through an [`EventSink`]; any consumer (a
//! dashboard, a log aggregator, a test harness) implements the sink.
//! Delivery is best-effort — a full channel drops the oldest event rather
//! than block the run.

use planner_core::{BudgetAxis, ErrorCode};
use serde::{Deserialize, Serialize};

/// The ten named events of §6.1, each carrying its documented payload.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A run began.
    TaskStarted {
        /// First ≤ 100 chars of the task string.
        task_prefix: String,
        /// The resolved budget for this run.
        budget: serde_json::Value,
        /// The tenant's user id.
        user_id: String,
    },
    /// The Planner LLM returned a parsed decision.
    PlanningCompleted {
        /// The command's kind.
        decision_type: String,
        /// The tool id, for `tool`/`sandbox` decisions.
        tool_id: Option<String>,
        /// A bounded preview of the command's reasoning string.
        reasoning_preview: String,
    },
    /// A step is about to execute.
    StepDispatching {
        /// The step's id.
        step_id: u32,
        /// The command's kind.
        kind: String,
    },
    /// A step finished executing.
    StepCompleted {
        /// The step's id.
        step_id: u32,
        /// Whether the step succeeded.
        success: bool,
        /// Error message, if any.
        error: Option<String>,
    },
    /// A `search` command completed.
    SearchCompleted {
        /// The search query.
        query: String,
        /// Number of results returned.
        result_count: usize,
        /// The tool ids returned.
        tool_ids: Vec<String>,
    },
    /// A tool invocation began.
    ToolStarted {
        /// The provider half of the tool id.
        provider: String,
        /// The tool's name.
        tool: String,
    },
    /// A tool invocation completed successfully.
    ToolCompleted {
        /// The provider half of the tool id.
        provider: String,
        /// The tool's name.
        tool: String,
        /// Always `None`; present for payload-shape symmetry with `ToolFailed`.
        error: Option<String>,
    },
    /// A tool invocation failed.
    ToolFailed {
        /// The provider half of the tool id.
        provider: String,
        /// The tool's name.
        tool: String,
        /// The error message.
        error: Option<String>,
    },
    /// A sandbox subprocess ran.
    SandboxRun {
        /// The sandbox command's label.
        label: String,
        /// Whether the run succeeded.
        success: bool,
        /// Whether the subprocess was killed for exceeding its timeout.
        timed_out: bool,
        /// Number of captured log lines.
        log_lines: usize,
    },
    /// An observation was trimmed and/or moved to `raw_outputs`.
    ObservationCompressed {
        /// `"tool"` or `"sandbox"`.
        kind: String,
        /// Serialized size before trimming, in bytes.
        original_bytes: usize,
        /// Serialized size after trimming, in bytes.
        compressed_bytes: usize,
    },
    /// A budget axis was reached or exceeded.
    BudgetExceeded {
        /// The offending axis.
        axis: BudgetAxis,
        /// The usage value that triggered the check.
        usage: serde_json::Value,
    },
    /// The run ended.
    TaskCompleted {
        /// Whether the run succeeded.
        success: bool,
        /// The machine-readable failure code, if any.
        error_code: Option<ErrorCode>,
    },
}

/// Envelope wrapping an [`Event`] with run-scoped correlation fields (§5
/// "Ordering guarantees": events carry `run_id` and `step_id` so consumers
/// can reconstruct order even though delivery is best-effort).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The run this event belongs to.
    pub run_id: String,
    /// The step this event correlates to, if any.
    pub step_id: Option<u32>,
    /// Milliseconds since the run started.
    pub timestamp_ms: u64,
    /// The event payload.
    pub event: Event,
}

/// Sink for best-effort telemetry delivery.
///
/// Implementations must not block or fail the run: a full channel or a
/// disconnected receiver should be swallowed, not propagated.
pub trait EventSink: Send + Sync {
    /// Emit one event. Must never panic or error out to the caller.
    fn emit(&self, envelope: EventEnvelope);
}

/// An [`EventSink`] backed by a bounded `tokio::sync::mpsc` channel.
///
/// Emission never blocks: if the channel is full, the event is dropped and
/// a `tracing::warn!` is emitted in its place, matching the "best-effort,
/// may be dropped under back-pressure" policy of §5.
pub struct ChannelEventSink {
    tx: tokio::sync::mpsc::Sender<EventEnvelope>,
}

impl ChannelEventSink {
    /// Create a new sink and its receiving half, with the given channel
    /// capacity.
    pub fn new(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, envelope: EventEnvelope) {
        if self.tx.try_send(envelope).is_err() {
            tracing::warn!("event dropped under back-pressure");
        }
    }
}

/// A no-op sink, for runs that don't need telemetry (e.g. unit tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _envelope: EventEnvelope) {}
}
