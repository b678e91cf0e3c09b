// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Orchestrator configuration and loop outcomes.

/// Default cap on provider round-trips per user message.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Tunables for the tool-use loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum provider round-trips per user message. The loop never runs
    /// unbounded: a model that keeps emitting tool calls is cut off here and
    /// its last text is surfaced as the answer.
    pub max_iterations: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl OrchestratorConfig {
    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// One completed tool invocation, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Tool name as the model requested it.
    pub tool: String,
    /// Normalized text result fed back to the model.
    pub result: String,
}

/// What a finished loop produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// The model's final answer text.
    pub final_text: String,
    /// Every successful tool invocation made along the way.
    pub tool_results: Vec<ToolInvocation>,
    /// Provider round-trips consumed.
    pub iterations: u32,
}
