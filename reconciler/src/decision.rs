//! Operator decision points.
//!
//! The workflow has a small number of blocking, synchronous prompts
//! (rework threshold, redo dilution, dilution-mismatch confirmation).
//! They are modeled as a trait so the binary can install a terminal
//! implementation while tests script deterministic answers.

use std::collections::VecDeque;

use sps_types::ReconcileResult;

/// Source of answers for the workflow's interactive checkpoints.
pub trait DecisionProvider {
    /// Yes/no checkpoint. Anything other than an explicit affirmative
    /// must come back as `false`; callers treat `false` as an abort.
    fn confirm(&mut self, question: &str) -> ReconcileResult<bool>;

    /// Ask for a number, falling back to `default` on an empty answer.
    fn prompt_float(&mut self, question: &str, default: f64) -> ReconcileResult<f64>;

    /// Ask for a count, falling back to `default` on an empty answer.
    fn prompt_count(&mut self, question: &str, default: u32) -> ReconcileResult<u32>;
}

/// Scripted answers for tests. Each queue is consumed in order; an
/// exhausted queue answers like an operator pressing return: `false` for
/// confirmations (default-deny) and the prompt's default for numbers.
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    pub confirmations: VecDeque<bool>,
    pub floats: VecDeque<f64>,
    pub counts: VecDeque<u32>,
}

impl ScriptedDecisions {
    pub fn all_defaults() -> ScriptedDecisions {
        ScriptedDecisions::default()
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn confirm(&mut self, _question: &str) -> ReconcileResult<bool> {
        Ok(self.confirmations.pop_front().unwrap_or(false))
    }

    fn prompt_float(&mut self, _question: &str, default: f64) -> ReconcileResult<f64> {
        Ok(self.floats.pop_front().unwrap_or(default))
    }

    fn prompt_count(&mut self, _question: &str, default: u32) -> ReconcileResult<u32> {
        Ok(self.counts.pop_front().unwrap_or(default))
    }
}
