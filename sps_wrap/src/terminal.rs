//! Terminal-backed operator prompts.

use std::io::{self, BufRead, Write};

use reconciler::decision::DecisionProvider;
use sps_types::{ReconcileError, ReconcileResult};

/// Blocking prompts on stdin/stdout. The workflow is a single-operator
/// batch process, so there is no timeout: the question waits.
pub struct TerminalDecisions;

impl TerminalDecisions {
    fn ask(&self, question: &str, suffix: &str) -> ReconcileResult<String> {
        print!("\n{question} {suffix}: ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

impl DecisionProvider for TerminalDecisions {
    fn confirm(&mut self, question: &str) -> ReconcileResult<bool> {
        // Default-deny: only an explicit yes confirms.
        let answer = self.ask(question, "(Y/N)")?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    fn prompt_float(&mut self, question: &str, default: f64) -> ReconcileResult<f64> {
        let answer = self.ask(question, &format!("(default {default})"))?;
        if answer.is_empty() {
            return Ok(default);
        }
        answer
            .parse()
            .map_err(|_| ReconcileError::OperatorAbort {
                reason: format!("'{answer}' is not a number"),
            })
    }

    fn prompt_count(&mut self, question: &str, default: u32) -> ReconcileResult<u32> {
        let answer = self.ask(question, &format!("(default {default})"))?;
        if answer.is_empty() {
            return Ok(default);
        }
        answer
            .parse()
            .map_err(|_| ReconcileError::OperatorAbort {
                reason: format!("'{answer}' is not a whole number"),
            })
    }
}
