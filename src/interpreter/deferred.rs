//! Assignments queued until every object exists.

use tracing::{debug, info};

use super::{Interpreter, Resolution};
use crate::error::{Result, ScriptError};

/// An object-section assignment that named something not created yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedBlock {
    /// Line of the statement.
    pub line: usize,
    /// The statement as written.
    pub text: String,
    /// Left-hand side.
    pub lhs: String,
    /// Right-hand side.
    pub rhs: String,
    /// Why it could not be applied when read.
    pub reason: String,
}

impl Interpreter {
    pub(crate) fn defer(&mut self, block: DelayedBlock) {
        debug!(line = block.line, reason = %block.reason, "deferring assignment");
        self.delayed.push(block);
    }

    /// Assignments waiting for the end of the script.
    pub fn delayed_blocks(&self) -> &[DelayedBlock] {
        &self.delayed
    }

    /// Re-run every queued assignment in the order it was read.
    ///
    /// Names that are still unknown are reported against the original
    /// line.
    pub(crate) fn replay_delayed(&mut self) -> Result<()> {
        let blocks = std::mem::take(&mut self.delayed);
        if blocks.is_empty() {
            return Ok(());
        }
        info!(count = blocks.len(), "replaying delayed assignments");
        self.replaying = true;
        let mut outcome = Ok(());
        for block in blocks {
            let result: Result<()> = match self.make_assignment(&block.lhs, &block.rhs) {
                Ok(Resolution::Bound) => continue,
                Ok(Resolution::Pending(reason)) => Err(ScriptError::Reference(reason)),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                if let Err(fatal) = self.record(e.at_line(block.line, &block.text)) {
                    outcome = Err(fatal);
                    break;
                }
            }
        }
        self.replaying = false;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_reference_is_replayed() {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str(
            "Create Variable x;\nx = y * 2;\nCreate Variable y;\ny = 4;",
        );
        assert!(r.is_ok(), "{:?}", r.err());
        let x = interpreter.workspace().config().get_variable("x").expect("x");
        assert_eq!(x.value(), 8.0);
        assert!(interpreter.delayed_blocks().is_empty());
    }

    #[test]
    fn test_never_declared_reports_original_line() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create Variable x;\nx = ghost + 1;\nCreate Variable y;")
            .expect_err("ghost never exists");
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("ghost"), "{}", err);
    }

    #[test]
    fn test_unknown_field_fails_on_replay() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create Spacecraft Sat1;\nSat1.Colour = 3;")
            .expect_err("no such field");
        assert!(matches!(err.root(), ScriptError::UnknownParameter { label, .. } if label == "Colour"));
    }
}
