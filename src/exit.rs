//! Exit code logic for the specfetch process.
//!
//! Single responsibility: map a run's outcome to the process exit status.

use std::process::ExitCode;

use specfetch_core::orchestrator::RunOutcome;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Everything downloaded, or nothing to do.
    Success,
    /// Some items failed or the run was interrupted; re-running resumes.
    Partial,
    /// Setup failed before any download started.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Failed items are a partial success, never a fatal error.
pub(crate) fn determine_exit_outcome(outcome: RunOutcome) -> ProcessExit {
    match outcome {
        RunOutcome::Complete => ProcessExit::Success,
        RunOutcome::Partial => ProcessExit::Partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_outcome_success_when_complete() {
        assert_eq!(
            determine_exit_outcome(RunOutcome::Complete),
            ProcessExit::Success
        );
    }

    #[test]
    fn test_exit_outcome_partial_when_items_left() {
        assert_eq!(
            determine_exit_outcome(RunOutcome::Partial),
            ProcessExit::Partial
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Partial.code(), 1);
        assert_eq!(ProcessExit::Failure.code(), 2);
    }
}
