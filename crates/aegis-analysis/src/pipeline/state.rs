//! Scan lifecycle.

use std::fmt;

/// Phase of one scan run.
///
/// `Idle → Validating → Scanning → Reducing → Reporting → Done`.
/// `Validating` may end in `Failed`; nothing is loaded in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Validating,
    Scanning,
    Reducing,
    Reporting,
    Done,
    Failed,
}

impl PipelineState {
    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Scanning)
                | (Validating, Failed)
                | (Scanning, Reducing)
                | (Scanning, Reporting)
                | (Scanning, Failed)
                | (Reducing, Reporting)
                | (Reporting, Done)
                | (Done, Validating)
                | (Failed, Validating)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Validating => "validating",
            PipelineState::Scanning => "scanning",
            PipelineState::Reducing => "reducing",
            PipelineState::Reporting => "reporting",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineState::*;

    #[test]
    fn test_happy_path_is_allowed() {
        let path = [Idle, Validating, Scanning, Reducing, Reporting, Done];
        assert!(path.windows(2).all(|w| w[0].can_transition_to(w[1])));
    }

    #[test]
    fn test_validation_failure_is_terminal() {
        assert!(Validating.can_transition_to(Failed));
        assert!(Failed.is_terminal());
        assert!(!Failed.can_transition_to(Scanning));
        assert!(!Idle.can_transition_to(Scanning));
    }
}
