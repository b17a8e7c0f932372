use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::csv::CleaningReport;

/// Steps of a single file-promotion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromotionState {
    Idle,
    Detecting,
    Downloading,
    Cleaning,
    Uploading,
    Verifying,
    DeletingSource,
    CleaningUp,
    Failed,
}

impl PromotionState {
    /// Successor on the happy path. `Failed` has none.
    pub fn next(self) -> Option<PromotionState> {
        use PromotionState::*;
        match self {
            Idle => Some(Detecting),
            Detecting => Some(Downloading),
            Downloading => Some(Cleaning),
            Cleaning => Some(Uploading),
            Uploading => Some(Verifying),
            Verifying => Some(DeletingSource),
            DeletingSource => Some(CleaningUp),
            CleaningUp => Some(Idle),
            Failed => None,
        }
    }
}

impl fmt::Display for PromotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromotionState::Idle => "idle",
            PromotionState::Detecting => "detecting",
            PromotionState::Downloading => "downloading",
            PromotionState::Cleaning => "cleaning",
            PromotionState::Uploading => "uploading",
            PromotionState::Verifying => "verifying",
            PromotionState::DeletingSource => "deleting-source",
            PromotionState::CleaningUp => "cleaning-up",
            PromotionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Nothing matched under the incoming prefix
    NoFile,
    Promoted {
        source: String,
        destination: String,
        report: CleaningReport,
    },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NoFile => write!(f, "No files to process"),
            RunOutcome::Promoted {
                source,
                destination,
                report,
            } => write!(f, "Promoted {} -> {} ({})", source, destination, report.summary()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_returns_to_idle() {
        let mut state = PromotionState::Idle;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            state = next;
            visited.push(state);
            if state == PromotionState::Idle {
                break;
            }
        }
        assert_eq!(visited.len(), 9);
        assert_eq!(visited[1], PromotionState::Detecting);
        assert_eq!(visited[7], PromotionState::CleaningUp);
        assert!(!visited.contains(&PromotionState::Failed));
    }

    #[test]
    fn test_failed_is_terminal() {
        assert_eq!(PromotionState::Failed.next(), None);
        assert_eq!(
            PromotionState::CleaningUp.next(),
            Some(PromotionState::Idle)
        );
    }
}
