use crate::app::results::ResultsView;
use crate::pipeline::FileStatus;

pub const LOADING_MESSAGES: [&str; 6] = [
    "Checking your images…",
    "Extracting your gear data…",
    "Scanning focal lengths…",
    "Looking for hidden lens gems…",
    "Detecting your signature shooting style…",
    "Comparing you to the pros (favourably)…",
];

/// The loading message rotates every this many processed files.
const MESSAGE_ROTATION_INTERVAL: usize = 80;

/// Lifecycle of one submission. `Reading` only ever increments `completed`;
/// the worker drives the transitions through the progress events.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPhase {
    Idle,
    Reading { total: usize, completed: usize },
    Submitting { total: usize },
    Done,
    Failed,
}

impl Default for AnalysisPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl AnalysisPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Reading { .. } | Self::Submitting { .. })
    }

    /// The input form is shown while idle and again after a failure, so the
    /// user can retry without losing their selection.
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}

#[derive(Debug, Default)]
pub struct AnalysisState {
    pub phase: AnalysisPhase,
    pub current_file: Option<String>,
    pub file_statuses: Vec<FileStatus>,
    pub error_message: Option<String>,
    pub results: Option<ResultsView>,
    pub show_details: bool,
}

impl AnalysisState {
    pub fn clear(&mut self) {
        *self = AnalysisState::default();
    }

    pub fn begin_reading(&mut self, total: usize) {
        self.phase = AnalysisPhase::Reading {
            total,
            completed: 0,
        };
        self.current_file = None;
        self.file_statuses.clear();
        self.error_message = None;
        self.results = None;
    }

    pub fn file_done(&mut self, status: FileStatus) {
        if let AnalysisPhase::Reading { total, completed } = &mut self.phase {
            *completed = (*completed + 1).min(*total);
        }
        self.current_file = Some(status.name.clone());
        self.file_statuses.push(status);
    }

    pub fn begin_submitting(&mut self) {
        if let AnalysisPhase::Reading { total, .. } = self.phase {
            self.phase = AnalysisPhase::Submitting { total };
        }
    }

    pub fn finish(&mut self, results: ResultsView) {
        self.phase = AnalysisPhase::Done;
        self.current_file = None;
        self.results = Some(results);
    }

    pub fn fail(&mut self, message: String) {
        self.phase = AnalysisPhase::Failed;
        self.current_file = None;
        self.error_message = Some(message);
    }

    pub fn progress_fraction(&self) -> f32 {
        match self.phase {
            AnalysisPhase::Idle | AnalysisPhase::Failed => 0.0,
            AnalysisPhase::Reading { total, completed } => {
                if total == 0 {
                    0.0
                } else {
                    completed as f32 / total as f32
                }
            }
            AnalysisPhase::Submitting { .. } | AnalysisPhase::Done => 1.0,
        }
    }

    pub fn status_line(&self) -> Option<String> {
        match self.phase {
            AnalysisPhase::Reading { total, completed } => Some(format!(
                "{}/{}  {}",
                completed,
                total,
                loading_message(completed)
            )),
            AnalysisPhase::Submitting { .. } => {
                Some("Sending data for analysis...".to_string())
            }
            _ => None,
        }
    }
}

/// Index `floor(completed / 80) mod N`, clamped to the final message once
/// `completed` reaches `N * 80`.
pub fn loading_message(completed: usize) -> &'static str {
    let count = LOADING_MESSAGES.len();
    let index = if completed >= count * MESSAGE_ROTATION_INTERVAL {
        count - 1
    } else {
        (completed / MESSAGE_ROTATION_INTERVAL) % count
    };
    LOADING_MESSAGES[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ExtractionStatus;

    fn status(name: &str) -> FileStatus {
        FileStatus {
            name: name.to_string(),
            size: 1024,
            status: ExtractionStatus::Extracted { field_count: 3 },
        }
    }

    #[test]
    fn message_rotates_every_eighty_files() {
        assert_eq!(loading_message(0), LOADING_MESSAGES[0]);
        assert_eq!(loading_message(79), LOADING_MESSAGES[0]);
        assert_eq!(loading_message(80), LOADING_MESSAGES[1]);
        assert_eq!(loading_message(159), LOADING_MESSAGES[1]);
        assert_eq!(loading_message(400), LOADING_MESSAGES[5]);
        // At 6 * 80 the rotation would wrap; it clamps instead.
        assert_eq!(loading_message(480), LOADING_MESSAGES[5]);
        assert_eq!(loading_message(10_000), LOADING_MESSAGES[5]);
    }

    #[test]
    fn reading_progress_is_monotonic_and_bounded() {
        let mut state = AnalysisState::default();
        state.begin_reading(2);
        assert_eq!(state.progress_fraction(), 0.0);

        state.file_done(status("a.jpg"));
        assert_eq!(state.progress_fraction(), 0.5);
        state.file_done(status("b.jpg"));
        assert_eq!(state.progress_fraction(), 1.0);
        // A stray extra event cannot push the counter past the total.
        state.file_done(status("c.jpg"));
        assert_eq!(state.progress_fraction(), 1.0);
        assert_eq!(state.file_statuses.len(), 3);
    }

    #[test]
    fn phases_reach_a_terminal_state() {
        let mut state = AnalysisState::default();
        state.begin_reading(1);
        assert!(state.phase.is_running());
        assert!(!state.phase.allows_input());

        state.file_done(status("a.jpg"));
        state.begin_submitting();
        assert_eq!(state.phase, AnalysisPhase::Submitting { total: 1 });
        assert_eq!(
            state.status_line().as_deref(),
            Some("Sending data for analysis...")
        );

        state.fail("boom".to_string());
        assert_eq!(state.phase, AnalysisPhase::Failed);
        assert!(state.phase.allows_input());
        assert_eq!(state.error_message.as_deref(), Some("boom"));
    }
}
